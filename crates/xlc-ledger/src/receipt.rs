use std::fmt;

use xlc_crypto::keccak256;
use xlc_rlp::{Decodable, Encodable, RlpError, RlpItem, RlpResult};
use xlc_types::{Address, LedgerId, H256};

/// An event emitted by a contract.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Log {
    pub address: Address,
    pub topics: Vec<H256>,
    pub data: Vec<u8>,
}

impl Log {
    pub fn new(address: Address, topic: H256, data: Vec<u8>) -> Self {
        Self {
            address,
            topics: vec![topic],
            data,
        }
    }

    /// The event signature topic, if any.
    pub fn topic(&self) -> Option<&H256> {
        self.topics.first()
    }
}

impl Encodable for Log {
    fn to_rlp(&self) -> RlpItem {
        RlpItem::list(vec![
            self.address.to_rlp(),
            self.topics.to_rlp(),
            RlpItem::bytes(self.data.clone()),
        ])
    }
}

impl Decodable for Log {
    fn from_rlp(item: &RlpItem) -> RlpResult<Self> {
        let fields = item.as_list_of(3)?;
        Ok(Self {
            address: Address::from_rlp(&fields[0])?,
            topics: Vec::<H256>::from_rlp(&fields[1])?,
            data: fields[2].as_bytes()?.to_vec(),
        })
    }
}

/// 2048-bit logs bloom filter.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Bloom([u8; 256]);

impl Bloom {
    pub const fn empty() -> Self {
        Self([0u8; 256])
    }

    /// Add an item: three bits chosen by 11-bit slices of its keccak-256.
    pub fn accrue(&mut self, item: &[u8]) {
        let hash = keccak256(item);
        let h = hash.as_bytes();
        for i in [0usize, 2, 4] {
            let bit = ((usize::from(h[i]) << 8) | usize::from(h[i + 1])) & 2047;
            self.0[255 - bit / 8] |= 1 << (bit % 8);
        }
    }

    /// May contain `item`; `false` means definitely absent.
    pub fn contains(&self, item: &[u8]) -> bool {
        let mut needle = Bloom::empty();
        needle.accrue(item);
        needle.0.iter().zip(self.0.iter()).all(|(p, s)| p & s == *p)
    }

    pub fn from_logs(logs: &[Log]) -> Self {
        let mut bloom = Self::empty();
        for log in logs {
            bloom.accrue(log.address.as_bytes());
            for topic in &log.topics {
                bloom.accrue(topic.as_bytes());
            }
        }
        bloom
    }

    pub fn as_bytes(&self) -> &[u8; 256] {
        &self.0
    }
}

impl Default for Bloom {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Debug for Bloom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let set = self.0.iter().map(|b| b.count_ones()).sum::<u32>();
        write!(f, "Bloom({set} bits set)")
    }
}

/// Consensus receipt of one transaction: the value stored in a block's
/// receipts trie.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Receipt {
    pub success: bool,
    pub cumulative_gas_used: u64,
    pub bloom: Bloom,
    pub logs: Vec<Log>,
}

impl Receipt {
    /// A receipt whose bloom is derived from `logs`.
    pub fn new(success: bool, cumulative_gas_used: u64, logs: Vec<Log>) -> Self {
        Self {
            success,
            cumulative_gas_used,
            bloom: Bloom::from_logs(&logs),
            logs,
        }
    }
}

impl Encodable for Receipt {
    fn to_rlp(&self) -> RlpItem {
        RlpItem::list(vec![
            RlpItem::boolean(self.success),
            RlpItem::uint(self.cumulative_gas_used),
            RlpItem::bytes(self.bloom.as_bytes().to_vec()),
            self.logs.to_rlp(),
        ])
    }
}

impl Decodable for Receipt {
    fn from_rlp(item: &RlpItem) -> RlpResult<Self> {
        let fields = item.as_list_of(4)?;
        let bloom = fields[2].as_fixed::<256>()?;
        let receipt = Self {
            success: fields[0].as_bool()?,
            cumulative_gas_used: fields[1].as_u64()?,
            bloom: Bloom(bloom),
            logs: Vec::<Log>::from_rlp(&fields[3])?,
        };
        if receipt.bloom != Bloom::from_logs(&receipt.logs) {
            return Err(RlpError::Custom("logs bloom does not match logs".into()));
        }
        Ok(receipt)
    }
}

/// A receipt as returned to the submitter: the consensus receipt plus where
/// it landed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransactionReceipt {
    pub ledger_id: LedgerId,
    pub transaction_hash: H256,
    pub block_hash: H256,
    pub block_number: u64,
    pub transaction_index: u64,
    pub gas_used: u64,
    pub receipt: Receipt,
}

impl TransactionReceipt {
    /// Logs emitted by `address` with the given topic.
    pub fn logs_for<'a>(
        &'a self,
        address: &'a Address,
        topic: &'a H256,
    ) -> impl Iterator<Item = &'a Log> + 'a {
        self.receipt
            .logs
            .iter()
            .filter(move |log| log.address == *address && log.topic() == Some(topic))
    }
}

/// A block as seen by a proof producer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Block {
    pub hash: H256,
    pub number: u64,
    /// Root the ledger reports for this block's receipts trie.
    pub receipts_root: H256,
    /// Every receipt in the block, in transaction order.
    pub receipts: Vec<Receipt>,
}
