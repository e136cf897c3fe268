use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use xlc_ledger::{
    Block, ControlCall, Ledger, LedgerError, LedgerHandle, LedgerResult, Log, Receipt,
    TransactionReceipt,
};
use xlc_trie::ordered_root;
use xlc_rlp::Encodable;
use xlc_types::{Address, LedgerId, H256};

pub const CONTROL: Address = Address::new([0xc0; 20]);
pub const ROOT_STORAGE: Address = Address::new([0x5e; 20]);

/// A ledger with one fixed block whose second receipt carries `log`.
/// Records every submitted call.
pub struct RecordingLedger {
    id: LedgerId,
    block: Block,
    reject: Option<String>,
    calls: Mutex<Vec<ControlCall>>,
}

impl RecordingLedger {
    pub fn with_event(id: LedgerId, log: Log, corrupt_root: bool) -> Arc<Self> {
        let receipts = vec![
            Receipt::new(true, 21_000, vec![]),
            Receipt::new(true, 80_000, vec![log]),
            Receipt::new(false, 101_000, vec![]),
        ];
        let encoded: Vec<Vec<u8>> = receipts.iter().map(Encodable::rlp_bytes).collect();
        let mut receipts_root = ordered_root(&encoded);
        if corrupt_root {
            receipts_root = H256::new([0xee; 32]);
        }
        Arc::new(Self {
            id,
            block: Block {
                hash: H256::new([id.as_u64() as u8; 32]),
                number: 1,
                receipts_root,
                receipts,
            },
            reject: None,
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn empty(id: LedgerId) -> Arc<Self> {
        Arc::new(Self {
            id,
            block: Block {
                hash: H256::zero(),
                number: 0,
                receipts_root: xlc_trie::EMPTY_ROOT,
                receipts: vec![],
            },
            reject: None,
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn rejecting(id: LedgerId, reason: &str) -> Arc<Self> {
        let mut ledger = Self::empty(id);
        if let Some(inner) = Arc::get_mut(&mut ledger) {
            inner.reject = Some(reason.to_string());
        }
        ledger
    }

    pub fn block(&self) -> Block {
        self.block.clone()
    }

    pub fn receipt(&self) -> TransactionReceipt {
        TransactionReceipt {
            ledger_id: self.id,
            transaction_hash: H256::new([1; 32]),
            block_hash: self.block.hash,
            block_number: self.block.number,
            transaction_index: 1,
            gas_used: 59_000,
            receipt: self.block.receipts[1].clone(),
        }
    }

    pub fn calls(&self) -> Vec<ControlCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Ledger for RecordingLedger {
    fn id(&self) -> LedgerId {
        self.id
    }

    async fn submit(&self, _contract: Address, call: &ControlCall) -> LedgerResult<TransactionReceipt> {
        if let Some(reason) = &self.reject {
            return Err(LedgerError::reverted(reason.clone()));
        }
        self.calls.lock().unwrap().push(call.clone());
        Ok(self.receipt_or_empty())
    }

    async fn get_block(&self, hash: &H256) -> LedgerResult<Block> {
        if *hash == self.block.hash {
            Ok(self.block.clone())
        } else {
            Err(LedgerError::UnknownBlock(*hash))
        }
    }
}

impl RecordingLedger {
    fn receipt_or_empty(&self) -> TransactionReceipt {
        TransactionReceipt {
            ledger_id: self.id,
            transaction_hash: H256::zero(),
            block_hash: self.block.hash,
            block_number: self.block.number,
            transaction_index: 0,
            gas_used: 21_000,
            receipt: Receipt::new(true, 21_000, vec![]),
        }
    }
}

pub fn handle(ledger: Arc<RecordingLedger>) -> LedgerHandle {
    LedgerHandle::new(ledger, CONTROL, ROOT_STORAGE)
}
