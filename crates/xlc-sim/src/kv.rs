use std::collections::BTreeMap;

use xlc_rlp::{Decodable, Encodable, RlpError, RlpItem, RlpResult};
use xlc_types::TransactionId;

/// Payload understood by a [`KvStore`] contract.
///
/// Encodes as `[0, key]`, `[1, key, value]`, or `[2, reason]`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum KvOp {
    Get { key: Vec<u8> },
    Set { key: Vec<u8>, value: Vec<u8> },
    /// Always fails with `reason`.
    Fail { reason: String },
}

impl KvOp {
    pub fn get(key: impl Into<Vec<u8>>) -> Self {
        Self::Get { key: key.into() }
    }

    pub fn set(key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> Self {
        Self::Set {
            key: key.into(),
            value: value.into(),
        }
    }

    pub fn fail(reason: impl Into<String>) -> Self {
        Self::Fail {
            reason: reason.into(),
        }
    }
}

impl Encodable for KvOp {
    fn to_rlp(&self) -> RlpItem {
        match self {
            Self::Get { key } => RlpItem::list(vec![RlpItem::uint(0), RlpItem::bytes(key.clone())]),
            Self::Set { key, value } => RlpItem::list(vec![
                RlpItem::uint(1),
                RlpItem::bytes(key.clone()),
                RlpItem::bytes(value.clone()),
            ]),
            Self::Fail { reason } => RlpItem::list(vec![
                RlpItem::uint(2),
                RlpItem::bytes(reason.as_bytes().to_vec()),
            ]),
        }
    }
}

impl Decodable for KvOp {
    fn from_rlp(item: &RlpItem) -> RlpResult<Self> {
        let fields = item.as_list()?;
        let tag = fields
            .first()
            .ok_or(RlpError::ListLength { expected: 2, actual: 0 })?
            .as_u64()?;
        match tag {
            0 => {
                let f = item.as_list_of(2)?;
                Ok(Self::get(f[1].as_bytes()?))
            }
            1 => {
                let f = item.as_list_of(3)?;
                Ok(Self::set(f[1].as_bytes()?, f[2].as_bytes()?))
            }
            2 => {
                let f = item.as_list_of(2)?;
                let reason = String::from_utf8(f[1].as_bytes()?.to_vec())
                    .map_err(|e| RlpError::Custom(e.to_string()))?;
                Ok(Self::Fail { reason })
            }
            other => Err(RlpError::Custom(format!("unknown kv op {other}"))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct Lock {
    tx_id: TransactionId,
    /// Value to restore on rollback.
    previous: Option<Vec<u8>>,
}

/// A key/value contract whose segment writes stay provisional until the
/// transaction outcome is signalled.
#[derive(Clone, Debug, Default)]
pub struct KvStore {
    values: BTreeMap<Vec<u8>, Vec<u8>>,
    locks: BTreeMap<Vec<u8>, Lock>,
}

impl KvStore {
    pub fn get(&self, key: &[u8]) -> Option<&Vec<u8>> {
        self.values.get(key)
    }

    pub fn is_locked(&self, key: &[u8]) -> bool {
        self.locks.contains_key(key)
    }

    pub fn has_locks(&self) -> bool {
        !self.locks.is_empty()
    }

    /// Unconditional write, for seeding and for the root call.
    pub fn put(&mut self, key: Vec<u8>, value: Vec<u8>) {
        self.values.insert(key, value);
    }

    /// Write `value` and hold the key for `tx_id` until [`Self::release`].
    pub fn put_locked(&mut self, tx_id: TransactionId, key: Vec<u8>, value: Vec<u8>) -> Result<(), String> {
        if let Some(lock) = self.locks.get(&key) {
            return Err(format!("key is locked by transaction {}", lock.tx_id));
        }
        let previous = self.values.insert(key.clone(), value);
        self.locks.insert(key, Lock { tx_id, previous });
        Ok(())
    }

    /// Release every lock held for `tx_id`, keeping the written values when
    /// `commit` and restoring the previous ones otherwise. Returns how many
    /// keys were released.
    pub fn release(&mut self, tx_id: TransactionId, commit: bool) -> usize {
        let keys: Vec<Vec<u8>> = self
            .locks
            .iter()
            .filter(|(_, lock)| lock.tx_id == tx_id)
            .map(|(key, _)| key.clone())
            .collect();
        for key in &keys {
            let Some(lock) = self.locks.remove(key) else {
                continue;
            };
            if !commit {
                match lock.previous {
                    Some(previous) => self.values.insert(key.clone(), previous),
                    None => self.values.remove(key),
                };
            }
        }
        keys.len()
    }

    /// Whether a Set can be applied for a key right now.
    pub fn check_write(&self, key: &[u8]) -> Result<(), String> {
        match self.locks.get(key) {
            Some(lock) => Err(format!("key is locked by transaction {}", lock.tx_id)),
            None => Ok(()),
        }
    }
}
