use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use tracing::debug;
use xlc_types::{Address, LedgerId};

use crate::error::{LedgerError, LedgerResult};
use crate::traits::Ledger;

/// A ledger connection and the addresses of the protocol contracts on it.
#[derive(Clone)]
pub struct LedgerHandle {
    pub ledger: Arc<dyn Ledger>,
    /// Contract that runs start, segment, root, and signalling.
    pub control_contract: Address,
    /// Contract that stores signed receipts roots of other ledgers.
    pub root_storage: Address,
}

impl LedgerHandle {
    pub fn new(ledger: Arc<dyn Ledger>, control_contract: Address, root_storage: Address) -> Self {
        Self {
            ledger,
            control_contract,
            root_storage,
        }
    }

    pub fn id(&self) -> LedgerId {
        self.ledger.id()
    }
}

impl std::fmt::Debug for LedgerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LedgerHandle")
            .field("ledger", &self.ledger.id())
            .field("control_contract", &self.control_contract)
            .field("root_storage", &self.root_storage)
            .finish()
    }
}

/// Ledger id to connection map. Written during setup, read concurrently by
/// any number of transactions afterwards.
#[derive(Default)]
pub struct LedgerRegistry {
    inner: RwLock<HashMap<LedgerId, LedgerHandle>>,
}

impl LedgerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register or replace the connection for the handle's ledger.
    pub fn register(&self, handle: LedgerHandle) {
        let id = handle.id();
        debug!(ledger = %id, control = %handle.control_contract, "registering ledger");
        self.inner.write().expect("lock poisoned").insert(id, handle);
    }

    pub fn get(&self, id: LedgerId) -> LedgerResult<LedgerHandle> {
        self.inner
            .read()
            .expect("lock poisoned")
            .get(&id)
            .cloned()
            .ok_or(LedgerError::UnknownLedger(id))
    }

    pub fn contains(&self, id: LedgerId) -> bool {
        self.inner.read().expect("lock poisoned").contains_key(&id)
    }

    /// Registered ledger ids, ascending.
    pub fn ids(&self) -> Vec<LedgerId> {
        let mut ids: Vec<_> = self.inner.read().expect("lock poisoned").keys().copied().collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.inner.read().expect("lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
