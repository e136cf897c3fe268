use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::info;
use xlc_ledger::{LedgerHandle, LedgerRegistry};
use xlc_trust::{register_signers, TrustResult};
use xlc_types::{Address, Clock, LedgerId};

use crate::ledger::SimLedger;

/// A set of simulated ledgers that know each other's control contracts,
/// plus the registry an executor uses to reach them.
pub struct SimNetwork {
    ledgers: BTreeMap<LedgerId, Arc<SimLedger>>,
    registry: Arc<LedgerRegistry>,
}

impl SimNetwork {
    pub fn new(ids: &[LedgerId], clock: Arc<dyn Clock>) -> Self {
        let ledgers: BTreeMap<LedgerId, Arc<SimLedger>> = ids
            .iter()
            .map(|id| (*id, SimLedger::with_clock(*id, Arc::clone(&clock))))
            .collect();
        for (id, ledger) in &ledgers {
            for (other_id, other) in &ledgers {
                if other_id != id {
                    ledger.register_remote(*other_id, other.control_contract());
                }
            }
        }

        let registry = Arc::new(LedgerRegistry::new());
        for ledger in ledgers.values() {
            registry.register(ledger.handle());
        }
        info!(ledgers = ledgers.len(), "simulated network ready");
        Self { ledgers, registry }
    }

    pub fn ledger(&self, id: LedgerId) -> Option<&Arc<SimLedger>> {
        self.ledgers.get(&id)
    }

    pub fn ids(&self) -> Vec<LedgerId> {
        self.ledgers.keys().copied().collect()
    }

    pub fn handles(&self) -> Vec<LedgerHandle> {
        self.ledgers.values().map(SimLedger::handle).collect()
    }

    pub fn registry(&self) -> Arc<LedgerRegistry> {
        Arc::clone(&self.registry)
    }

    /// Trust `signers` on every ledger for claims about every ledger.
    pub async fn register_signers(&self, signers: &[Address]) -> TrustResult<()> {
        register_signers(&self.handles(), &self.ids(), signers).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use xlc_crypto::SigningKey;
    use xlc_types::SystemClock;

    #[tokio::test]
    async fn every_ledger_trusts_the_signers_for_every_ledger() {
        let ids = [LedgerId::new(1), LedgerId::new(2)];
        let network = SimNetwork::new(&ids, Arc::new(SystemClock));
        let signer = SigningKey::generate().address();
        network.register_signers(&[signer]).await.unwrap();

        for id in ids {
            let ledger = network.ledger(id).unwrap();
            for source in ids {
                assert!(ledger.signers(source).contains(&signer));
            }
            assert_eq!(ledger.call_count("registerSigner"), 2);
        }
        assert_eq!(network.registry().ids(), ids.to_vec());
    }
}
