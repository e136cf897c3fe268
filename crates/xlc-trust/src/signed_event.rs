use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;
use xlc_crypto::{SignerSignature, SigningIdentity};
use xlc_ledger::{LedgerHandle, TransactionReceipt};
use xlc_types::{Address, H256};

use crate::error::{TrustError, TrustResult};
use crate::proof::{signed_event_message, Proof, SignedEventProof};
use crate::strategy::{StrategyKind, TrustStrategy};

/// Trust through signatures over the raw event.
///
/// No trie is built and nothing is published: the proof carries the event
/// payload and enough signatures to satisfy the target's threshold, and is
/// submitted inline with the dependent call.
pub struct SignedEventStrategy {
    signers: Vec<Arc<dyn SigningIdentity>>,
}

impl SignedEventStrategy {
    pub fn new(signers: Vec<Arc<dyn SigningIdentity>>) -> Self {
        Self { signers }
    }
}

#[async_trait]
impl TrustStrategy for SignedEventStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::SignedEvent
    }

    async fn produce_proof(
        &self,
        source: &LedgerHandle,
        receipt: &TransactionReceipt,
        topic: H256,
    ) -> TrustResult<Proof> {
        let logs = source.ledger.get_logs(receipt).await?;
        let log = logs
            .into_iter()
            .find(|log| log.address == source.control_contract && log.topic() == Some(&topic))
            .ok_or(TrustError::EventNotFound {
                ledger: source.id(),
                topic,
            })?;

        let message = signed_event_message(source.id(), &source.control_contract, &topic, &log.data);
        let signatures = self
            .signers
            .iter()
            .map(|s| SignerSignature::create(s.as_ref(), &message))
            .collect();

        debug!(ledger = %source.id(), signers = self.signers.len(), "signed event proof");
        Ok(Proof::SignedEvent(SignedEventProof {
            ledger_id: source.id(),
            contract: source.control_contract,
            topic,
            payload: log.data,
            signatures,
        }))
    }

    async fn publish(&self, proof: &Proof, targets: &[LedgerHandle]) -> TrustResult<()> {
        if proof.kind() != self.kind() {
            return Err(TrustError::WrongProofKind {
                expected: self.kind(),
                actual: proof.kind(),
            });
        }
        debug!(targets = targets.len(), "signed event proofs travel inline; nothing to publish");
        Ok(())
    }

    fn signer_addresses(&self) -> Vec<Address> {
        self.signers.iter().map(|s| s.address()).collect()
    }
}
