use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;
use xlc_ledger::{ControlCall, LedgerHandle, TransactionReceipt};
use xlc_types::{Address, LedgerId, H256};

use crate::error::TrustResult;
use crate::proof::Proof;

/// Which trust strategy a deployment uses.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StrategyKind {
    #[default]
    ReceiptRoot,
    SignedEvent,
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReceiptRoot => write!(f, "receipt-root"),
            Self::SignedEvent => write!(f, "signed-event"),
        }
    }
}

impl FromStr for StrategyKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "receipt-root" => Ok(Self::ReceiptRoot),
            "signed-event" => Ok(Self::SignedEvent),
            other => Err(format!("unknown trust strategy: {other}")),
        }
    }
}

/// Produces proofs of events and makes them acceptable to other ledgers.
///
/// `publish` must complete before any target ledger is asked to accept a
/// call that depends on the proof.
#[async_trait]
pub trait TrustStrategy: Send + Sync {
    fn kind(&self) -> StrategyKind;

    /// Prove that the transaction behind `receipt`, submitted to `source`,
    /// emitted an event with `topic` from the source's control contract.
    async fn produce_proof(
        &self,
        source: &LedgerHandle,
        receipt: &TransactionReceipt,
        topic: H256,
    ) -> TrustResult<Proof>;

    /// Make the artifact behind `proof` available on every target.
    async fn publish(&self, proof: &Proof, targets: &[LedgerHandle]) -> TrustResult<()>;

    /// Addresses of the identities this strategy signs with.
    fn signer_addresses(&self) -> Vec<Address>;
}

/// Register `signers` on every target as trusted for claims about each of
/// `sources`.
pub async fn register_signers(
    targets: &[LedgerHandle],
    sources: &[LedgerId],
    signers: &[Address],
) -> TrustResult<()> {
    for target in targets {
        for source in sources {
            for signer in signers {
                debug!(target = %target.id(), source = %source, signer = %signer, "registering signer");
                let call = ControlCall::RegisterSigner {
                    source: *source,
                    signer: *signer,
                };
                target.ledger.submit(target.root_storage, &call).await?;
            }
        }
    }
    Ok(())
}
