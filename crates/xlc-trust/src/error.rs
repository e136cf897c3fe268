use xlc_crypto::SignatureError;
use xlc_ledger::LedgerError;
use xlc_rlp::RlpError;
use xlc_trie::TrieError;
use xlc_types::{LedgerId, H256};

use crate::strategy::StrategyKind;

/// Errors from producing, publishing, or verifying proofs.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TrustError {
    /// The locally rebuilt receipts trie disagrees with the ledger's root.
    #[error("ledger {ledger} block {block}: reported receipts root {reported}, rebuilt {computed}")]
    RootMismatch {
        ledger: LedgerId,
        block: H256,
        reported: H256,
        computed: H256,
    },

    #[error("ledger {ledger} has no root {root} on record")]
    UntrustedRoot { ledger: LedgerId, root: H256 },

    #[error("no event {topic} from {ledger} in the proven receipt")]
    EventNotFound { ledger: LedgerId, topic: H256 },

    #[error("{valid} valid signatures, {threshold} required")]
    InsufficientSignatures { valid: usize, threshold: usize },

    #[error("strategy {expected} cannot handle a {actual} proof")]
    WrongProofKind {
        expected: StrategyKind,
        actual: StrategyKind,
    },

    #[error("trie error: {0}")]
    Trie(#[from] TrieError),

    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("codec error: {0}")]
    Codec(#[from] RlpError),

    #[error("signature error: {0}")]
    Signature(#[from] SignatureError),
}

impl TrustError {
    /// Recomputed data disagrees with a claimed value. Never recoverable.
    pub fn is_integrity_failure(&self) -> bool {
        match self {
            Self::RootMismatch { .. }
            | Self::UntrustedRoot { .. }
            | Self::InsufficientSignatures { .. }
            | Self::Signature(_)
            | Self::Codec(_) => true,
            Self::Trie(e) => !matches!(e, TrieError::KeyNotFound(_)),
            Self::EventNotFound { .. } | Self::WrongProofKind { .. } | Self::Ledger(_) => false,
        }
    }
}

/// Result alias for trust operations.
pub type TrustResult<T> = Result<T, TrustError>;
