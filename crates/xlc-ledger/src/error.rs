use xlc_rlp::RlpError;
use xlc_types::{H256, LedgerId};

/// Errors returned by ledger collaborators.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    /// The node could not be reached or did not answer in time.
    #[error("transport error: {0}")]
    Transport(String),

    /// The contract rejected the call.
    #[error("call reverted: {reason}")]
    Reverted { reason: String },

    #[error("unknown block {0}")]
    UnknownBlock(H256),

    #[error("ledger {0} is not registered")]
    UnknownLedger(LedgerId),

    #[error("codec error: {0}")]
    Codec(#[from] RlpError),
}

impl LedgerError {
    pub fn reverted(reason: impl Into<String>) -> Self {
        Self::Reverted {
            reason: reason.into(),
        }
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}

/// Result alias for ledger operations.
pub type LedgerResult<T> = Result<T, LedgerError>;
