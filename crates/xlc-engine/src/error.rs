use std::fmt;

use serde::{Deserialize, Serialize};
use xlc_graph::GraphError;
use xlc_ledger::LedgerError;
use xlc_trie::TrieError;
use xlc_trust::TrustError;
use xlc_types::CallPath;

/// Protocol phase a call or error belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Start,
    Segment,
    Root,
    Signalling,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Start => write!(f, "start"),
            Self::Segment => write!(f, "segment"),
            Self::Root => write!(f, "root"),
            Self::Signalling => write!(f, "signalling"),
        }
    }
}

fn at(call_path: &Option<CallPath>) -> String {
    call_path.as_ref().map(|p| format!(" at {p}")).unwrap_or_default()
}

/// Errors that abort a cross-ledger transaction attempt.
///
/// Timeouts are advisory and never surface here.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    /// The ledger could not be reached. The caller may retry the phase.
    #[error("{phase}{}: transport failure: {reason}", at(.call_path))]
    Transport {
        phase: Phase,
        call_path: Option<CallPath>,
        reason: String,
    },

    /// The control contract reverted the call.
    #[error("{phase}{}: rejected: {reason}", at(.call_path))]
    Rejected {
        phase: Phase,
        call_path: Option<CallPath>,
        reason: String,
    },

    /// A recomputed root, hash, or signature disagrees with a claimed one.
    #[error("{phase}{}: proof integrity failure: {reason}", at(.call_path))]
    ProofIntegrity {
        phase: Phase,
        call_path: Option<CallPath>,
        reason: String,
    },

    /// The executor was driven out of order or given an unusable graph.
    #[error("{phase}{}: invariant violation: {reason}", at(.call_path))]
    InvariantViolation {
        phase: Phase,
        call_path: Option<CallPath>,
        reason: String,
    },
}

impl EngineError {
    pub fn invariant(phase: Phase, call_path: Option<&CallPath>, reason: impl Into<String>) -> Self {
        Self::InvariantViolation {
            phase,
            call_path: call_path.cloned(),
            reason: reason.into(),
        }
    }

    pub fn integrity(phase: Phase, call_path: Option<&CallPath>, reason: impl Into<String>) -> Self {
        Self::ProofIntegrity {
            phase,
            call_path: call_path.cloned(),
            reason: reason.into(),
        }
    }

    /// Classify a ledger error.
    pub fn from_ledger(phase: Phase, call_path: Option<&CallPath>, err: LedgerError) -> Self {
        let call_path = call_path.cloned();
        match err {
            LedgerError::Transport(reason) => Self::Transport {
                phase,
                call_path,
                reason,
            },
            LedgerError::UnknownBlock(_) => Self::Transport {
                phase,
                call_path,
                reason: err.to_string(),
            },
            LedgerError::Reverted { reason } => Self::Rejected {
                phase,
                call_path,
                reason,
            },
            LedgerError::UnknownLedger(_) => Self::InvariantViolation {
                phase,
                call_path,
                reason: err.to_string(),
            },
            LedgerError::Codec(_) => Self::ProofIntegrity {
                phase,
                call_path,
                reason: err.to_string(),
            },
        }
    }

    /// Classify a trust error.
    pub fn from_trust(phase: Phase, call_path: Option<&CallPath>, err: TrustError) -> Self {
        match err {
            TrustError::Ledger(inner) => Self::from_ledger(phase, call_path, inner),
            TrustError::Trie(TrieError::KeyNotFound(_)) => {
                Self::invariant(phase, call_path, err.to_string())
            }
            e if e.is_integrity_failure() => Self::integrity(phase, call_path, e.to_string()),
            e => Self::invariant(phase, call_path, e.to_string()),
        }
    }

    pub fn from_graph(phase: Phase, call_path: Option<&CallPath>, err: GraphError) -> Self {
        Self::invariant(phase, call_path, err.to_string())
    }

    pub fn phase(&self) -> Phase {
        match self {
            Self::Transport { phase, .. }
            | Self::Rejected { phase, .. }
            | Self::ProofIntegrity { phase, .. }
            | Self::InvariantViolation { phase, .. } => *phase,
        }
    }

    pub fn call_path(&self) -> Option<&CallPath> {
        match self {
            Self::Transport { call_path, .. }
            | Self::Rejected { call_path, .. }
            | Self::ProofIntegrity { call_path, .. }
            | Self::InvariantViolation { call_path, .. } => call_path.as_ref(),
        }
    }

    /// Only transport failures may be retried; everything else needs a new
    /// transaction id or a fix.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }
}

/// Result alias for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;
