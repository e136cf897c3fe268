use xlc_rlp::RlpError;
use xlc_types::CallPath;

/// Errors from call graph construction, validation, and decoding.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum GraphError {
    #[error("node {0} has no ledger id")]
    MissingLedger(CallPath),

    #[error("node {0} has no contract address")]
    MissingContract(CallPath),

    #[error("no node at call path {0}")]
    UnknownPath(CallPath),

    #[error("malformed call graph: {0}")]
    Malformed(String),

    #[error("codec error: {0}")]
    Codec(#[from] RlpError),
}

/// Result alias for call graph operations.
pub type GraphResult<T> = Result<T, GraphError>;
