use xlc_types::H256;

/// Errors from trie operations and proof replay.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum TrieError {
    #[error("key not present in trie: 0x{}", hex::encode(.0))]
    KeyNotFound(Vec<u8>),

    #[error("proof has no nodes")]
    EmptyProof,

    #[error("reference to step {step} not found in the next node")]
    ReferenceNotFound { step: usize },

    #[error("step {step}: bytes at offset {offset} do not match the reference")]
    ReferenceMismatch { step: usize, offset: usize },

    #[error("replayed root {computed} does not match {expected}")]
    RootMismatch { expected: H256, computed: H256 },
}

/// Result alias for trie operations.
pub type TrieResult<T> = Result<T, TrieError>;
