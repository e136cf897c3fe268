use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RlpError {
    #[error("unexpected end of input: need {needed} bytes, have {available}")]
    UnexpectedEnd { needed: usize, available: usize },

    #[error("non-canonical encoding: {0}")]
    NonCanonical(String),

    #[error("trailing bytes after item: {0}")]
    TrailingBytes(usize),

    #[error("expected a byte string, found a list")]
    ExpectedBytes,

    #[error("expected a list, found a byte string")]
    ExpectedList,

    #[error("expected a list of {expected} items, found {actual}")]
    ListLength { expected: usize, actual: usize },

    #[error("integer does not fit in {max_bytes} bytes (got {actual})")]
    Overflow { max_bytes: usize, actual: usize },

    #[error("integer has a leading zero byte")]
    LeadingZero,

    #[error("invalid fixed-length value: expected {expected} bytes, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("nesting exceeds {0} levels")]
    TooDeep(usize),

    #[error("invalid value: {0}")]
    Custom(String),
}

pub type RlpResult<T> = Result<T, RlpError>;
