use liftoff_types::TypeError;

/// Errors from content addressing operations.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum AddressingError {
    #[error("chunk size must be positive")]
    InvalidChunkSize,

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error(transparent)]
    Type(#[from] TypeError),
}

pub type AddressingResult<T> = Result<T, AddressingError>;
