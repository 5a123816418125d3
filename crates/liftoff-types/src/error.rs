use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid hex string: {0}")]
    InvalidHex(String),

    #[error("invalid content identifier {input:?}: {reason}")]
    InvalidCid { input: String, reason: String },

    #[error("empty merkle root")]
    EmptyMerkle,

    #[error("duplicate manifest entry: {0}")]
    DuplicateEntry(String),

    #[error("hidden entry cannot be added to a manifest: {0}")]
    HiddenEntry(String),

    #[error("invalid entry name: {0:?}")]
    InvalidName(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}
