use thiserror::Error;

use liftoff_ledger::LedgerError;

/// Outcome of a single upload attempt against one endpoint.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum UploadError {
    /// The provider will not claim this assignment. Not a provider fault.
    #[error("provider declined: {0}")]
    Declined(String),

    #[error("provider returned HTTP {status}: {message}")]
    Http { status: u16, message: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("malformed provider response: {0}")]
    MalformedResponse(String),

    #[error("provider returned an empty identifier")]
    EmptyCid,

    /// The provider stored the bytes but answered with an identifier that
    /// does not parse.
    #[error("provider returned an unrecognized identifier: {0}")]
    UnrecognizedCid(String),
}

impl UploadError {
    /// Returns `true` for the benign "cannot claim" outcome, which is
    /// skipped without counting against the endpoint.
    pub fn is_declined(&self) -> bool {
        matches!(self, Self::Declined(_))
    }

    /// Returns `true` when the provider accepted the upload.
    pub fn is_stored(&self) -> bool {
        matches!(self, Self::UnrecognizedCid(_))
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProviderError {
    #[error("no provider stored {merkle} after {passes} passes ({attempts} attempts)")]
    QuorumNotReached {
        merkle: String,
        passes: u32,
        attempts: usize,
    },

    #[error("transport setup failed: {0}")]
    Setup(String),

    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),
}

pub type ProviderResult<T> = Result<T, ProviderError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_declined_is_declined() {
        assert!(UploadError::Declined("I cannot claim".into()).is_declined());
        assert!(!UploadError::Http { status: 500, message: "boom".into() }.is_declined());
        assert!(!UploadError::Transport("reset".into()).is_declined());
        assert!(!UploadError::EmptyCid.is_declined());
        assert!(!UploadError::UnrecognizedCid("Qm?".into()).is_declined());
    }

    #[test]
    fn only_unrecognized_cid_is_stored() {
        assert!(UploadError::UnrecognizedCid("Qm?".into()).is_stored());
        assert!(!UploadError::EmptyCid.is_stored());
        assert!(!UploadError::Declined("cannot claim".into()).is_stored());
    }
}
