use std::path::PathBuf;

use thiserror::Error;

use liftoff_crypto::AddressingError;
use liftoff_ledger::LedgerError;
use liftoff_provider::ProviderError;
use liftoff_types::TypeError;

use crate::directory::SubtreeTally;

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    #[error("file name is not valid UTF-8: {}", .0.display())]
    InvalidFileName(PathBuf),

    #[error("providers returned no identifier for {0}")]
    NoIdentifier(String),

    #[error("addressing error: {0}")]
    Addressing(#[from] AddressingError),

    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("upload error: {0}")]
    Provider(#[from] ProviderError),

    #[error("manifest error: {0}")]
    Type(#[from] TypeError),

    #[error("task failed: {0}")]
    Task(String),

    /// A directory's own node could not be published. `partial` holds the
    /// work already done below it.
    #[error("directory {} was not published: {source}", path.display())]
    Directory {
        path: PathBuf,
        #[source]
        source: Box<PublishError>,
        partial: Box<SubtreeTally>,
    },
}

impl PublishError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

pub type PipelineResult<T> = Result<T, PublishError>;
