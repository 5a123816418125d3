use liftoff_types::TypeError;

/// Errors produced by ledger operations.
///
/// Callers branch on the variant (see [`LedgerError::is_transient`]), never
/// on the rendered message.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    /// The transaction was broadcast but not included in a block before the
    /// commit wait expired. The same batch may be resubmitted.
    #[error("timed out waiting for tx to be included in a block")]
    CommitTimeout,

    #[error("message failed validation: {0}")]
    Validation(String),

    #[error("transaction rejected with code {code}: {log}")]
    Rejected { code: u32, log: String },

    #[error("ledger returned an empty response")]
    EmptyResponse,

    #[error("no response data for message {index} in transaction {tx_hash}")]
    MissingMessageResponse { tx_hash: String, index: usize },

    #[error("ledger queue stopped")]
    QueueStopped,

    #[error("ledger rpc error: {0}")]
    Rpc(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error(transparent)]
    Type(#[from] TypeError),
}

impl LedgerError {
    /// Returns `true` if resubmitting the identical batch may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::CommitTimeout)
    }
}

/// Result alias for ledger operations.
pub type LedgerResult<T> = Result<T, LedgerError>;
