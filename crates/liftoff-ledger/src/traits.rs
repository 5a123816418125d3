use async_trait::async_trait;

use liftoff_types::{MerkleRoot, ProviderRecord};

use crate::error::LedgerResult;
use crate::records::{FileRecord, StorageParams, TxBatch, TxResponse};

/// Boundary to the ledger: broadcasting registrations and querying state.
///
/// Key derivation and transaction signing live behind this trait.
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Account address that signs and pays for broadcasts.
    fn submitter(&self) -> &str;

    /// Height of the latest committed block.
    async fn latest_height(&self) -> LedgerResult<i64>;

    async fn storage_params(&self) -> LedgerResult<StorageParams>;

    /// Sign, broadcast, and wait for the batch to be committed.
    ///
    /// Returns [`crate::LedgerError::CommitTimeout`] when the transaction
    /// was not included before the commit wait expired.
    async fn broadcast(&self, batch: &TxBatch) -> LedgerResult<TxResponse>;

    /// Up to `limit` providers currently accepting uploads.
    async fn active_providers(&self, limit: usize) -> LedgerResult<Vec<ProviderRecord>>;

    /// Existing registrations for a Merkle root.
    async fn files_by_merkle(&self, merkle: &MerkleRoot) -> LedgerResult<Vec<FileRecord>>;
}
