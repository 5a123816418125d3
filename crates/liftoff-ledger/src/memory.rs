use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use liftoff_types::{ContentId, MerkleRoot, ProviderRecord};

use crate::error::{LedgerError, LedgerResult};
use crate::records::{
    FileRecord, RegisterContent, RegisterContentResponse, StorageParams, TxBatch, TxResponse,
};
use crate::traits::LedgerClient;

/// Chunk size reported when none is configured.
pub const DEFAULT_CHUNK_SIZE: u64 = 10 * 1024;

/// In-memory ledger for tests, local demos, and embedding.
///
/// Every committed batch advances the height by one. Failures can be
/// scripted: a number of upcoming broadcasts can be made to time out, and
/// the next broadcast can be made to return a non-zero result code.
pub struct InMemoryLedger {
    submitter: String,
    inner: RwLock<LedgerState>,
}

#[derive(Default)]
struct LedgerState {
    height: i64,
    chunk_size: u64,
    providers: Vec<ProviderRecord>,
    files: HashMap<MerkleRoot, Vec<FileRecord>>,
    committed: Vec<TxBatch>,
    attempts: usize,
    provider_queries: usize,
    pending_timeouts: usize,
    pending_rejection: Option<(u32, String)>,
}

impl InMemoryLedger {
    pub fn new(submitter: impl Into<String>) -> Self {
        Self {
            submitter: submitter.into(),
            inner: RwLock::new(LedgerState {
                height: 1,
                chunk_size: DEFAULT_CHUNK_SIZE,
                ..Default::default()
            }),
        }
    }

    /// Replace the advertised provider set.
    pub fn with_providers(self, providers: Vec<ProviderRecord>) -> Self {
        self.inner.write().expect("lock poisoned").providers = providers;
        self
    }

    pub fn set_chunk_size(&self, chunk_size: u64) {
        self.inner.write().expect("lock poisoned").chunk_size = chunk_size;
    }

    /// Make the next `count` broadcasts fail with a commit timeout.
    pub fn inject_commit_timeouts(&self, count: usize) {
        self.inner.write().expect("lock poisoned").pending_timeouts = count;
    }

    /// Make the next broadcast return a failed result code.
    pub fn reject_next(&self, code: u32, log: impl Into<String>) {
        self.inner.write().expect("lock poisoned").pending_rejection = Some((code, log.into()));
    }

    /// Record a storage proof (and identifier) for a registered root,
    /// creating the registration if it does not exist yet.
    pub fn record_proof(&self, merkle: &MerkleRoot, prover: impl Into<String>, cid: ContentId) {
        let mut state = self.inner.write().expect("lock poisoned");
        let height = state.height;
        let owner = self.submitter.clone();
        let records = state.files.entry(merkle.clone()).or_default();
        if records.is_empty() {
            records.push(FileRecord {
                merkle: merkle.clone(),
                owner,
                start: height,
                proofs: Vec::new(),
                cid: None,
            });
        }
        if let Some(record) = records.first_mut() {
            record.proofs.push(prover.into());
            record.cid = Some(cid);
        }
    }

    /// Batches that were committed, in commit order.
    pub fn committed_batches(&self) -> Vec<TxBatch> {
        self.inner.read().expect("lock poisoned").committed.clone()
    }

    /// All committed registrations, in commit order.
    pub fn registrations(&self) -> Vec<RegisterContent> {
        self.inner
            .read()
            .expect("lock poisoned")
            .committed
            .iter()
            .flat_map(|b| b.messages.iter().cloned())
            .collect()
    }

    /// Broadcast calls received, including failed ones.
    pub fn broadcast_attempts(&self) -> usize {
        self.inner.read().expect("lock poisoned").attempts
    }

    /// Provider list queries received.
    pub fn provider_queries(&self) -> usize {
        self.inner.read().expect("lock poisoned").provider_queries
    }

    pub fn height(&self) -> i64 {
        self.inner.read().expect("lock poisoned").height
    }
}

impl std::fmt::Debug for InMemoryLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.read().expect("lock poisoned");
        f.debug_struct("InMemoryLedger")
            .field("submitter", &self.submitter)
            .field("height", &state.height)
            .field("committed", &state.committed.len())
            .finish()
    }
}

#[async_trait]
impl LedgerClient for InMemoryLedger {
    fn submitter(&self) -> &str {
        &self.submitter
    }

    async fn latest_height(&self) -> LedgerResult<i64> {
        Ok(self.height())
    }

    async fn storage_params(&self) -> LedgerResult<StorageParams> {
        let chunk_size = self.inner.read().expect("lock poisoned").chunk_size;
        Ok(StorageParams { chunk_size })
    }

    async fn broadcast(&self, batch: &TxBatch) -> LedgerResult<TxResponse> {
        let mut state = self.inner.write().expect("lock poisoned");
        state.attempts += 1;

        if state.pending_timeouts > 0 {
            state.pending_timeouts -= 1;
            return Err(LedgerError::CommitTimeout);
        }
        if batch.messages.is_empty() {
            return Err(LedgerError::Validation("empty transaction".into()));
        }

        state.height += 1;
        let height = state.height;
        let tx_hash = tx_hash(height, state.committed.len());

        if let Some((code, log)) = state.pending_rejection.take() {
            return Ok(TxResponse {
                code,
                tx_hash,
                height,
                raw_log: log,
                responses: Vec::new(),
            });
        }

        let mut responses = Vec::with_capacity(batch.messages.len());
        for msg in &batch.messages {
            let assigned = state
                .providers
                .iter()
                .take(usize::try_from(msg.max_proofs).unwrap_or(0))
                .map(|p| p.endpoint.clone())
                .collect();
            state
                .files
                .entry(msg.merkle.clone())
                .or_default()
                .push(FileRecord {
                    merkle: msg.merkle.clone(),
                    owner: msg.creator.clone(),
                    start: height,
                    proofs: Vec::new(),
                    cid: None,
                });
            responses.push(RegisterContentResponse {
                provider_ips: assigned,
                start_block: height,
            });
        }
        state.committed.push(batch.clone());

        Ok(TxResponse {
            code: 0,
            tx_hash,
            height,
            raw_log: String::new(),
            responses,
        })
    }

    async fn active_providers(&self, limit: usize) -> LedgerResult<Vec<ProviderRecord>> {
        let mut state = self.inner.write().expect("lock poisoned");
        state.provider_queries += 1;
        Ok(state.providers.iter().take(limit).cloned().collect())
    }

    async fn files_by_merkle(&self, merkle: &MerkleRoot) -> LedgerResult<Vec<FileRecord>> {
        let state = self.inner.read().expect("lock poisoned");
        Ok(state.files.get(merkle).cloned().unwrap_or_default())
    }
}

fn tx_hash(height: i64, index: usize) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(&height.to_be_bytes());
    hasher.update(&(index as u64).to_be_bytes());
    hex::encode_upper(&hasher.finalize().as_bytes()[..])
}
