use std::sync::Arc;

use bytes::Bytes;
use tracing::{debug, info};

use liftoff_crypto::{ContentAddressing, DirNode};
use liftoff_ledger::{expiry_height, LedgerClient, LedgerQueue, Memo, RegisterContent};
use liftoff_provider::{UploadJob, UploadProtocol};
use liftoff_types::{ContentId, ContentKind, PublishResult};

use crate::config::PublishConfig;
use crate::error::PipelineResult;

/// Per-object publish: chunk, deduplicate, register, upload.
///
/// Shared by every task of a directory walk.
pub struct Pipeline {
    ledger: Arc<dyn LedgerClient>,
    queue: Arc<LedgerQueue>,
    addressing: Arc<dyn ContentAddressing>,
    uploader: Arc<UploadProtocol>,
    config: PublishConfig,
}

impl Pipeline {
    pub fn new(
        ledger: Arc<dyn LedgerClient>,
        queue: Arc<LedgerQueue>,
        addressing: Arc<dyn ContentAddressing>,
        uploader: Arc<UploadProtocol>,
        config: PublishConfig,
    ) -> Self {
        Self {
            ledger,
            queue,
            addressing,
            uploader,
            config,
        }
    }

    pub fn config(&self) -> &PublishConfig {
        &self.config
    }

    pub fn queue(&self) -> &LedgerQueue {
        &self.queue
    }

    pub fn addressing(&self) -> &dyn ContentAddressing {
        self.addressing.as_ref()
    }

    pub fn uploader(&self) -> &UploadProtocol {
        &self.uploader
    }

    /// Publish file contents.
    pub async fn publish_file(&self, data: Bytes) -> PipelineResult<PublishResult> {
        let hint = self.addressing.raw_cid(&data);
        self.publish_object(data, ContentKind::File, hint).await
    }

    /// Publish a serialized directory node.
    pub async fn publish_dir_node(&self, node: DirNode) -> PipelineResult<PublishResult> {
        self.publish_object(Bytes::from(node.bytes), ContentKind::Folder, node.cid)
            .await
    }

    /// Publish one object. `hint` is recorded in the registration memo.
    ///
    /// A Merkle root that already carries a storage proof returns the
    /// recorded identifier without registering or uploading again.
    pub async fn publish_object(
        &self,
        data: Bytes,
        kind: ContentKind,
        hint: ContentId,
    ) -> PipelineResult<PublishResult> {
        let params = self.ledger.storage_params().await?;
        let chunked = self.addressing.chunk(&data, params.chunk_size)?;
        let merkle = chunked.merkle;

        if let Some(cid) = self.uploader.lookup_existing(&merkle).await? {
            info!(merkle = %merkle.short_hex(), %cid, %kind, "already stored");
            return Ok(PublishResult {
                cids: vec![cid],
                merkle,
                deduplicated: true,
            });
        }

        let height = self.ledger.latest_height().await?;
        let expires = expiry_height(height, self.config.term_years)?;
        let note = Memo::new(self.config.memo.clone(), Some(hint.clone())).to_json()?;
        let message = RegisterContent::new(
            self.ledger.submitter(),
            merkle.clone(),
            chunked.size,
            kind,
            expires,
            note,
        )
        .with_redundancy(self.config.redundancy)
        .with_proof_interval(self.config.proof_interval);

        let receipt = self.queue.post(message).await?;
        let response = receipt.message_response()?;
        debug!(
            merkle = %merkle.short_hex(),
            tx_hash = %receipt.tx().tx_hash,
            start = response.start_block,
            assigned = response.provider_ips.len(),
            "registered"
        );

        let job = UploadJob {
            data,
            merkle: merkle.clone(),
            start: response.start_block,
            sender: self.ledger.submitter().to_string(),
            local_cid: hint,
        };
        let cids = self.uploader.upload(&job).await?;
        Ok(PublishResult {
            cids,
            merkle,
            deduplicated: false,
        })
    }
}
