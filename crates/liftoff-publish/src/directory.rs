use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;

use bytes::Bytes;
use tokio::fs::ReadDir;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinSet;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

use liftoff_types::{is_hidden, ContentId, DirectoryManifest, MerkleRoot, PublishResult};

use crate::audit::write_audit;
use crate::error::{PipelineResult, PublishError};
use crate::pipeline::Pipeline;

/// An entry that could not be published. Siblings are unaffected.
#[derive(Debug)]
pub struct EntryFailure {
    pub path: PathBuf,
    pub error: PublishError,
}

/// Work finished below a directory, kept even if the directory's own node
/// is never published.
#[derive(Debug, Default)]
pub struct SubtreeTally {
    /// Leaf files published.
    pub files: usize,
    /// Directory nodes published.
    pub directories: usize,
    /// Leaf files that were already stored.
    pub deduplicated: usize,
    pub failures: Vec<EntryFailure>,
}

impl SubtreeTally {
    fn absorb(&mut self, other: SubtreeTally) {
        self.files += other.files;
        self.directories += other.directories;
        self.deduplicated += other.deduplicated;
        self.failures.extend(other.failures);
    }

    fn fail(&mut self, path: PathBuf, error: PublishError) {
        warn!(path = %path.display(), %error, "entry failed");
        self.failures.push(EntryFailure { path, error });
    }
}

/// Outcome of publishing one directory and everything below it.
#[derive(Debug)]
pub struct DirectoryReport {
    /// Identifier of the directory node.
    pub cid: ContentId,
    /// Merkle root of the serialized directory node.
    pub merkle: MerkleRoot,
    pub manifest: DirectoryManifest,
    /// Leaf files published in this subtree.
    pub files: usize,
    /// Directory nodes published in this subtree, this one included.
    pub directories: usize,
    /// Leaf files that were already stored.
    pub deduplicated: usize,
    pub failures: Vec<EntryFailure>,
}

impl DirectoryReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

type DirFuture = Pin<Box<dyn Future<Output = PipelineResult<DirectoryReport>> + Send>>;

enum Child {
    File(PipelineResult<PublishResult>),
    Dir(PipelineResult<DirectoryReport>),
}

/// Recursively publishes a directory tree.
///
/// One task is spawned per entry. A single semaphore shared by the whole
/// walk bounds how many file publishes (leaf files and directory nodes) are
/// in progress at once; walking a subdirectory holds no permit. Once a
/// child is spawned the walk always waits for it, whatever else fails.
#[derive(Clone)]
pub struct DirectoryPublisher {
    pipeline: Arc<Pipeline>,
    limiter: Arc<Semaphore>,
}

impl DirectoryPublisher {
    pub fn new(pipeline: Arc<Pipeline>) -> Self {
        let permits = pipeline.config().max_in_flight.max(1);
        Self {
            pipeline,
            limiter: Arc::new(Semaphore::new(permits)),
        }
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// Publish `root` and return the report for the whole tree.
    ///
    /// If the root's own node cannot be published the error is
    /// [`PublishError::Directory`], carrying what was done below it.
    pub async fn publish(&self, root: impl AsRef<Path>) -> PipelineResult<DirectoryReport> {
        let root = root.as_ref().to_path_buf();
        let meta = tokio::fs::metadata(&root)
            .await
            .map_err(|e| PublishError::io(&root, e))?;
        if !meta.is_dir() {
            return Err(PublishError::NotADirectory(root));
        }
        self.publish_dir(root).await
    }

    fn publish_dir(&self, dir: PathBuf) -> DirFuture {
        let this = self.clone();
        Box::pin(async move { this.walk(dir).await })
    }

    async fn acquire(&self) -> PipelineResult<OwnedSemaphorePermit> {
        Arc::clone(&self.limiter)
            .acquire_owned()
            .await
            .map_err(|e| PublishError::Task(e.to_string()))
    }

    async fn publish_path(&self, path: &Path) -> PipelineResult<PublishResult> {
        let data = tokio::fs::read(path)
            .await
            .map_err(|e| PublishError::io(path, e))?;
        self.pipeline.publish_file(Bytes::from(data)).await
    }

    /// Spawn one task per visible entry. A listing error stops spawning but
    /// leaves the tasks already started in `tasks`.
    async fn spawn_children(
        &self,
        dir: &Path,
        mut reader: ReadDir,
        tasks: &mut JoinSet<(String, PathBuf, Child)>,
        tally: &mut SubtreeTally,
    ) {
        loop {
            let entry = match reader.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => return,
                Err(e) => return tally.fail(dir.to_path_buf(), PublishError::io(dir, e)),
            };
            let path = entry.path();
            let name = match entry.file_name().into_string() {
                Ok(name) => name,
                Err(_) => {
                    tally.fail(path.clone(), PublishError::InvalidFileName(path));
                    continue;
                }
            };
            if is_hidden(&name) {
                continue;
            }
            // Follows symlinks.
            let meta = match tokio::fs::metadata(&path).await {
                Ok(meta) => meta,
                Err(e) => {
                    tally.fail(path.clone(), PublishError::io(&path, e));
                    continue;
                }
            };

            if meta.is_dir() {
                let child = self.publish_dir(path.clone());
                tasks.spawn(async move { (name, path, Child::Dir(child.await)) });
            } else {
                let permit = match self.acquire().await {
                    Ok(permit) => permit,
                    Err(error) => return tally.fail(path, error),
                };
                let this = self.clone();
                tasks.spawn(async move {
                    let result = this.publish_path(&path).await;
                    drop(permit);
                    (name, path, Child::File(result))
                });
            }
        }
    }

    /// Wait for every spawned child and fold its outcome into `manifest`.
    async fn collect_children(
        &self,
        dir: &Path,
        mut tasks: JoinSet<(String, PathBuf, Child)>,
        manifest: &mut DirectoryManifest,
        tally: &mut SubtreeTally,
    ) {
        let mut heartbeat = tokio::time::interval(self.pipeline.config().heartbeat());
        heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);
        heartbeat.tick().await;

        loop {
            let joined = tokio::select! {
                joined = tasks.join_next() => joined,
                _ = heartbeat.tick() => {
                    let queue = self.pipeline.queue();
                    info!(
                        dir = %dir.display(),
                        remaining = tasks.len(),
                        queued = queue.pending_len(),
                        busy = queue.too_busy(),
                        "still publishing"
                    );
                    continue;
                }
            };
            let Some(joined) = joined else { break };
            let (name, path, child) = match joined {
                Ok(done) => done,
                Err(e) => {
                    tally.fail(dir.to_path_buf(), PublishError::Task(e.to_string()));
                    continue;
                }
            };

            let cid = match child {
                Child::File(Ok(result)) => match result.primary() {
                    Some(cid) => {
                        tally.files += 1;
                        if result.deduplicated {
                            tally.deduplicated += 1;
                        }
                        cid.clone()
                    }
                    None => {
                        tally.fail(path, PublishError::NoIdentifier(result.merkle.short_hex()));
                        continue;
                    }
                },
                Child::Dir(Ok(report)) => {
                    tally.files += report.files;
                    tally.directories += report.directories;
                    tally.deduplicated += report.deduplicated;
                    tally.failures.extend(report.failures);
                    report.cid
                }
                Child::Dir(Err(PublishError::Directory { source, partial, .. })) => {
                    tally.absorb(*partial);
                    tally.fail(path, *source);
                    continue;
                }
                Child::File(Err(error)) | Child::Dir(Err(error)) => {
                    tally.fail(path, error);
                    continue;
                }
            };
            if let Err(e) = manifest.insert(name, cid) {
                tally.fail(path, e.into());
            }
        }
    }

    /// Write the audit copy and publish the directory node. Returns the
    /// node's local identifier and its Merkle root.
    async fn publish_node(
        &self,
        dir: &Path,
        manifest: &DirectoryManifest,
    ) -> PipelineResult<(ContentId, MerkleRoot)> {
        let config = self.pipeline.config();
        if config.write_audit {
            write_audit(&config.audit_dir, dir, manifest).await?;
        }
        let node = self.pipeline.addressing().build_dir_node(manifest)?;
        let cid = node.cid.clone();
        let _permit = self.acquire().await?;
        let published = self.pipeline.publish_dir_node(node).await?;
        Ok((cid, published.merkle))
    }

    async fn walk(&self, dir: PathBuf) -> PipelineResult<DirectoryReport> {
        let reader = tokio::fs::read_dir(&dir)
            .await
            .map_err(|e| PublishError::io(&dir, e))?;
        let mut tasks = JoinSet::new();
        let mut tally = SubtreeTally::default();
        let mut manifest = DirectoryManifest::new();

        self.spawn_children(&dir, reader, &mut tasks, &mut tally).await;
        self.collect_children(&dir, tasks, &mut manifest, &mut tally).await;

        let (cid, merkle) = match self.publish_node(&dir, &manifest).await {
            Ok(published) => published,
            Err(source) => {
                return Err(PublishError::Directory {
                    path: dir,
                    source: Box::new(source),
                    partial: Box::new(tally),
                })
            }
        };
        info!(
            dir = %dir.display(),
            %cid,
            entries = manifest.len(),
            failures = tally.failures.len(),
            "directory published"
        );

        Ok(DirectoryReport {
            cid,
            merkle,
            manifest,
            files: tally.files,
            directories: tally.directories + 1,
            deduplicated: tally.deduplicated,
            failures: tally.failures,
        })
    }
}
