use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::{oneshot, Mutex as AsyncMutex, Notify};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::error::{LedgerError, LedgerResult};
use crate::records::{FeeMode, RegisterContent, RegisterContentResponse, TxBatch, TxResponse};
use crate::traits::LedgerClient;

/// Configuration for the [`LedgerQueue`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Time between drain attempts.
    pub interval_ms: u64,
    /// Maximum messages per transaction.
    pub batch_size: usize,
    pub gas_limit: u64,
    pub fee: FeeMode,
    /// Pending depth above which [`LedgerQueue::too_busy`] reports `true`.
    pub busy_threshold: usize,
    /// Pause before resubmitting a batch whose commit timed out.
    pub retry_delay_ms: u64,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            interval_ms: 8_000,
            batch_size: 10,
            gas_limit: 2_000_000,
            fee: FeeMode::Auto,
            busy_threshold: 100,
            retry_delay_ms: 1_000,
        }
    }
}

impl QueueConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms.max(1))
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

/// What a caller of [`LedgerQueue::post`] receives once its batch commits.
///
/// Every message in a batch shares the same transaction response; `index`
/// locates this caller's own message within it.
#[derive(Clone, Debug)]
pub struct BatchReceipt {
    tx: Arc<TxResponse>,
    index: usize,
    batch: u64,
}

impl BatchReceipt {
    pub fn tx(&self) -> &TxResponse {
        &self.tx
    }

    /// Position of the caller's message in the transaction.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Sequence number of the drained batch, starting at zero.
    pub fn batch_seq(&self) -> u64 {
        self.batch
    }

    /// The response data for this caller's message.
    pub fn message_response(&self) -> LedgerResult<&RegisterContentResponse> {
        self.tx
            .responses
            .get(self.index)
            .ok_or_else(|| LedgerError::MissingMessageResponse {
                tx_hash: self.tx.tx_hash.clone(),
                index: self.index,
            })
    }
}

/// A queued message and the one-shot slot its caller is waiting on.
struct Envelope {
    message: RegisterContent,
    reply: oneshot::Sender<LedgerResult<BatchReceipt>>,
}

struct Shared {
    client: Arc<dyn LedgerClient>,
    config: QueueConfig,
    pending: Mutex<VecDeque<Envelope>>,
    /// Held from popping a batch until its outcome is delivered.
    submitting: AsyncMutex<()>,
    stopped: AtomicBool,
    wake: Notify,
    next_batch: AtomicU64,
}

/// Batches concurrent register-content requests into ledger transactions.
///
/// Any number of tasks may [`post`](Self::post); a single background task
/// started by [`listen`](Self::listen) is the only one that drains the queue
/// and talks to the ledger, so at most one transaction is in flight. Batches
/// are drained oldest-first and a batch whose commit times out is resubmitted
/// unchanged until it reaches a terminal outcome.
pub struct LedgerQueue {
    shared: Arc<Shared>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl LedgerQueue {
    /// Create an idle queue. Nothing is drained until [`Self::listen`].
    pub fn new(client: Arc<dyn LedgerClient>, config: QueueConfig) -> Self {
        Self {
            shared: Arc::new(Shared {
                client,
                config,
                pending: Mutex::new(VecDeque::new()),
                submitting: AsyncMutex::new(()),
                stopped: AtomicBool::new(false),
                wake: Notify::new(),
                next_batch: AtomicU64::new(0),
            }),
            worker: Mutex::new(None),
        }
    }

    /// Start the background drain task. Calling this twice is a no-op.
    pub fn listen(&self) {
        let mut worker = self.worker.lock().expect("lock poisoned");
        if worker.is_some() || self.is_stopped() {
            return;
        }
        let shared = Arc::clone(&self.shared);
        *worker = Some(tokio::spawn(drain_loop(shared)));
        info!(
            interval_ms = self.shared.config.interval_ms,
            batch_size = self.shared.config.batch_size,
            "ledger queue listening"
        );
    }

    /// Enqueue a message and wait for the outcome of the batch carrying it.
    ///
    /// Messages failing [`RegisterContent::validate_basic`] are rejected
    /// immediately without being queued.
    pub async fn post(&self, message: RegisterContent) -> LedgerResult<BatchReceipt> {
        message.validate_basic()?;

        let (reply, outcome) = oneshot::channel();
        {
            let mut pending = self.shared.pending.lock().expect("lock poisoned");
            // Checked under the lock so `stop` cannot miss this envelope.
            if self.shared.stopped.load(Ordering::SeqCst) {
                return Err(LedgerError::QueueStopped);
            }
            pending.push_back(Envelope { message, reply });
        }

        outcome.await.unwrap_or(Err(LedgerError::QueueStopped))
    }

    /// Stop draining and fail every message still waiting in the queue.
    ///
    /// A batch already being submitted is failed at its next retry point.
    pub fn stop(&self) {
        let abandoned: Vec<Envelope> = {
            let mut pending = self.shared.pending.lock().expect("lock poisoned");
            self.shared.stopped.store(true, Ordering::SeqCst);
            pending.drain(..).collect()
        };
        self.shared.wake.notify_one();

        if !abandoned.is_empty() {
            warn!(count = abandoned.len(), "ledger queue stopped with pending messages");
        }
        for envelope in abandoned {
            let _ = envelope.reply.send(Err(LedgerError::QueueStopped));
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.shared.stopped.load(Ordering::SeqCst)
    }

    /// Number of messages waiting to be drained.
    pub fn pending_len(&self) -> usize {
        self.shared.pending.lock().expect("lock poisoned").len()
    }

    /// Returns `true` when the backlog exceeds the configured threshold.
    pub fn too_busy(&self) -> bool {
        self.pending_len() > self.shared.config.busy_threshold
    }

    /// Drain one batch now, outside the background schedule.
    ///
    /// Waits for any batch the background task is submitting, so batches
    /// still go out one at a time and oldest-first. Returns the number of
    /// messages resolved.
    pub async fn drain_once(&self) -> usize {
        self.shared.drain_once().await
    }
}

impl Drop for LedgerQueue {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn drain_loop(shared: Arc<Shared>) {
    let mut ticker = tokio::time::interval(shared.config.interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = shared.wake.notified() => {}
        }
        if shared.stopped.load(Ordering::SeqCst) {
            break;
        }
        shared.drain_once().await;
    }
    debug!("ledger queue drain loop exited");
}

impl Shared {
    fn pop_batch(&self) -> Vec<Envelope> {
        let mut pending = self.pending.lock().expect("lock poisoned");
        let take = pending.len().min(self.config.batch_size.max(1));
        pending.drain(..take).collect()
    }

    async fn drain_once(&self) -> usize {
        let _submitting = self.submitting.lock().await;
        let envelopes = self.pop_batch();
        if envelopes.is_empty() {
            return 0;
        }

        let seq = self.next_batch.fetch_add(1, Ordering::SeqCst);
        let batch = TxBatch {
            messages: envelopes.iter().map(|e| e.message.clone()).collect(),
            gas_limit: self.config.gas_limit,
            fee: self.config.fee,
        };
        debug!(batch = seq, messages = batch.messages.len(), "submitting batch");

        let outcome = self.submit(seq, &batch).await;
        match &outcome {
            Ok(tx) => info!(batch = seq, tx_hash = %tx.tx_hash, height = tx.height, "batch committed"),
            Err(e) => warn!(batch = seq, error = %e, "batch failed"),
        }

        let count = envelopes.len();
        for (index, envelope) in envelopes.into_iter().enumerate() {
            let result = outcome.clone().map(|tx| BatchReceipt {
                tx,
                index,
                batch: seq,
            });
            // The caller may have given up waiting; nothing to deliver then.
            let _ = envelope.reply.send(result);
        }
        count
    }

    /// Submit until the batch commits or fails terminally.
    async fn submit(&self, seq: u64, batch: &TxBatch) -> LedgerResult<Arc<TxResponse>> {
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            match self.client.broadcast(batch).await {
                Ok(tx) if tx.is_success() => return Ok(Arc::new(tx)),
                Ok(tx) => {
                    return Err(LedgerError::Rejected {
                        code: tx.code,
                        log: tx.raw_log,
                    })
                }
                Err(e) if e.is_transient() => {
                    warn!(batch = seq, attempt, error = %e, "commit wait expired, resubmitting batch");
                    if self.stopped.load(Ordering::SeqCst) {
                        return Err(LedgerError::QueueStopped);
                    }
                    tokio::time::sleep(self.config.retry_delay()).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
