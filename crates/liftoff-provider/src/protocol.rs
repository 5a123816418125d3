use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::Bytes;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use liftoff_ledger::LedgerClient;
use liftoff_types::{ContentId, MerkleRoot, ProviderRecord};

use crate::error::{ProviderError, ProviderResult};
use crate::registry::ProviderRegistry;
use crate::transport::{ProviderTransport, UploadRequest};

/// Tuning for [`UploadProtocol`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    /// Successful uploads after which a pass stops early.
    pub quorum: usize,
    /// Full passes over the candidate list before giving up on a file.
    pub max_passes: u32,
    /// Sleep between passes that stored nothing.
    pub pass_backoff_ms: u64,
    pub request_timeout_secs: u64,
    /// Path appended to each provider endpoint.
    pub route: String,
    /// Maximum number of providers requested from the ledger.
    pub provider_limit: usize,
    pub provider_ttl_secs: u64,
    /// Fixed shuffle seed; random when unset.
    pub seed: Option<u64>,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            quorum: 3,
            max_passes: 5,
            pass_backoff_ms: 10_000,
            request_timeout_secs: 120,
            route: "upload".into(),
            provider_limit: 200,
            provider_ttl_secs: 300,
            seed: None,
        }
    }
}

impl UploadConfig {
    pub fn pass_backoff(&self) -> Duration {
        Duration::from_millis(self.pass_backoff_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// One file's worth of upload work.
#[derive(Clone, Debug)]
pub struct UploadJob {
    pub data: Bytes,
    pub merkle: MerkleRoot,
    /// Start block assigned by the ledger at registration.
    pub start: i64,
    pub sender: String,
    /// Identifier computed locally, recorded for providers that store the
    /// bytes but answer with an identifier that does not parse.
    pub local_cid: ContentId,
}

/// Stores redundant copies of registered content on randomly chosen
/// providers.
///
/// Each pass shuffles the non-blacklisted providers and tries them in turn
/// until `quorum` have accepted the bytes. A provider that declines is
/// skipped; any other failure blacklists it for the rest of the run. A pass
/// with no success is retried after a backoff, up to `max_passes`.
///
/// Deduplication against existing registrations is [`Self::lookup_existing`];
/// callers run it before registering.
pub struct UploadProtocol {
    ledger: Arc<dyn LedgerClient>,
    transport: Arc<dyn ProviderTransport>,
    registry: ProviderRegistry,
    config: UploadConfig,
    rng: Mutex<StdRng>,
}

impl UploadProtocol {
    pub fn new(
        ledger: Arc<dyn LedgerClient>,
        transport: Arc<dyn ProviderTransport>,
        config: UploadConfig,
    ) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let registry = ProviderRegistry::new(
            Arc::clone(&ledger),
            config.provider_limit,
            Duration::from_secs(config.provider_ttl_secs),
        );
        Self {
            ledger,
            transport,
            registry,
            config,
            rng: Mutex::new(rng),
        }
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    pub fn config(&self) -> &UploadConfig {
        &self.config
    }

    /// Identifier of an existing, proven registration of `merkle`, if any.
    pub async fn lookup_existing(&self, merkle: &MerkleRoot) -> ProviderResult<Option<ContentId>> {
        let records = self.ledger.files_by_merkle(merkle).await?;
        Ok(records
            .into_iter()
            .filter(|r| r.is_proven())
            .find_map(|r| r.cid))
    }

    fn shuffled(&self, mut candidates: Vec<ProviderRecord>) -> Vec<ProviderRecord> {
        let mut rng = self.rng.lock().expect("lock poisoned");
        candidates.shuffle(&mut *rng);
        candidates
    }

    /// Upload `job` until at least one provider stores it.
    ///
    /// Returns every identifier obtained during the first pass that
    /// succeeded.
    pub async fn upload(&self, job: &UploadJob) -> ProviderResult<Vec<ContentId>> {
        let request = UploadRequest::new(job.sender.clone(), job.merkle.clone(), job.start, job.data.clone());
        let merkle = job.merkle.short_hex();
        let max_passes = self.config.max_passes.max(1);
        let mut attempts = 0usize;

        for pass in 1..=max_passes {
            let candidates = self.shuffled(self.registry.available().await?);
            let target = self.config.quorum.max(1).min(candidates.len().max(1));
            let mut cids = Vec::new();

            for provider in candidates {
                if cids.len() >= target {
                    break;
                }
                // Another task may have excluded it since this pass started.
                if self.registry.is_blacklisted(&provider.endpoint) {
                    continue;
                }
                attempts += 1;
                match self.transport.upload(&provider.endpoint, &request).await {
                    Ok(cid) => {
                        debug!(endpoint = %provider.endpoint, %cid, %merkle, "upload stored");
                        cids.push(cid);
                    }
                    Err(e) if e.is_stored() => {
                        warn!(endpoint = %provider.endpoint, %merkle, error = %e, "recording local identifier");
                        cids.push(job.local_cid.clone());
                    }
                    Err(e) if e.is_declined() => {
                        debug!(endpoint = %provider.endpoint, %merkle, "provider declined, skipping");
                    }
                    Err(e) => {
                        warn!(endpoint = %provider.endpoint, %merkle, error = %e, "upload failed, blacklisting provider");
                        self.registry.blacklist(&provider.endpoint);
                    }
                }
            }

            if !cids.is_empty() {
                info!(%merkle, copies = cids.len(), pass, "upload complete");
                return Ok(cids);
            }
            if pass < max_passes {
                warn!(%merkle, pass, max_passes, "no provider stored the file, retrying");
                tokio::time::sleep(self.config.pass_backoff()).await;
            }
        }

        Err(ProviderError::QuorumNotReached {
            merkle,
            passes: max_passes,
            attempts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::UploadError;
    use crate::memory::{Scripted, ScriptedTransport};
    use liftoff_ledger::InMemoryLedger;

    fn endpoint(i: usize) -> String {
        format!("https://p{i}.example")
    }

    fn ledger(n: usize) -> Arc<InMemoryLedger> {
        Arc::new(InMemoryLedger::new("jkl1me").with_providers(
            (0..n).map(|i| ProviderRecord::new(endpoint(i), format!("jkl1p{i}"))).collect(),
        ))
    }

    fn config() -> UploadConfig {
        UploadConfig {
            pass_backoff_ms: 1,
            seed: Some(7),
            ..Default::default()
        }
    }

    fn job(seed: u8) -> UploadJob {
        UploadJob {
            data: Bytes::from(vec![seed; 16]),
            merkle: MerkleRoot::new(vec![seed; 32]).unwrap(),
            start: 10,
            sender: "jkl1me".into(),
            local_cid: liftoff_crypto::cid_for(liftoff_crypto::RAW_CODEC, &[seed; 16]),
        }
    }

    #[tokio::test]
    async fn reaches_quorum_and_stops() {
        let transport = Arc::new(ScriptedTransport::new());
        let protocol = UploadProtocol::new(ledger(6), transport.clone(), config());
        let cids = protocol.upload(&job(1)).await.unwrap();
        assert_eq!(cids.len(), 3);
        assert_eq!(transport.attempts().len(), 3);
    }

    #[tokio::test]
    async fn fewer_providers_than_quorum() {
        let transport = Arc::new(ScriptedTransport::new());
        let protocol = UploadProtocol::new(ledger(2), transport.clone(), config());
        assert_eq!(protocol.upload(&job(1)).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn failing_endpoint_is_blacklisted_for_later_files() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.script(&endpoint(0), Scripted::Fail(UploadError::Http {
            status: 500,
            message: "boom".into(),
        }));
        let protocol = UploadProtocol::new(ledger(5), transport.clone(), UploadConfig {
            quorum: 5,
            ..config()
        });

        let first = protocol.upload(&job(1)).await.unwrap();
        assert_eq!(first.len(), 4);
        assert!(protocol.registry().is_blacklisted(&endpoint(0)));

        let before = transport.attempts_for(&endpoint(0));
        assert_eq!(before, 1);
        protocol.upload(&job(2)).await.unwrap();
        assert_eq!(transport.attempts_for(&endpoint(0)), before);
    }

    #[tokio::test]
    async fn declined_endpoint_is_not_blacklisted() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.script(&endpoint(1), Scripted::Fail(UploadError::Declined("I cannot claim".into())));
        let protocol = UploadProtocol::new(ledger(3), transport.clone(), config());

        assert_eq!(protocol.upload(&job(1)).await.unwrap().len(), 2);
        assert!(!protocol.registry().is_blacklisted(&endpoint(1)));
        protocol.upload(&job(2)).await.unwrap();
        assert_eq!(transport.attempts_for(&endpoint(1)), 2);
    }

    #[tokio::test]
    async fn retries_passes_then_reports_failure() {
        let transport = Arc::new(ScriptedTransport::new());
        for i in 0..2 {
            transport.script(&endpoint(i), Scripted::Fail(UploadError::Declined("cannot claim".into())));
        }
        let protocol = UploadProtocol::new(ledger(2), transport.clone(), UploadConfig {
            max_passes: 3,
            ..config()
        });

        let err = protocol.upload(&job(1)).await.unwrap_err();
        assert_eq!(
            err,
            ProviderError::QuorumNotReached {
                merkle: job(1).merkle.short_hex(),
                passes: 3,
                attempts: 6,
            }
        );
    }

    #[tokio::test]
    async fn later_pass_can_succeed() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.script(&endpoint(0), Scripted::FailTimes(
            1,
            UploadError::Declined("cannot claim yet".into()),
        ));
        let protocol = UploadProtocol::new(ledger(1), transport.clone(), config());
        assert_eq!(protocol.upload(&job(1)).await.unwrap().len(), 1);
        assert_eq!(transport.attempts().len(), 2);
    }

    #[tokio::test]
    async fn no_providers_is_quorum_failure() {
        let transport = Arc::new(ScriptedTransport::new());
        let protocol = UploadProtocol::new(ledger(0), transport.clone(), UploadConfig {
            max_passes: 2,
            ..config()
        });
        assert!(matches!(
            protocol.upload(&job(1)).await,
            Err(ProviderError::QuorumNotReached { attempts: 0, .. })
        ));
    }

    #[tokio::test]
    async fn lookup_finds_only_proven_registrations() {
        let ledger = ledger(3);
        let known = ContentId::parse("bafybeieudrr6744fdpybgrxadl2elqcncvfakzqyipake5milgleihldre").unwrap();
        ledger.record_proof(&job(4).merkle, "jkl1p0", known.clone());
        let protocol = UploadProtocol::new(ledger, Arc::new(ScriptedTransport::new()), config());

        assert_eq!(protocol.lookup_existing(&job(4).merkle).await.unwrap(), Some(known));
        assert_eq!(protocol.lookup_existing(&job(5).merkle).await.unwrap(), None);
    }

    #[tokio::test]
    async fn unrecognized_identifier_counts_without_blacklisting() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.script(
            &endpoint(0),
            Scripted::Fail(UploadError::UnrecognizedCid("QmNotReallyACid".into())),
        );
        let protocol = UploadProtocol::new(ledger(1), transport.clone(), config());

        let cids = protocol.upload(&job(3)).await.unwrap();
        assert_eq!(cids, vec![job(3).local_cid]);
        assert!(!protocol.registry().is_blacklisted(&endpoint(0)));
    }

    #[tokio::test]
    async fn same_seed_same_order() {
        let a = Arc::new(ScriptedTransport::new());
        let b = Arc::new(ScriptedTransport::new());
        UploadProtocol::new(ledger(8), a.clone(), config()).upload(&job(1)).await.unwrap();
        UploadProtocol::new(ledger(8), b.clone(), config()).upload(&job(1)).await.unwrap();
        assert_eq!(a.attempts(), b.attempts());
    }
}
