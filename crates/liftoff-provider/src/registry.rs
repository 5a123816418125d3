use std::collections::HashSet;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use liftoff_ledger::LedgerClient;
use liftoff_types::ProviderRecord;

use crate::error::ProviderResult;

/// Per-run view of the active provider set.
///
/// The provider list is cached and reloaded from the ledger once it is older
/// than the configured TTL (or empty). Blacklisted endpoints are tracked
/// separately so a reload never clears them.
pub struct ProviderRegistry {
    ledger: Arc<dyn LedgerClient>,
    limit: usize,
    ttl: Duration,
    cache: RwLock<Cache>,
    blacklist: RwLock<HashSet<String>>,
}

#[derive(Default)]
struct Cache {
    providers: Vec<ProviderRecord>,
    fetched_at: Option<Instant>,
}

impl ProviderRegistry {
    pub fn new(ledger: Arc<dyn LedgerClient>, limit: usize, ttl: Duration) -> Self {
        Self {
            ledger,
            limit,
            ttl,
            cache: RwLock::new(Cache::default()),
            blacklist: RwLock::new(HashSet::new()),
        }
    }

    fn is_stale(&self) -> bool {
        let cache = self.cache.read().expect("lock poisoned");
        match cache.fetched_at {
            Some(at) => cache.providers.is_empty() || at.elapsed() >= self.ttl,
            None => true,
        }
    }

    /// Reload the provider list from the ledger.
    ///
    /// A failed reload keeps serving a previously loaded list.
    pub async fn refresh(&self) -> ProviderResult<usize> {
        match self.ledger.active_providers(self.limit).await {
            Ok(providers) => {
                let count = providers.len();
                let mut cache = self.cache.write().expect("lock poisoned");
                cache.providers = providers;
                cache.fetched_at = Some(Instant::now());
                debug!(count, "provider list refreshed");
                Ok(count)
            }
            Err(e) => {
                let cached = self.cache.read().expect("lock poisoned").providers.len();
                if cached == 0 {
                    return Err(e.into());
                }
                warn!(error = %e, cached, "provider refresh failed, using cached list");
                Ok(cached)
            }
        }
    }

    /// Providers that are not blacklisted, with their blacklist flag set
    /// from the current run's state.
    pub async fn available(&self) -> ProviderResult<Vec<ProviderRecord>> {
        if self.is_stale() {
            self.refresh().await?;
        }
        let blacklist = self.blacklist.read().expect("lock poisoned");
        let cache = self.cache.read().expect("lock poisoned");
        Ok(cache
            .providers
            .iter()
            .filter(|p| !blacklist.contains(&p.endpoint))
            .cloned()
            .collect())
    }

    /// Exclude `endpoint` for the rest of the run. Returns `true` if it was
    /// not already excluded.
    pub fn blacklist(&self, endpoint: &str) -> bool {
        let added = self
            .blacklist
            .write()
            .expect("lock poisoned")
            .insert(endpoint.to_string());
        if added {
            let mut cache = self.cache.write().expect("lock poisoned");
            for provider in cache.providers.iter_mut().filter(|p| p.endpoint == endpoint) {
                provider.blacklisted = true;
            }
        }
        added
    }

    pub fn is_blacklisted(&self, endpoint: &str) -> bool {
        self.blacklist.read().expect("lock poisoned").contains(endpoint)
    }

    /// Endpoints excluded so far, sorted.
    pub fn blacklisted(&self) -> Vec<String> {
        let mut endpoints: Vec<String> = self
            .blacklist
            .read()
            .expect("lock poisoned")
            .iter()
            .cloned()
            .collect();
        endpoints.sort();
        endpoints
    }

    /// Every cached provider, blacklisted ones included.
    pub fn snapshot(&self) -> Vec<ProviderRecord> {
        let blacklist = self.blacklist.read().expect("lock poisoned");
        self.cache
            .read()
            .expect("lock poisoned")
            .providers
            .iter()
            .map(|p| ProviderRecord {
                blacklisted: blacklist.contains(&p.endpoint),
                ..p.clone()
            })
            .collect()
    }
}
