use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use liftoff_crypto::{cid_for, RAW_CODEC};
use liftoff_types::{ContentId, MerkleRoot};

use crate::error::UploadError;
use crate::transport::{ProviderTransport, UploadRequest};

/// Scripted behaviour for one endpoint.
#[derive(Clone, Debug)]
pub enum Scripted {
    /// Always fail with this error.
    Fail(UploadError),
    /// Fail this many times, then succeed.
    FailTimes(usize, UploadError),
    /// Succeed with a fixed identifier.
    Respond(ContentId),
}

/// In-memory provider transport for tests, local demos, and embedding.
///
/// Endpoints without a script accept every upload and answer with the raw
/// CID of the uploaded bytes. Every attempt is recorded, and the peak
/// number of concurrent uploads is tracked.
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    delay: Duration,
    state: Mutex<TransportState>,
}

#[derive(Debug, Default)]
struct TransportState {
    scripts: HashMap<String, Scripted>,
    rejected: HashMap<MerkleRoot, UploadError>,
    attempts: Vec<String>,
    in_flight: usize,
    peak_in_flight: usize,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hold every upload for `delay` before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn script(&self, endpoint: &str, behaviour: Scripted) {
        self.state
            .lock()
            .expect("lock poisoned")
            .scripts
            .insert(endpoint.to_string(), behaviour);
    }

    /// Make every endpoint fail uploads of `merkle`.
    pub fn reject_merkle(&self, merkle: &MerkleRoot, error: UploadError) {
        self.state
            .lock()
            .expect("lock poisoned")
            .rejected
            .insert(merkle.clone(), error);
    }

    /// Endpoints attempted, in attempt order.
    pub fn attempts(&self) -> Vec<String> {
        self.state.lock().expect("lock poisoned").attempts.clone()
    }

    pub fn attempts_for(&self, endpoint: &str) -> usize {
        self.state
            .lock()
            .expect("lock poisoned")
            .attempts
            .iter()
            .filter(|e| *e == endpoint)
            .count()
    }

    /// Highest number of uploads that were in progress at the same time.
    pub fn peak_in_flight(&self) -> usize {
        self.state.lock().expect("lock poisoned").peak_in_flight
    }

    fn outcome(&self, endpoint: &str, request: &UploadRequest) -> Result<ContentId, UploadError> {
        let mut state = self.state.lock().expect("lock poisoned");
        if let Some(err) = state.rejected.get(&request.merkle) {
            return Err(err.clone());
        }
        match state.scripts.get_mut(endpoint) {
            Some(Scripted::Fail(err)) => Err(err.clone()),
            Some(Scripted::FailTimes(remaining, err)) if *remaining > 0 => {
                *remaining -= 1;
                Err(err.clone())
            }
            Some(Scripted::Respond(cid)) => Ok(cid.clone()),
            _ => Ok(cid_for(RAW_CODEC, &request.data)),
        }
    }
}

#[async_trait]
impl ProviderTransport for ScriptedTransport {
    async fn upload(&self, endpoint: &str, request: &UploadRequest) -> Result<ContentId, UploadError> {
        {
            let mut state = self.state.lock().expect("lock poisoned");
            state.attempts.push(endpoint.to_string());
            state.in_flight += 1;
            state.peak_in_flight = state.peak_in_flight.max(state.in_flight);
        }
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let outcome = self.outcome(endpoint, request);
        self.state.lock().expect("lock poisoned").in_flight -= 1;
        outcome
    }
}
