//! HTTP client for a signing ledger gateway.
//!
//! The gateway holds the account key, signs and broadcasts transactions,
//! and waits for commit. It speaks plain JSON:
//!
//! | Route                     | Response                                  |
//! |---------------------------|-------------------------------------------|
//! | `GET  /account`           | `{"address": "..."}`                      |
//! | `GET  /status`            | `{"height": 123}`                         |
//! | `GET  /params`            | `{"chunk_size": 10240}`                   |
//! | `GET  /providers?limit=N` | `{"providers": [{"endpoint", "account"}]}` |
//! | `GET  /files/{merkle}`    | `{"files": [FileRecord]}`                 |
//! | `POST /txs`               | [`TxResponse`]                            |
//!
//! A commit that is not included in time is reported either as HTTP 504 or
//! as an error body `{"kind": "commit_timeout"}`. A broadcast that outlives
//! the client timeout is treated the same way.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use liftoff_types::{MerkleRoot, ProviderRecord};

use crate::error::{LedgerError, LedgerResult};
use crate::records::{FileRecord, StorageParams, TxBatch, TxResponse};
use crate::traits::LedgerClient;

/// Connection settings for [`GatewayLedgerClient`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub url: String,
    /// Per-request timeout. Broadcasts block until commit, so this must
    /// exceed the gateway's own commit wait.
    pub timeout_secs: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1:8090".into(),
            timeout_secs: 60,
        }
    }
}

#[derive(Deserialize)]
struct AccountBody {
    address: String,
}

#[derive(Deserialize)]
struct StatusBody {
    height: i64,
}

#[derive(Deserialize)]
struct ProvidersBody {
    #[serde(default)]
    providers: Vec<ProviderRecord>,
}

#[derive(Deserialize)]
struct FilesBody {
    #[serde(default)]
    files: Vec<FileRecord>,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    kind: String,
    #[serde(default)]
    error: String,
}

/// [`LedgerClient`] backed by a signing gateway.
pub struct GatewayLedgerClient {
    base: String,
    address: String,
    client: Client,
}

impl GatewayLedgerClient {
    /// Connect to the gateway and resolve the account it signs for.
    pub async fn connect(config: &GatewayConfig) -> LedgerResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| LedgerError::Rpc(e.to_string()))?;
        let base = config.url.trim_end_matches('/').to_string();

        let mut gateway = Self {
            base,
            address: String::new(),
            client,
        };
        let account: AccountBody = gateway.get("account").await?;
        if account.address.trim().is_empty() {
            return Err(LedgerError::Rpc("gateway reported an empty account".into()));
        }
        debug!(address = %account.address, url = %gateway.base, "connected to ledger gateway");
        gateway.address = account.address;
        Ok(gateway)
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base, path)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> LedgerResult<T> {
        let response = self
            .client
            .get(self.url(path))
            .send()
            .await
            .map_err(|e| LedgerError::Rpc(e.to_string()))?;
        self.handle_response(response).await
    }

    async fn handle_response<T: DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> LedgerResult<T> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| LedgerError::Rpc(e.to_string()))?;

        if !status.is_success() {
            return Err(classify_failure(status, &body));
        }
        if body.trim().is_empty() {
            return Err(LedgerError::EmptyResponse);
        }
        serde_json::from_str(&body).map_err(|e| LedgerError::Serialization(e.to_string()))
    }
}

fn classify_failure(status: StatusCode, body: &str) -> LedgerError {
    let parsed: Option<ErrorBody> = serde_json::from_str(body).ok();
    if status == StatusCode::GATEWAY_TIMEOUT
        || parsed.as_ref().is_some_and(|b| b.kind == "commit_timeout")
    {
        return LedgerError::CommitTimeout;
    }
    let message = match parsed {
        Some(b) if !b.error.is_empty() => b.error,
        _ => body.trim().to_string(),
    };
    LedgerError::Rpc(format!("{}: {}", status.as_u16(), message))
}

/// The gateway was still waiting for commit when the client gave up.
fn broadcast_failure(e: reqwest::Error) -> LedgerError {
    if e.is_timeout() {
        LedgerError::CommitTimeout
    } else {
        LedgerError::Rpc(e.to_string())
    }
}

impl std::fmt::Debug for GatewayLedgerClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayLedgerClient")
            .field("base", &self.base)
            .field("address", &self.address)
            .finish()
    }
}

#[async_trait]
impl LedgerClient for GatewayLedgerClient {
    fn submitter(&self) -> &str {
        &self.address
    }

    async fn latest_height(&self) -> LedgerResult<i64> {
        let status: StatusBody = self.get("status").await?;
        Ok(status.height)
    }

    async fn storage_params(&self) -> LedgerResult<StorageParams> {
        self.get("params").await
    }

    async fn broadcast(&self, batch: &TxBatch) -> LedgerResult<TxResponse> {
        let response = self
            .client
            .post(self.url("txs"))
            .json(batch)
            .send()
            .await
            .map_err(broadcast_failure)?;
        self.handle_response(response).await
    }

    async fn active_providers(&self, limit: usize) -> LedgerResult<Vec<ProviderRecord>> {
        let body: ProvidersBody = self.get(&format!("providers?limit={limit}")).await?;
        Ok(body.providers)
    }

    async fn files_by_merkle(&self, merkle: &MerkleRoot) -> LedgerResult<Vec<FileRecord>> {
        let response = self
            .client
            .get(self.url(&format!("files/{}", merkle.to_hex())))
            .send()
            .await
            .map_err(|e| LedgerError::Rpc(e.to_string()))?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(Vec::new());
        }
        let body: FilesBody = self.handle_response(response).await?;
        Ok(body.files)
    }
}
