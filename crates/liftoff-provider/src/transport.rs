use async_trait::async_trait;
use bytes::Bytes;
use serde::Deserialize;

use liftoff_types::{ContentId, MerkleRoot};

use crate::error::UploadError;

/// Hosting classification sent with every upload: IPFS-hosted content.
pub const HOSTING_IPFS: u8 = 1;

/// Payload and metadata for one upload.
#[derive(Clone, Debug)]
pub struct UploadRequest {
    /// Account that registered the content.
    pub sender: String,
    pub merkle: MerkleRoot,
    /// Ledger height from which storage proofs are due.
    pub start: i64,
    pub hosting: u8,
    pub data: Bytes,
}

impl UploadRequest {
    pub fn new(sender: impl Into<String>, merkle: MerkleRoot, start: i64, data: Bytes) -> Self {
        Self {
            sender: sender.into(),
            merkle,
            start,
            hosting: HOSTING_IPFS,
            data,
        }
    }
}

/// Delivers bytes to a single storage endpoint.
#[async_trait]
pub trait ProviderTransport: Send + Sync {
    /// Upload to `endpoint` and return the identifier the provider assigned.
    async fn upload(&self, endpoint: &str, request: &UploadRequest) -> Result<ContentId, UploadError>;
}

#[derive(Deserialize)]
struct SuccessBody {
    #[serde(default)]
    cid: String,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: String,
}

const DECLINE_MARKER: &str = "cannot claim";

/// Turn a provider's HTTP status and body into an upload outcome.
///
/// This is the only place provider error text is inspected.
pub fn classify_response(status: u16, body: &str) -> Result<ContentId, UploadError> {
    if status != 200 {
        let message = serde_json::from_str::<ErrorBody>(body)
            .map(|b| b.error)
            .unwrap_or_else(|_| body.trim().to_string());
        if message.to_ascii_lowercase().contains(DECLINE_MARKER) {
            return Err(UploadError::Declined(message));
        }
        return Err(UploadError::Http { status, message });
    }

    let parsed: SuccessBody =
        serde_json::from_str(body).map_err(|e| UploadError::MalformedResponse(e.to_string()))?;
    let cid = parsed.cid.trim();
    if cid.is_empty() {
        return Err(UploadError::EmptyCid);
    }
    ContentId::parse(cid).map_err(|_| UploadError::UnrecognizedCid(cid.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const CID: &str = "bafybeihdxnfgloqg26ztcaawxijkbibgyt6uykhhdtyk4spuamub2tgnfm";

    #[test]
    fn success_returns_identifier() {
        let cid = classify_response(200, &format!("{{\"cid\":\"{CID}\"}}")).unwrap();
        assert_eq!(cid.to_string(), CID);
    }

    #[test]
    fn empty_identifier_is_a_failure() {
        assert_eq!(classify_response(200, "{\"cid\":\"\"}"), Err(UploadError::EmptyCid));
        assert_eq!(classify_response(200, "{}"), Err(UploadError::EmptyCid));
    }

    #[test]
    fn garbage_body_is_malformed() {
        assert!(matches!(
            classify_response(200, "<html>"),
            Err(UploadError::MalformedResponse(_))
        ));
    }

    #[test]
    fn unparseable_identifier_still_counts_as_stored() {
        let err = classify_response(200, "{\"cid\":\"QmNotReallyACid-but-non-empty\"}").unwrap_err();
        assert_eq!(err, UploadError::UnrecognizedCid("QmNotReallyACid-but-non-empty".into()));
        assert!(err.is_stored());
    }

    #[test]
    fn cannot_claim_is_declined() {
        let err = classify_response(400, "{\"error\":\"I cannot claim this file\"}").unwrap_err();
        assert!(err.is_declined());
    }

    #[test]
    fn other_statuses_keep_message() {
        assert_eq!(
            classify_response(500, "{\"error\":\"disk full\"}"),
            Err(UploadError::Http { status: 500, message: "disk full".into() })
        );
        assert_eq!(
            classify_response(502, "bad gateway\n"),
            Err(UploadError::Http { status: 502, message: "bad gateway".into() })
        );
    }
}
