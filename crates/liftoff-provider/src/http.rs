use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use tracing::debug;

use liftoff_types::ContentId;

use crate::error::{ProviderError, ProviderResult, UploadError};
use crate::transport::{classify_response, ProviderTransport, UploadRequest};

/// Multipart HTTP upload to `{endpoint}/{route}`.
///
/// Form fields: `sender`, `merkle` (hex), `start`, `type`, and a `file` part
/// named after the hex Merkle root.
#[derive(Clone, Debug)]
pub struct HttpTransport {
    client: Client,
    route: String,
}

impl HttpTransport {
    pub fn new(timeout: Duration, route: impl Into<String>) -> ProviderResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProviderError::Setup(e.to_string()))?;
        Ok(Self {
            client,
            route: route.into().trim_matches('/').to_string(),
        })
    }

    fn upload_url(&self, endpoint: &str) -> String {
        format!("{}/{}", endpoint.trim_end_matches('/'), self.route)
    }

    fn form(request: &UploadRequest) -> Form {
        let merkle = request.merkle.to_hex();
        let file = Part::bytes(request.data.to_vec()).file_name(merkle.clone());
        Form::new()
            .text("sender", request.sender.clone())
            .text("merkle", merkle)
            .text("start", request.start.to_string())
            .text("type", request.hosting.to_string())
            .part("file", file)
    }
}

#[async_trait]
impl ProviderTransport for HttpTransport {
    async fn upload(&self, endpoint: &str, request: &UploadRequest) -> Result<ContentId, UploadError> {
        let url = self.upload_url(endpoint);
        debug!(%url, bytes = request.data.len(), merkle = %request.merkle.short_hex(), "uploading");

        let response = self
            .client
            .post(&url)
            .multipart(Self::form(request))
            .send()
            .await
            .map_err(|e| UploadError::Transport(e.to_string()))?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| UploadError::Transport(e.to_string()))?;

        classify_response(status, &body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use liftoff_types::MerkleRoot;
    use serde_json::json;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const CID: &str = "bafybeia6dhanrmza6pidqt6abieejmytcvf6wtlhqshwb5hv2zvvfrdefy";

    fn request() -> UploadRequest {
        UploadRequest::new(
            "jkl1me",
            MerkleRoot::new(vec![0xab; 32]).unwrap(),
            77,
            Bytes::from_static(b"hello provider"),
        )
    }

    fn transport() -> HttpTransport {
        HttpTransport::new(Duration::from_secs(5), "upload").unwrap()
    }

    #[tokio::test]
    async fn posts_multipart_form_and_returns_cid() {
        let server = MockServer::start().await;
        let hex = "ab".repeat(32);
        Mock::given(method("POST"))
            .and(path("/upload"))
            .and(body_string_contains("name=\"sender\""))
            .and(body_string_contains("jkl1me"))
            .and(body_string_contains(hex.as_str()))
            .and(body_string_contains(format!("filename=\"{hex}\"")))
            .and(body_string_contains("hello provider"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "cid": CID })))
            .expect(1)
            .mount(&server)
            .await;

        let cid = transport().upload(&server.uri(), &request()).await.unwrap();
        assert_eq!(cid.to_string(), CID);
    }

    #[tokio::test]
    async fn trailing_slash_endpoint() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/upload"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "cid": CID })))
            .mount(&server)
            .await;

        let endpoint = format!("{}/", server.uri());
        assert!(transport().upload(&endpoint, &request()).await.is_ok());
    }

    #[tokio::test]
    async fn server_error_is_http_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/upload"))
            .respond_with(ResponseTemplate::new(500).set_body_json(json!({ "error": "disk full" })))
            .mount(&server)
            .await;

        let err = transport().upload(&server.uri(), &request()).await.unwrap_err();
        assert_eq!(err, UploadError::Http { status: 500, message: "disk full".into() });
    }

    #[tokio::test]
    async fn cannot_claim_is_declined() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/upload"))
            .respond_with(
                ResponseTemplate::new(400).set_body_json(json!({ "error": "I cannot claim this file" })),
            )
            .mount(&server)
            .await;

        let err = transport().upload(&server.uri(), &request()).await.unwrap_err();
        assert!(err.is_declined());
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_transport_failure() {
        let err = transport()
            .upload("http://127.0.0.1:9", &request())
            .await
            .unwrap_err();
        assert!(matches!(err, UploadError::Transport(_)));
    }
}
