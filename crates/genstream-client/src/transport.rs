use std::pin::Pin;

use futures::StreamExt as _;
use reqwest::header::{ACCEPT, HeaderMap, HeaderName, HeaderValue};
use tracing::debug;

use crate::config::ClientConfig;
use crate::errors::StreamError;

/// Raw response body chunks, in arrival order.
pub type ByteStream =
    Pin<Box<dyn futures::Stream<Item = Result<bytes::Bytes, StreamError>> + Send + 'static>>;

/// Issues the streaming POST and hands back the response body.
///
/// Dropping the returned stream (or the pending `open` future) closes the
/// connection; sessions cancel a call that way.
#[async_trait::async_trait]
pub trait StreamTransport: Send + Sync {
    /// Sends `body` as JSON to `address`.
    ///
    /// A non-success status must fail with [`StreamError::Transport`] carrying
    /// the status, without reading the body.
    async fn open(
        &self,
        address: &str,
        body: &serde_json::Value,
    ) -> Result<ByteStream, StreamError>;
}

/// HTTP transport backed by `reqwest`.
#[derive(Clone, Debug)]
pub struct ReqwestTransport {
    client: reqwest::Client,
    config: ClientConfig,
}

impl ReqwestTransport {
    pub fn new(config: ClientConfig) -> Result<Self, StreamError> {
        let mut headers = HeaderMap::new();
        for (name, value) in &config.headers {
            let name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| {
                StreamError::Config(format!("invalid header name {name:?}: {e}"))
            })?;
            let value = HeaderValue::from_str(value).map_err(|e| {
                StreamError::Config(format!("invalid value for header {}: {e}", name.as_str()))
            })?;
            headers.insert(name, value);
        }
        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .user_agent(config.user_agent.clone())
            .default_headers(headers)
            .build()
            .map_err(|e| StreamError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client, config })
    }

    /// Builds a transport from [`ClientConfig::from_env`].
    pub fn from_env() -> Result<Self, StreamError> {
        Self::new(ClientConfig::from_env()?)
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }
}

#[async_trait::async_trait]
impl StreamTransport for ReqwestTransport {
    async fn open(
        &self,
        address: &str,
        body: &serde_json::Value,
    ) -> Result<ByteStream, StreamError> {
        let url = self.config.resolve_address(address)?;
        debug!(url = %url, "opening generation stream");

        let response = self
            .client
            .post(&url)
            .header(ACCEPT, "text/event-stream")
            .json(body)
            .send()
            .await
            .map_err(|e| {
                StreamError::transport(
                    e.status().map(|s| s.as_u16()),
                    format!("request to {url} failed: {e}"),
                )
            })?;
        let status = response.status();
        if !status.is_success() {
            return Err(StreamError::transport(
                Some(status.as_u16()),
                format!("request to {url} failed with status {status}"),
            ));
        }

        let stream = response.bytes_stream().map(|chunk| {
            chunk.map_err(|e| StreamError::transport(None, format!("stream read failed: {e}")))
        });
        Ok(Box::pin(stream))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn collect(mut stream: ByteStream) -> Vec<u8> {
        let mut out = Vec::new();
        while let Some(chunk) = stream.next().await {
            out.extend_from_slice(&chunk.expect("chunk"));
        }
        out
    }

    #[tokio::test]
    async fn posts_json_and_streams_body() {
        let server = MockServer::start().await;
        let wire = "data: {\"type\":\"chunk\",\"content\":\"hi\"}\n\ndata: {\"type\":\"done\"}\n\n";
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .and(header("content-type", "application/json"))
            .and(header("accept", "text/event-stream"))
            .and(body_json(serde_json::json!({"prompt": "chapter 1"})))
            .respond_with(ResponseTemplate::new(200).set_body_raw(wire, "text/event-stream"))
            .expect(1)
            .mount(&server)
            .await;

        let transport =
            ReqwestTransport::new(ClientConfig::new().base_url(format!("{}/api", server.uri())))
                .expect("transport");
        let stream = transport
            .open("/generate", &serde_json::json!({"prompt": "chapter 1"}))
            .await
            .expect("open");
        assert_eq!(collect(stream).await, wire.as_bytes());
    }

    #[tokio::test]
    async fn non_success_status_is_transport_error_with_code() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
            .mount(&server)
            .await;

        let transport = ReqwestTransport::new(ClientConfig::new()).expect("transport");
        let err = match transport
            .open(&format!("{}/generate", server.uri()), &serde_json::json!({}))
            .await
        {
            Ok(_) => panic!("503 should fail"),
            Err(err) => err,
        };
        assert_eq!(err.status(), Some(503));
        assert!(!err.message().contains("overloaded"));
    }

    #[tokio::test]
    async fn configured_headers_are_sent() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(header("authorization", "Bearer t0k"))
            .respond_with(ResponseTemplate::new(200).set_body_raw("", "text/event-stream"))
            .expect(1)
            .mount(&server)
            .await;

        let transport = ReqwestTransport::new(
            ClientConfig::new()
                .base_url(server.uri())
                .header("Authorization", "Bearer t0k"),
        )
        .expect("transport");
        let stream = transport
            .open("generate", &serde_json::json!({}))
            .await
            .expect("open");
        assert!(collect(stream).await.is_empty());
    }

    #[test]
    fn invalid_header_is_config_error() {
        let err = ReqwestTransport::new(ClientConfig::new().header("bad header", "x"))
            .expect_err("invalid header");
        assert!(matches!(err, StreamError::Config(_)));
    }

    #[tokio::test]
    async fn relative_address_without_base_url_fails_validation() {
        let transport = ReqwestTransport::new(ClientConfig::new()).expect("transport");
        let err = match transport.open("/generate", &serde_json::json!({})).await {
            Ok(_) => panic!("relative address should fail"),
            Err(err) => err,
        };
        assert!(matches!(err, StreamError::Validation(_)));
    }
}
