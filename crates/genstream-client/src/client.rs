use std::sync::Arc;

use serde::Serialize;

use crate::config::{ClientConfig, SessionOptions};
use crate::errors::StreamError;
use crate::handlers::Handlers;
use crate::message::StreamOutcome;
use crate::session::StreamingSession;
use crate::transport::{ReqwestTransport, StreamTransport};

/// Entry point for starting streaming calls.
///
/// Cheap to clone; every call gets its own [`StreamingSession`].
#[derive(Clone)]
pub struct StreamClient {
    transport: Arc<dyn StreamTransport>,
    options: SessionOptions,
}

impl StreamClient {
    pub fn builder() -> StreamClientBuilder {
        StreamClientBuilder::default()
    }

    /// Creates a fresh session. Grab its [`abort_handle`](StreamingSession::abort_handle)
    /// before calling `run` if the call may need cancelling.
    pub fn session(&self) -> StreamingSession {
        StreamingSession::new(self.transport.clone(), self.options.clone())
    }

    /// Runs one call to completion on a new session.
    pub async fn stream<B>(
        &self,
        address: &str,
        body: &B,
        handlers: Handlers,
    ) -> Result<StreamOutcome, StreamError>
    where
        B: Serialize + ?Sized,
    {
        self.session().run(address, body, handlers).await
    }

    pub fn options(&self) -> &SessionOptions {
        &self.options
    }
}

/// Builder for [`StreamClient`].
#[derive(Default)]
pub struct StreamClientBuilder {
    config: Option<ClientConfig>,
    options: SessionOptions,
    transport: Option<Arc<dyn StreamTransport>>,
}

impl StreamClientBuilder {
    /// Sets the HTTP config used when no custom transport is supplied.
    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn options(mut self, options: SessionOptions) -> Self {
        self.options = options;
        self
    }

    /// Replaces the default `reqwest` transport.
    pub fn transport(mut self, transport: Arc<dyn StreamTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn build(self) -> Result<StreamClient, StreamError> {
        self.options.validate()?;
        if self.transport.is_some() && self.config.is_some() {
            return Err(StreamError::Config(
                "config applies to the built-in transport; drop it when supplying a transport"
                    .into(),
            ));
        }
        let transport = match self.transport {
            Some(transport) => transport,
            None => Arc::new(ReqwestTransport::new(self.config.unwrap_or_default())?),
        };
        Ok(StreamClient {
            transport,
            options: self.options,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AbortBehavior;
    use crate::transport::ByteStream;
    use futures::stream;
    use std::sync::Mutex;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    struct EchoTransport {
        seen: Mutex<Vec<(String, serde_json::Value)>>,
    }

    #[async_trait::async_trait]
    impl StreamTransport for EchoTransport {
        async fn open(
            &self,
            address: &str,
            body: &serde_json::Value,
        ) -> Result<ByteStream, StreamError> {
            self.seen
                .lock()
                .expect("seen")
                .push((address.to_string(), body.clone()));
            let wire = format!(
                "data: {}\n\ndata: {{\"type\":\"done\"}}\n\n",
                serde_json::json!({"type": "result", "data": body})
            );
            Ok(Box::pin(stream::iter(vec![Ok(bytes::Bytes::from(wire))])))
        }
    }

    #[derive(Serialize)]
    struct ChapterRequest<'a> {
        novel_id: u32,
        outline: &'a str,
    }

    #[tokio::test]
    async fn stream_serializes_body_and_returns_result() {
        let transport = Arc::new(EchoTransport {
            seen: Mutex::new(Vec::new()),
        });
        let client = StreamClient::builder()
            .transport(transport.clone())
            .build()
            .expect("client");
        let outcome = client
            .stream(
                "/chapters/generate",
                &ChapterRequest {
                    novel_id: 7,
                    outline: "arrival",
                },
                Handlers::new(),
            )
            .await
            .expect("resolved");
        let expected = serde_json::json!({"novel_id": 7, "outline": "arrival"});
        assert_eq!(outcome.data(), Some(&expected));
        assert_eq!(
            *transport.seen.lock().expect("seen"),
            vec![("/chapters/generate".to_string(), expected)]
        );
    }

    #[test]
    fn build_rejects_config_with_custom_transport() {
        let result = StreamClient::builder()
            .config(ClientConfig::new())
            .transport(Arc::new(EchoTransport {
                seen: Mutex::new(Vec::new()),
            }))
            .build();
        assert!(matches!(result, Err(StreamError::Config(_))));
    }

    #[test]
    fn build_rejects_empty_default_event() {
        let result = StreamClient::builder()
            .options(SessionOptions::default().default_event(""))
            .build();
        assert!(matches!(result, Err(StreamError::Config(msg)) if msg.contains("default_event")));
    }

    #[tokio::test]
    async fn end_to_end_over_http() {
        let server = MockServer::start().await;
        let wire = concat!(
            "data: {\"type\":\"progress\",\"progress\":50,\"message\":\"writing\",\"word_count\":120}\n\n",
            ": keep-alive\n\n",
            "data: {\"type\":\"chunk\",\"content\":\"The \"}\n\n",
            "data: {\"type\":\"chunk\",\"content\":\"end.\"}\n\n",
            "data: {\"type\":\"done\"}\n\n",
        );
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(wire, "text/event-stream"))
            .mount(&server)
            .await;

        let client = StreamClient::builder()
            .config(ClientConfig::new().base_url(format!("{}/api", server.uri())))
            .options(SessionOptions::default().abort_behavior(AbortBehavior::RejectCancelled))
            .build()
            .expect("client");

        let words = Arc::new(Mutex::new(None));
        let words_seen = words.clone();
        let outcome = client
            .stream(
                "generate",
                &serde_json::json!({"prompt": "finish it"}),
                Handlers::new().on_progress(move |_, _, _, count| {
                    *words_seen.lock().expect("words") = count;
                }),
            )
            .await
            .expect("resolved");
        assert_eq!(outcome.text(), Some("The end."));
        assert_eq!(*words.lock().expect("words"), Some(120));
    }

    #[tokio::test]
    async fn http_error_status_rejects_via_connection_error_handler() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let client = StreamClient::builder()
            .config(ClientConfig::new().base_url(server.uri()))
            .build()
            .expect("client");
        let statuses = Arc::new(Mutex::new(Vec::new()));
        let seen = statuses.clone();
        let err = client
            .stream(
                "generate",
                &serde_json::json!({}),
                Handlers::new().on_connection_error(move |err| {
                    seen.lock().expect("statuses").push(err.status())
                }),
            )
            .await
            .expect_err("rejected");
        assert_eq!(err.status(), Some(401));
        assert_eq!(*statuses.lock().expect("statuses"), vec![Some(401)]);
    }
}
