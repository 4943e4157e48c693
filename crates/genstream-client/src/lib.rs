//! Client for generation backends that stream Server-Sent Events over a
//! single HTTP POST.
//!
//! A call sends one JSON body, reads the `text/event-stream` response frame
//! by frame, routes each decoded message to caller-supplied [`Handlers`], and
//! settles exactly once: with the `result` payload, the accumulated `chunk`
//! text, or a bare success marker; or with a [`StreamError`].
//!
//! ```no_run
//! use genstream_client::prelude::*;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), StreamError> {
//! let client = StreamClient::builder()
//!     .config(ClientConfig::from_env()?.base_url("http://localhost:8000/api"))
//!     .build()?;
//!
//! let handlers = Handlers::new()
//!     .on_progress(|msg, pct, _, _| eprintln!("[{pct:>3}%] {msg}"))
//!     .on_chunk(|fragment| print!("{fragment}"));
//!
//! let outcome = client
//!     .stream("/chapters/generate", &serde_json::json!({"chapter": 3}), handlers)
//!     .await?;
//! println!("\n{outcome:?}");
//! # Ok(())
//! # }
//! ```

/// Client entry point and builder.
pub mod client;
/// Transport and session configuration.
pub mod config;
/// Frame decoding into messages and named events.
pub mod decoder;
mod dispatch;
/// Error types.
pub mod errors;
/// SSE framing over raw byte chunks.
pub mod framer;
/// Caller-supplied callbacks.
pub mod handlers;
/// Wire message model and call outcomes.
pub mod message;
/// Logging setup for applications.
pub mod observability;
/// Common imports for typical usage.
pub mod prelude;
/// Session lifecycle and cancellation.
pub mod session;
/// HTTP transport contract and `reqwest` implementation.
pub mod transport;

pub use client::{StreamClient, StreamClientBuilder};
pub use config::{AbortBehavior, ClientConfig, SessionOptions};
pub use errors::{DecodeError, StreamError};
pub use handlers::Handlers;
pub use message::{Message, Progress, ProgressStatus, StreamOutcome};
pub use observability::init_observability;
pub use session::{AbortHandle, SessionState, StreamingSession};
pub use transport::{ByteStream, ReqwestTransport, StreamTransport};
