//! Common imports for typical client usage.
pub use crate::{
    AbortBehavior, AbortHandle, ClientConfig, Handlers, ProgressStatus, SessionOptions,
    StreamClient, StreamError, StreamOutcome, StreamingSession,
};
