use std::collections::HashMap;
use std::fmt;

use crate::errors::StreamError;
use crate::message::ProgressStatus;

type ProgressFn = Box<dyn FnMut(&str, f64, ProgressStatus, Option<u64>) + Send>;
type ChunkFn = Box<dyn FnMut(&str) + Send>;
type PayloadFn = Box<dyn FnMut(&serde_json::Value) + Send>;
type ErrorFn = Box<dyn FnMut(&str, Option<i64>) + Send>;
type CompleteFn = Box<dyn FnMut() + Send>;
type ConnectionErrorFn = Box<dyn FnMut(&StreamError) + Send>;

/// Caller-supplied callbacks for one streaming call.
///
/// Every callback is optional. Callbacks run inline on the session's read
/// loop, in frame order; a slow callback delays the next read.
///
/// ```
/// use genstream_client::Handlers;
///
/// let handlers = Handlers::new()
///     .on_chunk(|fragment| print!("{fragment}"))
///     .on_named_event("character_confirmation_required", |payload| {
///         println!("confirm: {payload}");
///     });
/// assert!(handlers.has_named_event("character_confirmation_required"));
/// ```
#[derive(Default)]
pub struct Handlers {
    pub(crate) progress: Option<ProgressFn>,
    pub(crate) chunk: Option<ChunkFn>,
    pub(crate) result: Option<PayloadFn>,
    pub(crate) error: Option<ErrorFn>,
    pub(crate) complete: Option<CompleteFn>,
    pub(crate) connection_error: Option<ConnectionErrorFn>,
    pub(crate) named: HashMap<String, PayloadFn>,
}

impl Handlers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Called with `(message, progress, status, word_count)` for `progress` messages.
    pub fn on_progress(
        mut self,
        f: impl FnMut(&str, f64, ProgressStatus, Option<u64>) + Send + 'static,
    ) -> Self {
        self.progress = Some(Box::new(f));
        self
    }

    /// Called with each new `chunk` fragment (not the cumulative text).
    pub fn on_chunk(mut self, f: impl FnMut(&str) + Send + 'static) -> Self {
        self.chunk = Some(Box::new(f));
        self
    }

    /// Called with the `result` payload.
    pub fn on_result(mut self, f: impl FnMut(&serde_json::Value) + Send + 'static) -> Self {
        self.result = Some(Box::new(f));
        self
    }

    /// Called with `(message, code)` for server `error` messages.
    ///
    /// Also receives transport failures when no connection-error handler is set.
    pub fn on_error(mut self, f: impl FnMut(&str, Option<i64>) + Send + 'static) -> Self {
        self.error = Some(Box::new(f));
        self
    }

    /// Called once when a `done` message arrives or the stream ends cleanly.
    pub fn on_complete(mut self, f: impl FnMut() + Send + 'static) -> Self {
        self.complete = Some(Box::new(f));
        self
    }

    /// Called with the raw transport error before the call rejects.
    pub fn on_connection_error(mut self, f: impl FnMut(&StreamError) + Send + 'static) -> Self {
        self.connection_error = Some(Box::new(f));
        self
    }

    /// Registers a handler for frames carrying `event: <name>`.
    ///
    /// Receiving a registered named event halts the call with
    /// [`StreamOutcome::Suspended`](crate::StreamOutcome::Suspended).
    pub fn on_named_event(
        mut self,
        name: impl Into<String>,
        f: impl FnMut(&serde_json::Value) + Send + 'static,
    ) -> Self {
        self.named.insert(name.into(), Box::new(f));
        self
    }

    pub fn has_named_event(&self, name: &str) -> bool {
        self.named.contains_key(name)
    }
}

impl fmt::Debug for Handlers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut named: Vec<&str> = self.named.keys().map(String::as_str).collect();
        named.sort_unstable();
        f.debug_struct("Handlers")
            .field("progress", &self.progress.is_some())
            .field("chunk", &self.chunk.is_some())
            .field("result", &self.result.is_some())
            .field("error", &self.error.is_some())
            .field("complete", &self.complete.is_some())
            .field("connection_error", &self.connection_error.is_some())
            .field("named", &named)
            .finish()
    }
}
