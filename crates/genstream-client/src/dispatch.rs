use tracing::{debug, warn};

use crate::errors::StreamError;
use crate::handlers::Handlers;
use crate::message::{Message, StreamOutcome};

/// Result of routing one frame.
#[derive(Debug, PartialEq)]
pub(crate) enum Flow {
    Continue,
    Resolve(StreamOutcome),
    Reject(StreamError),
}

/// Routes decoded frames to handlers and owns the per-call accumulator.
///
/// Messages are routed by kind; named events by their event name. The two
/// tables never overlap.
pub(crate) struct Dispatcher {
    handlers: Handlers,
    accumulated_text: String,
    result_payload: Option<serde_json::Value>,
}

impl Dispatcher {
    pub(crate) fn new(handlers: Handlers) -> Self {
        Self {
            handlers,
            accumulated_text: String::new(),
            result_payload: None,
        }
    }

    pub(crate) fn dispatch_message(&mut self, message: Message) -> Flow {
        match message {
            Message::Progress(progress) => {
                if let Some(f) = self.handlers.progress.as_mut() {
                    f(
                        &progress.message,
                        progress.progress,
                        progress.status,
                        progress.word_count,
                    );
                }
                Flow::Continue
            }
            Message::Chunk { content } => {
                self.accumulated_text.push_str(&content);
                if let Some(f) = self.handlers.chunk.as_mut() {
                    f(&content);
                }
                Flow::Continue
            }
            Message::Result { data } => {
                if self.result_payload.is_some() {
                    warn!("ignoring repeated result message");
                    return Flow::Continue;
                }
                if let Some(f) = self.handlers.result.as_mut() {
                    f(&data);
                }
                self.result_payload = Some(data);
                Flow::Continue
            }
            Message::Error { error, code } => {
                if let Some(f) = self.handlers.error.as_mut() {
                    f(&error, code);
                }
                Flow::Reject(StreamError::application(error, code))
            }
            Message::Done => Flow::Resolve(self.complete()),
        }
    }

    /// Routes a named event. Unregistered names are dropped and processing continues.
    pub(crate) fn dispatch_named(&mut self, event: String, payload: serde_json::Value) -> Flow {
        match self.handlers.named.get_mut(&event) {
            Some(f) => {
                f(&payload);
                Flow::Resolve(StreamOutcome::Suspended { event })
            }
            None => {
                debug!(event = %event, "no handler for named event; dropping");
                Flow::Continue
            }
        }
    }

    /// Fires the completion handler and builds the success value.
    pub(crate) fn complete(&mut self) -> StreamOutcome {
        if let Some(f) = self.handlers.complete.as_mut() {
            f();
        }
        if let Some(data) = self.result_payload.take() {
            StreamOutcome::Result { data }
        } else if !self.accumulated_text.is_empty() {
            StreamOutcome::Text {
                text: std::mem::take(&mut self.accumulated_text),
            }
        } else {
            StreamOutcome::Success
        }
    }

    /// Reports a transport failure to the caller's handlers.
    pub(crate) fn connection_failed(&mut self, err: &StreamError) {
        if let Some(f) = self.handlers.connection_error.as_mut() {
            f(err);
        } else if let Some(f) = self.handlers.error.as_mut() {
            f(&err.message(), err.code());
        }
    }

    pub(crate) fn accumulated_text(&self) -> &str {
        &self.accumulated_text
    }
}
