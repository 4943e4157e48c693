//! One streaming call: open, read, frame, decode, dispatch, settle.

use std::sync::Arc;

use futures::StreamExt as _;
use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::config::{AbortBehavior, SessionOptions};
use crate::decoder::{Decoded, decode_frame};
use crate::dispatch::{Dispatcher, Flow};
use crate::errors::StreamError;
use crate::framer::SseFramer;
use crate::handlers::Handlers;
use crate::message::StreamOutcome;
use crate::transport::StreamTransport;

/// Lifecycle of a session. `Open` is the only non-terminal state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    Open,
    Resolved,
    Rejected,
    Aborted,
}

/// One-shot settlement guard.
#[derive(Debug)]
pub(crate) struct Lifecycle {
    state: SessionState,
}

impl Lifecycle {
    pub(crate) fn new() -> Self {
        Self {
            state: SessionState::Open,
        }
    }

    /// Moves out of `Open`. Returns `false` (and changes nothing) if already settled.
    pub(crate) fn settle(&mut self, to: SessionState) -> bool {
        if self.state != SessionState::Open || to == SessionState::Open {
            return false;
        }
        self.state = to;
        true
    }

    pub(crate) fn state(&self) -> SessionState {
        self.state
    }

    pub(crate) fn is_open(&self) -> bool {
        self.state == SessionState::Open
    }
}

/// Handle used to cancel a session from another task or thread.
#[derive(Clone, Debug)]
pub struct AbortHandle {
    tx: watch::Sender<bool>,
}

impl AbortHandle {
    /// Requests cancellation. Repeated calls are no-ops.
    ///
    /// The read loop stops before the next frame is dispatched and no further
    /// handler fires. What the pending call then does depends on
    /// [`AbortBehavior`].
    pub fn abort(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_aborted(&self) -> bool {
        *self.tx.borrow()
    }
}

enum Settled {
    Resolved(StreamOutcome),
    Rejected(StreamError),
    Aborted,
}

/// Manages one request/response streaming exchange.
///
/// State (framer buffer, accumulated text, result payload) lives only for the
/// duration of [`run`](Self::run); sessions share nothing with each other.
pub struct StreamingSession {
    session_id: uuid::Uuid,
    transport: Arc<dyn StreamTransport>,
    options: SessionOptions,
    abort_tx: watch::Sender<bool>,
    abort_rx: watch::Receiver<bool>,
}

impl StreamingSession {
    pub fn new(transport: Arc<dyn StreamTransport>, options: SessionOptions) -> Self {
        let (abort_tx, abort_rx) = watch::channel(false);
        Self {
            session_id: uuid::Uuid::new_v4(),
            transport,
            options,
            abort_tx,
            abort_rx,
        }
    }

    pub fn session_id(&self) -> uuid::Uuid {
        self.session_id
    }

    /// Returns a handle that can cancel this session's call.
    pub fn abort_handle(&self) -> AbortHandle {
        AbortHandle {
            tx: self.abort_tx.clone(),
        }
    }

    /// Runs the call to its single terminal outcome.
    ///
    /// Resolves with the `result` payload, the accumulated text, or a bare
    /// success marker. Rejects on a transport failure or a server `error`
    /// message. After an abort, the future never completes unless the session
    /// uses [`AbortBehavior::RejectCancelled`].
    pub async fn run<B>(
        self,
        address: &str,
        body: &B,
        handlers: Handlers,
    ) -> Result<StreamOutcome, StreamError>
    where
        B: Serialize + ?Sized,
    {
        let body = serde_json::to_value(body)
            .map_err(|e| StreamError::Validation(format!("request body is not JSON: {e}")))?;
        match self.drive(address, &body, handlers).await {
            Settled::Resolved(outcome) => Ok(outcome),
            Settled::Rejected(err) => Err(err),
            Settled::Aborted => match self.options.abort_behavior {
                AbortBehavior::RejectCancelled => Err(StreamError::Cancelled),
                AbortBehavior::LeavePending => {
                    debug!(session_id = %self.session_id, "session aborted; call left pending");
                    std::future::pending().await
                }
            },
        }
    }

    async fn drive(&self, address: &str, body: &serde_json::Value, handlers: Handlers) -> Settled {
        let session_id = self.session_id;
        let mut lifecycle = Lifecycle::new();
        let mut dispatcher = Dispatcher::new(handlers);
        let mut framer = SseFramer::default();
        let mut abort_rx = self.abort_rx.clone();

        if self.is_aborted() {
            return self.settle(&mut lifecycle, Settled::Aborted);
        }

        debug!(session_id = %session_id, address, "opening session");
        let opened = tokio::select! {
            biased;
            _ = wait_for_abort(&mut abort_rx) => None,
            opened = self.transport.open(address, body) => Some(opened),
        };
        let mut stream = match opened {
            None => return self.settle(&mut lifecycle, Settled::Aborted),
            Some(Ok(stream)) => stream,
            Some(Err(err)) => return self.fail_transport(&mut lifecycle, &mut dispatcher, err),
        };

        loop {
            let next = tokio::select! {
                biased;
                _ = wait_for_abort(&mut abort_rx) => None,
                next = stream.next() => Some(next),
            };
            let chunk = match next {
                None => return self.settle(&mut lifecycle, Settled::Aborted),
                Some(Some(Ok(chunk))) => chunk,
                Some(Some(Err(err))) => {
                    return self.fail_transport(&mut lifecycle, &mut dispatcher, err);
                }
                Some(None) => {
                    let dropped = framer.discard_pending();
                    if dropped > 0 {
                        debug!(
                            session_id = %session_id,
                            bytes = dropped,
                            "discarding unterminated trailing frame"
                        );
                    }
                    debug!(
                        session_id = %session_id,
                        text_len = dispatcher.accumulated_text().len(),
                        "stream ended without done"
                    );
                    let outcome = dispatcher.complete();
                    return self.settle(&mut lifecycle, Settled::Resolved(outcome));
                }
            };

            for frame in framer.push_chunk(&chunk) {
                if self.is_aborted() {
                    return self.settle(&mut lifecycle, Settled::Aborted);
                }
                let flow = match decode_frame(&frame, &self.options.default_event) {
                    Ok(Decoded::Message(message)) => {
                        debug!(session_id = %session_id, kind = message.kind(), "message");
                        dispatcher.dispatch_message(message)
                    }
                    Ok(Decoded::Named { event, payload }) => {
                        debug!(session_id = %session_id, event = %event, "named event");
                        dispatcher.dispatch_named(event, payload)
                    }
                    Ok(Decoded::Ignored { kind }) => {
                        debug!(session_id = %session_id, kind = ?kind, "ignoring unrecognized message");
                        Flow::Continue
                    }
                    Err(err) => {
                        warn!(
                            session_id = %session_id,
                            error = %err,
                            data = %frame.data,
                            "skipping undecodable frame"
                        );
                        Flow::Continue
                    }
                };
                match flow {
                    Flow::Continue => {}
                    Flow::Resolve(outcome) => {
                        return self.settle(&mut lifecycle, Settled::Resolved(outcome));
                    }
                    Flow::Reject(err) => {
                        return self.settle(&mut lifecycle, Settled::Rejected(err));
                    }
                }
            }
        }
    }

    fn fail_transport(
        &self,
        lifecycle: &mut Lifecycle,
        dispatcher: &mut Dispatcher,
        err: StreamError,
    ) -> Settled {
        if self.is_aborted() {
            return self.settle(lifecycle, Settled::Aborted);
        }
        warn!(session_id = %self.session_id, error = %err, "transport failure");
        if lifecycle.is_open() {
            dispatcher.connection_failed(&err);
        }
        self.settle(lifecycle, Settled::Rejected(err))
    }

    fn settle(&self, lifecycle: &mut Lifecycle, settled: Settled) -> Settled {
        let to = match &settled {
            Settled::Resolved(_) => SessionState::Resolved,
            Settled::Rejected(_) => SessionState::Rejected,
            Settled::Aborted => SessionState::Aborted,
        };
        let first = lifecycle.settle(to);
        debug_assert!(first, "drive returns on its first settlement");
        debug!(session_id = %self.session_id, state = ?lifecycle.state(), "session settled");
        settled
    }

    fn is_aborted(&self) -> bool {
        *self.abort_rx.borrow()
    }
}

async fn wait_for_abort(rx: &mut watch::Receiver<bool>) {
    let sender_gone = rx.wait_for(|aborted| *aborted).await.is_err();
    if sender_gone {
        std::future::pending::<()>().await;
    }
}
