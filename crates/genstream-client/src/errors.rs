/// Terminal failure of a streaming call.
///
/// Protocol problems (malformed frames, undecodable payloads) never show up
/// here; the session logs and skips them. See [`DecodeError`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StreamError {
    /// Invalid client configuration.
    #[error("config error: {0}")]
    Config(String),
    /// Invalid input to the call (for example an empty address).
    #[error("validation error: {0}")]
    Validation(String),
    /// Non-success HTTP status or network-level failure.
    #[error("transport error{}: {message}", status_suffix(.status))]
    Transport {
        status: Option<u16>,
        message: String,
    },
    /// The server sent an explicit `error` message.
    #[error("{message}")]
    Application { message: String, code: Option<i64> },
    /// The call was aborted and the session is configured to reject on abort.
    #[error("stream cancelled")]
    Cancelled,
}

impl StreamError {
    /// Creates a transport error.
    pub fn transport(status: Option<u16>, message: impl Into<String>) -> Self {
        Self::Transport {
            status,
            message: message.into(),
        }
    }

    /// Creates an application error from a server `error` message.
    pub fn application(message: impl Into<String>, code: Option<i64>) -> Self {
        Self::Application {
            message: message.into(),
            code,
        }
    }

    /// Returns the human-readable message for this error.
    pub fn message(&self) -> String {
        match self {
            Self::Config(message) | Self::Validation(message) => message.clone(),
            Self::Transport { message, .. } | Self::Application { message, .. } => {
                message.clone()
            }
            Self::Cancelled => "stream cancelled".to_string(),
        }
    }

    /// HTTP status for transport errors that carried one.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Transport { status, .. } => *status,
            _ => None,
        }
    }

    /// Numeric code: the application code, or the HTTP status for transport errors.
    pub fn code(&self) -> Option<i64> {
        match self {
            Self::Application { code, .. } => *code,
            Self::Transport { status, .. } => status.map(i64::from),
            _ => None,
        }
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" (status {s})")).unwrap_or_default()
}

/// Recoverable decode failure for a single frame.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    /// The `data:` payload is not valid JSON.
    #[error("malformed JSON payload: {0}")]
    MalformedJson(String),
    /// The payload is JSON but does not fit the message kind it declares.
    #[error("invalid `{kind}` payload: {reason}")]
    InvalidPayload { kind: String, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_display_includes_status_when_known() {
        let err = StreamError::transport(Some(502), "bad gateway");
        assert_eq!(err.to_string(), "transport error (status 502): bad gateway");
        assert_eq!(err.code(), Some(502));

        let err = StreamError::transport(None, "connection reset");
        assert_eq!(err.to_string(), "transport error: connection reset");
        assert_eq!(err.status(), None);
    }

    #[test]
    fn application_error_displays_server_text() {
        let err = StreamError::application("quota exceeded", Some(429));
        assert_eq!(err.to_string(), "quota exceeded");
        assert_eq!(err.message(), "quota exceeded");
        assert_eq!(err.code(), Some(429));
        assert!(!err.is_transport());
    }
}
