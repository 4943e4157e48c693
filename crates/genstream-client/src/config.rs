use std::time::Duration;

use crate::errors::StreamError;

const DEFAULT_USER_AGENT: &str = concat!("genstream-client/", env!("CARGO_PKG_VERSION"));
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Transport configuration for [`ReqwestTransport`](crate::ReqwestTransport).
///
/// Only connection establishment is bounded. A streaming call has no overall
/// deadline; callers that want one abort the session from a timer.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// Base URL that relative addresses are joined onto.
    pub base_url: Option<String>,
    /// Timeout for establishing the TCP/TLS connection.
    pub connect_timeout: Duration,
    pub user_agent: String,
    /// Extra headers sent with every request.
    pub headers: Vec<(String, String)>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            headers: Vec::new(),
        }
    }
}

impl ClientConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a config from the process environment.
    ///
    /// - `GENSTREAM_BASE_URL`: base URL for relative addresses.
    /// - `GENSTREAM_CONNECT_TIMEOUT_SECS`: connect timeout in whole seconds.
    /// - `GENSTREAM_USER_AGENT`: user agent override.
    pub fn from_env() -> Result<Self, StreamError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, StreamError> {
        let mut config = Self::default();
        if let Some(base_url) = lookup("GENSTREAM_BASE_URL").filter(|v| !v.trim().is_empty()) {
            config.base_url = Some(base_url.trim().to_string());
        }
        if let Some(raw) = lookup("GENSTREAM_CONNECT_TIMEOUT_SECS") {
            let secs: u64 = raw.trim().parse().map_err(|_| {
                StreamError::Config(format!(
                    "GENSTREAM_CONNECT_TIMEOUT_SECS must be a whole number of seconds, got {raw:?}"
                ))
            })?;
            config.connect_timeout = Duration::from_secs(secs);
        }
        if let Some(user_agent) = lookup("GENSTREAM_USER_AGENT").filter(|v| !v.trim().is_empty()) {
            config.user_agent = user_agent;
        }
        Ok(config)
    }

    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Adds a header sent with every request (for example an auth token).
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Resolves a call address against `base_url`.
    pub fn resolve_address(&self, address: &str) -> Result<String, StreamError> {
        let address = address.trim();
        if address.is_empty() {
            return Err(StreamError::Validation("address must not be empty".into()));
        }
        if address.starts_with("http://") || address.starts_with("https://") {
            return Ok(address.to_string());
        }
        match self.base_url.as_deref() {
            Some(base) => Ok(format!(
                "{}/{}",
                base.trim_end_matches('/'),
                address.trim_start_matches('/')
            )),
            None => Err(StreamError::Validation(format!(
                "relative address {address:?} requires a base_url"
            ))),
        }
    }
}

/// What an aborted call's future does.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AbortBehavior {
    /// The call never completes. Whoever aborts must not also await it.
    #[default]
    LeavePending,
    /// The call returns `Err(StreamError::Cancelled)`.
    RejectCancelled,
}

/// Per-session behavior options.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionOptions {
    /// Event name routed through the message union, same as no `event:` line.
    pub default_event: String,
    pub abort_behavior: AbortBehavior,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            default_event: "message".to_string(),
            abort_behavior: AbortBehavior::default(),
        }
    }
}

impl SessionOptions {
    pub fn default_event(mut self, name: impl Into<String>) -> Self {
        self.default_event = name.into();
        self
    }

    pub fn abort_behavior(mut self, behavior: AbortBehavior) -> Self {
        self.abort_behavior = behavior;
        self
    }

    pub(crate) fn validate(&self) -> Result<(), StreamError> {
        if self.default_event.trim().is_empty() {
            return Err(StreamError::Config(
                "default_event must not be empty".into(),
            ));
        }
        Ok(())
    }
}
