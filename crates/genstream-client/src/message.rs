use serde::{Deserialize, Deserializer, Serialize};

/// Status attached to a `progress` message.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgressStatus {
    #[default]
    Processing,
    Success,
    Error,
    Warning,
}

impl ProgressStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Processing => "processing",
            Self::Success => "success",
            Self::Error => "error",
            Self::Warning => "warning",
        }
    }

    /// Parses a wire status. Unknown names fall back to `Processing`.
    pub fn from_wire(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "success" | "completed" | "complete" | "done" => Self::Success,
            "error" | "failed" => Self::Error,
            "warning" => Self::Warning,
            _ => Self::Processing,
        }
    }
}

/// Payload of a `progress` message.
///
/// Decoding is lenient: `null`, missing or oddly typed fields take their
/// defaults so a progress update is never lost to its shape.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Progress {
    #[serde(default, deserialize_with = "lenient_text")]
    pub message: String,
    /// Percentage in `0..=100`.
    #[serde(default, deserialize_with = "lenient_percent")]
    pub progress: f64,
    #[serde(default, deserialize_with = "lenient_status")]
    pub status: ProgressStatus,
    #[serde(
        default,
        deserialize_with = "lenient_count",
        skip_serializing_if = "Option::is_none"
    )]
    pub word_count: Option<u64>,
}

fn lenient_text<'de, D: Deserializer<'de>>(de: D) -> Result<String, D::Error> {
    Ok(match Option::<serde_json::Value>::deserialize(de)? {
        None | Some(serde_json::Value::Null) => String::new(),
        Some(serde_json::Value::String(text)) => text,
        Some(other) => other.to_string(),
    })
}

fn lenient_percent<'de, D: Deserializer<'de>>(de: D) -> Result<f64, D::Error> {
    Ok(match Option::<serde_json::Value>::deserialize(de)? {
        Some(serde_json::Value::Number(n)) => n.as_f64().unwrap_or_default(),
        Some(serde_json::Value::String(s)) => s.trim().parse().unwrap_or_default(),
        _ => 0.0,
    })
}

fn lenient_status<'de, D: Deserializer<'de>>(de: D) -> Result<ProgressStatus, D::Error> {
    Ok(match Option::<serde_json::Value>::deserialize(de)? {
        Some(serde_json::Value::String(s)) => ProgressStatus::from_wire(&s),
        _ => ProgressStatus::Processing,
    })
}

fn lenient_count<'de, D: Deserializer<'de>>(de: D) -> Result<Option<u64>, D::Error> {
    Ok(match Option::<serde_json::Value>::deserialize(de)? {
        Some(serde_json::Value::Number(n)) => n.as_u64().or_else(|| {
            n.as_f64()
                .filter(|f| *f >= 0.0 && f.fract() == 0.0)
                .map(|f| f as u64)
        }),
        Some(serde_json::Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

/// A decoded default-event message, keyed on the wire by its `type` field.
#[derive(Clone, Debug, PartialEq)]
pub enum Message {
    Progress(Progress),
    /// Text fragment appended to the accumulator.
    Chunk { content: String },
    /// Final computed result.
    Result { data: serde_json::Value },
    /// Server-reported failure; fatal to the session.
    Error { error: String, code: Option<i64> },
    /// Terminal marker.
    Done,
}

impl Message {
    /// Wire name of this message kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Progress(_) => "progress",
            Self::Chunk { .. } => "chunk",
            Self::Result { .. } => "result",
            Self::Error { .. } => "error",
            Self::Done => "done",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Error { .. } | Self::Done)
    }
}

/// Value a successful call resolves with.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StreamOutcome {
    /// Payload of the `result` message.
    Result { data: serde_json::Value },
    /// No `result` arrived; the concatenated `chunk` text.
    Text { text: String },
    /// Completed with neither a result nor any text.
    Success,
    /// A registered named event halted processing; the caller continues out of band.
    Suspended { event: String },
}

impl StreamOutcome {
    /// Accumulated text, when the call resolved with text.
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Text { text } => Some(text),
            _ => None,
        }
    }

    /// Result payload, when the call resolved with one.
    pub fn data(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Result { data } => Some(data),
            _ => None,
        }
    }
}
