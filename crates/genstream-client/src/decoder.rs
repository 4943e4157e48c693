use serde::de::DeserializeOwned;
use tracing::warn;

use crate::errors::DecodeError;
use crate::framer::SseFrame;
use crate::message::{Message, Progress};

/// What a single frame decodes to.
#[derive(Clone, Debug, PartialEq)]
pub enum Decoded {
    /// Default-event frame carrying a known message kind.
    Message(Message),
    /// Frame with a non-default `event:` name; payload passed through verbatim.
    Named {
        event: String,
        payload: serde_json::Value,
    },
    /// Valid JSON with an unknown or missing `type`; ignored for forward compatibility.
    Ignored { kind: Option<String> },
}

/// Decodes one frame.
///
/// `default_event` is the event name treated the same as an absent `event:`
/// line (conventionally `message`).
pub fn decode_frame(frame: &SseFrame, default_event: &str) -> Result<Decoded, DecodeError> {
    let value: serde_json::Value = serde_json::from_str(&frame.data)
        .map_err(|e| DecodeError::MalformedJson(e.to_string()))?;

    if let Some(event) = frame.event.as_deref().filter(|name| *name != default_event) {
        return Ok(Decoded::Named {
            event: event.to_string(),
            payload: value,
        });
    }

    decode_message(value)
}

/// Maps a default-event JSON object onto [`Message`] by its `type` field.
pub fn decode_message(value: serde_json::Value) -> Result<Decoded, DecodeError> {
    let Some(kind) = value.get("type").and_then(|v| v.as_str()) else {
        return Ok(Decoded::Ignored { kind: None });
    };

    let message = match kind {
        "progress" => Message::Progress(payload::<Progress>(kind, value.clone())?),
        "chunk" => {
            let content = value
                .get("content")
                .and_then(|v| v.as_str())
                .ok_or_else(|| invalid(kind, "missing string field `content`"))?;
            Message::Chunk {
                content: content.to_string(),
            }
        }
        "result" => Message::Result {
            data: value.get("data").cloned().unwrap_or(serde_json::Value::Null),
        },
        "error" => {
            let error = match value.get("error") {
                Some(serde_json::Value::String(text)) => text.clone(),
                Some(serde_json::Value::Null) | None => "unknown error".to_string(),
                Some(other) => other.to_string(),
            };
            let code = value.get("code").and_then(error_code);
            Message::Error { error, code }
        }
        "done" => Message::Done,
        other => {
            return Ok(Decoded::Ignored {
                kind: Some(other.to_string()),
            });
        }
    };
    Ok(Decoded::Message(message))
}

/// Reads an `error` code. Unusable codes are dropped; the error itself still stands.
fn error_code(raw: &serde_json::Value) -> Option<i64> {
    let code = match raw {
        serde_json::Value::Null => return None,
        serde_json::Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                .map(|f| f as i64)
        }),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    };
    if code.is_none() {
        warn!(code = %raw, "error message carries a non-integer code; dropping it");
    }
    code
}

fn payload<T: DeserializeOwned>(kind: &str, value: serde_json::Value) -> Result<T, DecodeError> {
    serde_json::from_value(value).map_err(|e| invalid(kind, e.to_string()))
}

fn invalid(kind: &str, reason: impl Into<String>) -> DecodeError {
    DecodeError::InvalidPayload {
        kind: kind.to_string(),
        reason: reason.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::ProgressStatus;

    fn frame(event: Option<&str>, data: &str) -> SseFrame {
        SseFrame {
            event: event.map(ToOwned::to_owned),
            data: data.to_string(),
        }
    }

    fn decode(event: Option<&str>, data: &str) -> Result<Decoded, DecodeError> {
        decode_frame(&frame(event, data), "message")
    }

    #[test]
    fn decodes_each_message_kind() {
        assert_eq!(
            decode(None, r#"{"type":"chunk","content":"hi"}"#).expect("chunk"),
            Decoded::Message(Message::Chunk {
                content: "hi".into()
            })
        );
        assert_eq!(
            decode(None, r#"{"type":"result","data":{"chapters":3}}"#).expect("result"),
            Decoded::Message(Message::Result {
                data: serde_json::json!({"chapters": 3})
            })
        );
        assert_eq!(
            decode(None, r#"{"type":"error","error":"boom","code":503}"#).expect("error"),
            Decoded::Message(Message::Error {
                error: "boom".into(),
                code: Some(503)
            })
        );
        assert_eq!(
            decode(None, r#"{"type":"done"}"#).expect("done"),
            Decoded::Message(Message::Done)
        );

        let Decoded::Message(Message::Progress(progress)) =
            decode(None, r#"{"type":"progress","progress":10,"message":"outline"}"#)
                .expect("progress")
        else {
            panic!("expected progress message");
        };
        assert_eq!(progress.message, "outline");
        assert_eq!(progress.status, ProgressStatus::Processing);
    }

    #[test]
    fn default_event_name_uses_message_union() {
        assert_eq!(
            decode(Some("message"), r#"{"type":"done"}"#).expect("done"),
            Decoded::Message(Message::Done)
        );
    }

    #[test]
    fn named_event_bypasses_message_union() {
        let decoded = decode(
            Some("character_confirmation_required"),
            r#"{"type":"done","foo":1}"#,
        )
        .expect("named");
        assert_eq!(
            decoded,
            Decoded::Named {
                event: "character_confirmation_required".into(),
                payload: serde_json::json!({"type": "done", "foo": 1}),
            }
        );
    }

    #[test]
    fn malformed_json_is_a_decode_error() {
        assert!(matches!(
            decode(None, "{bad json"),
            Err(DecodeError::MalformedJson(_))
        ));
    }

    #[test]
    fn unknown_or_missing_type_is_ignored() {
        assert_eq!(
            decode(None, r#"{"type":"heartbeat"}"#).expect("unknown"),
            Decoded::Ignored {
                kind: Some("heartbeat".into())
            }
        );
        assert_eq!(
            decode(None, r#"{"content":"x"}"#).expect("untyped"),
            Decoded::Ignored { kind: None }
        );
    }

    #[test]
    fn error_code_shapes_never_drop_the_error() {
        let code_of = |data: &str| match decode(None, data).expect("error frame") {
            Decoded::Message(Message::Error { code, .. }) => code,
            other => panic!("expected error message, got {other:?}"),
        };
        assert_eq!(code_of(r#"{"type":"error","error":"x","code":500.0}"#), Some(500));
        assert_eq!(code_of(r#"{"type":"error","error":"x","code":"429"}"#), Some(429));
        assert_eq!(code_of(r#"{"type":"error","error":"x","code":"E429"}"#), None);
        assert_eq!(code_of(r#"{"type":"error","error":"x","code":1.5}"#), None);
        assert_eq!(code_of(r#"{"type":"error","error":"x","code":[1]}"#), None);
        assert_eq!(code_of(r#"{"type":"error","error":"x"}"#), None);
    }

    #[test]
    fn chunk_without_content_is_invalid() {
        assert!(matches!(
            decode(None, r#"{"type":"chunk"}"#),
            Err(DecodeError::InvalidPayload { kind, .. }) if kind == "chunk"
        ));
    }
}
