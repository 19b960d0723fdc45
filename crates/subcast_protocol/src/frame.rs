use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::message::Message;

/// Wire error codes carried inside `ServerFrame::error.code` and in HTTP
/// error envelopes.
pub mod code {
    pub const BAD_REQUEST: &str = "BAD_REQUEST";
    pub const TOPIC_NOT_FOUND: &str = "TOPIC_NOT_FOUND";
    pub const TOPIC_EXISTS: &str = "TOPIC_EXISTS";
    pub const CONFLICT: &str = "CONFLICT";
    pub const SLOW_CONSUMER: &str = "SLOW_CONSUMER";
    pub const INTERNAL: &str = "INTERNAL";
}

/// A frame read from a client.
///
/// All fields except `type` are optional on the wire; per-operation
/// validation happens in the session dispatcher so that incomplete input
/// yields a `BAD_REQUEST` reply (with `request_id` echoed) instead of a
/// deserialization failure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClientFrame {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<Message>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_n: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FrameKind {
    Ack,
    Event,
    Error,
    Pong,
    Info,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

/// A frame written to a client. Fields that do not apply to the frame kind
/// are omitted from the encoded JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerFrame {
    #[serde(rename = "type")]
    pub kind: FrameKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<Message>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub msg: Option<String>,
    pub ts: DateTime<Utc>,
}

impl ServerFrame {
    fn base(kind: FrameKind) -> Self {
        Self {
            kind,
            request_id: None,
            topic: None,
            message: None,
            error: None,
            status: None,
            msg: None,
            ts: Utc::now(),
        }
    }

    pub fn ack(request_id: Option<String>, topic: impl Into<String>) -> Self {
        Self {
            request_id,
            topic: Some(topic.into()),
            status: Some("ok".to_string()),
            ..Self::base(FrameKind::Ack)
        }
    }

    pub fn event(topic: impl Into<String>, message: Message) -> Self {
        Self {
            topic: Some(topic.into()),
            message: Some(message),
            ..Self::base(FrameKind::Event)
        }
    }

    pub fn error(request_id: Option<String>, code: &str, message: impl Into<String>) -> Self {
        Self {
            request_id,
            error: Some(ErrorBody {
                code: code.to_string(),
                message: message.into(),
            }),
            ..Self::base(FrameKind::Error)
        }
    }

    pub fn pong(request_id: Option<String>) -> Self {
        Self {
            request_id,
            ..Self::base(FrameKind::Pong)
        }
    }

    /// The periodic heartbeat frame: `{type:"info", msg:"ping", ts}`.
    pub fn heartbeat() -> Self {
        Self {
            msg: Some("ping".to_string()),
            ..Self::base(FrameKind::Info)
        }
    }
}
