use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A published message.
///
/// `id` is supplied by the publisher and carried through verbatim; the broker
/// never interprets it. `payload` is any JSON value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub payload: Value,
}

impl Message {
    pub fn new(id: impl Into<String>, payload: Value) -> Self {
        Self {
            id: id.into(),
            payload,
        }
    }
}
