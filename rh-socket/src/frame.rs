//! Wire frames.
//!
//! Every WebSocket text message carries one JSON object naming the event
//! and its payload. Binary messages are not used.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use rh_core::error::RhResult;

/// One named event on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub event: String,
    #[serde(default)]
    pub data: Value,
}

impl Frame {
    pub fn new(event: impl Into<String>, data: Value) -> Self {
        Self {
            event: event.into(),
            data,
        }
    }

    /// A frame with no payload.
    pub fn bare(event: impl Into<String>) -> Self {
        Self::new(event, Value::Null)
    }

    pub fn encode(&self) -> RhResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn decode(text: &str) -> RhResult<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Best-effort human readable reason carried by error frames.
    ///
    /// Servers send either a bare string or an object with `message`.
    pub fn reason(&self) -> String {
        match &self.data {
            Value::String(s) => s.clone(),
            Value::Object(map) => map
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| self.data.to_string()),
            Value::Null => self.event.clone(),
            other => other.to_string(),
        }
    }
}
