//! Response envelope.
//!
//! Every endpoint answers with the same wrapper:
//! ```json
//! { "success": true, "data": { ... }, "message": "optional" }
//! ```

use serde::{Deserialize, Serialize};

use rh_core::error::{RhError, RhResult};

/// Standard response envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T = serde_json::Value> {
    pub success: bool,
    pub data: Option<T>,
    #[serde(default)]
    pub message: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn is_success(&self) -> bool {
        self.success
    }

    /// Server-supplied message, or a generic one.
    pub fn message_or_default(&self) -> String {
        self.message
            .clone()
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| "request was not successful".to_string())
    }

    /// Unwrap the payload, turning `success: false` into an error.
    pub fn into_data(self, what: &str) -> RhResult<T> {
        if !self.success {
            return Err(RhError::Http(format!("{what}: {}", self.message_or_default())));
        }
        self.data
            .ok_or_else(|| RhError::Serialization(format!("{what}: response has no data")))
    }

    /// Check `success` and discard the payload.
    pub fn into_unit(self, what: &str) -> RhResult<()> {
        if self.success {
            Ok(())
        } else {
            Err(RhError::Http(format!("{what}: {}", self.message_or_default())))
        }
    }
}
