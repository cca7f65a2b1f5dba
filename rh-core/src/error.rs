//! Global error types for the Ridehail client.
//!
//! All error categories across the workspace are unified into a single
//! `RhError` enum with conversions from underlying library errors.

use thiserror::Error;

/// Convenience type alias for Results using RhError.
pub type RhResult<T> = Result<T, RhError>;

/// Unified error type covering all error categories in the client.
#[derive(Error, Debug)]
pub enum RhError {
    // -- Configuration errors --
    /// Failed to load or parse application configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// A required configuration value is missing.
    #[error("missing configuration: {0}")]
    MissingConfig(String),

    // -- Network errors --
    /// HTTP request failed.
    #[error("http error: {0}")]
    Http(String),

    /// Request or connect attempt timed out.
    #[error("request timeout: {0}")]
    Timeout(String),

    /// Real-time socket error.
    #[error("socket error: {0}")]
    Socket(String),

    /// Server returned an error response.
    #[error("server error (status {status}): {message}")]
    ServerError {
        /// HTTP status code.
        status: u16,
        /// Error message from server.
        message: String,
    },

    // -- Authentication errors --
    /// The server rejected our credentials.
    #[error("authentication failed: {0}")]
    AuthFailed(String),

    /// No bearer token is available in the token store.
    #[error("no auth token available")]
    MissingToken,

    // -- Data errors --
    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// An inbound event payload did not match its declared type.
    #[error("invalid payload for {event}: {reason}")]
    InvalidPayload {
        /// Event name the payload arrived under.
        event: String,
        /// Why it was rejected.
        reason: String,
    },

    /// File system operation failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    // -- Service errors --
    /// A service failed to initialize.
    #[error("service init error: {0}")]
    ServiceInit(String),

    /// A service is not yet initialized.
    #[error("service not initialized: {0}")]
    ServiceNotInitialized(String),

    /// A service operation failed.
    #[error("service error: {0}")]
    Service(String),

    // -- Notification errors --
    /// Desktop notification failed.
    #[error("notification error: {0}")]
    Notification(String),

    // -- Generic --
    /// An unexpected internal error.
    #[error("internal error: {0}")]
    Internal(String),

    /// Wrapping anyhow errors for interop.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl RhError {
    /// Whether this error means the caller must obtain fresh credentials
    /// before trying again.
    pub fn is_auth_error(&self) -> bool {
        matches!(self, Self::AuthFailed(_) | Self::MissingToken)
    }
}

impl From<serde_json::Error> for RhError {
    fn from(e: serde_json::Error) -> Self {
        RhError::Serialization(e.to_string())
    }
}

impl From<toml::de::Error> for RhError {
    fn from(e: toml::de::Error) -> Self {
        RhError::Config(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rh_error_display() {
        let err = RhError::Config("bad value".to_string());
        assert_eq!(err.to_string(), "configuration error: bad value");

        let err = RhError::ServerError {
            status: 503,
            message: "maintenance".into(),
        };
        assert_eq!(err.to_string(), "server error (status 503): maintenance");
    }

    #[test]
    fn test_auth_error_classification() {
        assert!(RhError::MissingToken.is_auth_error());
        assert!(RhError::AuthFailed("expired".into()).is_auth_error());
        assert!(!RhError::Socket("closed".into()).is_auth_error());
    }

    #[test]
    fn test_serde_json_conversion() {
        let err: RhError = serde_json::from_str::<u32>("nope").unwrap_err().into();
        assert!(matches!(err, RhError::Serialization(_)));
    }
}
