//! Real-time transport connection state.

use std::time::Duration;

/// Connection state of the real-time transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportState {
    /// Not connected and not trying to connect.
    Disconnected,
    /// Opening the socket.
    Connecting,
    /// Socket open, waiting for the server's auth handshake.
    Authenticating,
    /// Authenticated; outbound sends are accepted.
    Connected,
    /// Connection lost, a retry is scheduled.
    Reconnecting,
    /// Gave up after too many consecutive failures.
    Failed,
}

impl TransportState {
    /// Whether a connect attempt or live session currently exists.
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            Self::Connecting | Self::Authenticating | Self::Connected | Self::Reconnecting
        )
    }
}

impl std::fmt::Display for TransportState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Disconnected => write!(f, "disconnected"),
            Self::Connecting => write!(f, "connecting"),
            Self::Authenticating => write!(f, "authenticating"),
            Self::Connected => write!(f, "connected"),
            Self::Reconnecting => write!(f, "reconnecting"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Lifecycle signals published by the transport client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// The connection state changed.
    StateChanged(TransportState),
    /// The server completed the auth handshake.
    Authenticated,
    /// A reconnect attempt is scheduled after `delay`.
    ReconnectScheduled { attempt: u32, delay: Duration },
    /// Reconnecting was abandoned after `attempts` retries.
    Failed { attempts: u32 },
    /// No usable credentials; the caller must log in again and reconnect.
    AuthRequired { reason: String },
    /// A non-fatal transport or server error.
    Error { message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_display() {
        assert_eq!(TransportState::Connected.to_string(), "connected");
        assert_eq!(TransportState::Authenticating.to_string(), "authenticating");
    }

    #[test]
    fn test_active_states() {
        assert!(TransportState::Reconnecting.is_active());
        assert!(!TransportState::Failed.is_active());
        assert!(!TransportState::Disconnected.is_active());
    }
}
