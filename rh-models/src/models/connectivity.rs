//! Network connectivity snapshots and the events derived from them.

use serde::{Deserialize, Serialize};

/// Whether the wider internet answers, as reported by the platform.
///
/// Platforms often report "unknown" right after an interface comes up and
/// before their own reachability check completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Reachability {
    Reachable,
    Unreachable,
    #[default]
    Unknown,
}

impl Reachability {
    /// Map the platform's tri-state (`true`/`false`/`null`).
    pub fn from_option(value: Option<bool>) -> Self {
        match value {
            Some(true) => Self::Reachable,
            Some(false) => Self::Unreachable,
            None => Self::Unknown,
        }
    }

    /// `Some(bool)` for a definite answer, `None` for unknown.
    pub fn as_option(&self) -> Option<bool> {
        match self {
            Self::Reachable => Some(true),
            Self::Unreachable => Some(false),
            Self::Unknown => None,
        }
    }
}

/// Active link type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionType {
    Wifi,
    Cellular,
    Ethernet,
    #[default]
    Unknown,
}

impl std::fmt::Display for ConnectionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Wifi => write!(f, "wifi"),
            Self::Cellular => write!(f, "cellular"),
            Self::Ethernet => write!(f, "ethernet"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// Immutable snapshot of the device's connectivity.
///
/// Replaced wholesale on every platform callback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ConnectivityStatus {
    pub is_connected: bool,
    pub is_internet_reachable: Reachability,
    pub connection_type: ConnectionType,
    pub is_wifi_radio_on: bool,
    pub is_cellular_radio_on: bool,
}

impl ConnectivityStatus {
    /// Connected with confirmed internet reachability.
    pub fn online(connection_type: ConnectionType) -> Self {
        Self {
            is_connected: true,
            is_internet_reachable: Reachability::Reachable,
            connection_type,
            is_wifi_radio_on: connection_type == ConnectionType::Wifi,
            is_cellular_radio_on: connection_type == ConnectionType::Cellular,
        }
    }

    /// No link at all.
    pub fn offline() -> Self {
        Self::default()
    }

    /// Build a snapshot from the two flags that matter for the composite signal.
    pub fn from_flags(is_connected: bool, reachable: Option<bool>) -> Self {
        Self {
            is_connected,
            is_internet_reachable: Reachability::from_option(reachable),
            ..Self::default()
        }
    }

    /// The composite online signal: a link plus confirmed reachability.
    pub fn has_internet(&self) -> bool {
        self.is_connected && self.is_internet_reachable == Reachability::Reachable
    }
}

/// Signals derived from a stream of connectivity snapshots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectivityEvent {
    /// Link came up.
    Connected,
    /// Link went down.
    Disconnected,
    /// Internet became reachable.
    InternetReachable,
    /// Internet became unreachable.
    InternetUnreachable,
    /// Composite signal flipped to online.
    Online,
    /// Composite signal flipped to offline.
    Offline,
    /// Raw snapshot, published for every platform callback.
    ConnectionChange(ConnectivityStatus),
}
