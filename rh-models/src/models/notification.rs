//! In-app notification records.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Visual category of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Offline,
    Online,
    Error,
    Warning,
    Success,
    Info,
}

impl NotificationKind {
    /// Map a server-supplied severity string, defaulting to `Info`.
    pub fn from_level(level: Option<&str>) -> Self {
        match level.map(str::to_ascii_lowercase).as_deref() {
            Some("error") => Self::Error,
            Some("warning") | Some("warn") => Self::Warning,
            Some("success") => Self::Success,
            _ => Self::Info,
        }
    }
}

impl std::fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Offline => "offline",
            Self::Online => "online",
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Success => "success",
            Self::Info => "info",
        };
        write!(f, "{label}")
    }
}

/// Identifier of a visible notification; increases monotonically per queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NotificationId(pub u64);

impl std::fmt::Display for NotificationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A notification currently shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationRecord {
    pub id: NotificationId,
    pub kind: NotificationKind,
    pub message: String,
    /// Auto-dismiss delay; `None` stays until dismissed.
    pub duration_ms: Option<u64>,
    pub created_at: DateTime<Utc>,
}

impl NotificationRecord {
    /// Whether the record waits for manual dismissal.
    pub fn is_persistent(&self) -> bool {
        self.duration_ms.is_none()
    }

    /// Auto-dismiss delay as a `Duration`.
    pub fn duration(&self) -> Option<Duration> {
        self.duration_ms.map(Duration::from_millis)
    }
}

/// An application-level request to show something to the user.
///
/// Published on the bus by any component; the notification queue turns it
/// into a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppNotification {
    pub kind: NotificationKind,
    pub message: String,
    /// Overrides the queue's default duration when set.
    pub duration_ms: Option<u64>,
}

impl AppNotification {
    pub fn new(kind: NotificationKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            duration_ms: None,
        }
    }

    pub fn with_duration_ms(mut self, duration_ms: u64) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }
}
