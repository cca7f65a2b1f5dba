//! Application-wide constants.

/// Application name.
pub const APP_NAME: &str = "Ridehail";

/// Application version.
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// REST API path prefix appended to the configured base URL.
pub const API_PREFIX: &str = "/api";

/// Default HTTP request timeout in milliseconds.
pub const DEFAULT_API_TIMEOUT_MS: u64 = 30_000;

/// Base delay for the first socket reconnect attempt.
pub const SOCKET_RECONNECT_BASE_DELAY_MS: u64 = 1_000;

/// Consecutive reconnect failures tolerated before giving up.
pub const SOCKET_MAX_RECONNECT_ATTEMPTS: u32 = 5;

/// Time allowed for a single socket connect attempt.
pub const SOCKET_CONNECT_TIMEOUT_MS: u64 = 10_000;

/// How long `disconnect` waits for queued frames to be written out.
pub const SOCKET_FLUSH_TIMEOUT_MS: u64 = 2_000;

/// How long the "no internet" banner stays up.
pub const OFFLINE_NOTIFICATION_MS: u64 = 3_000;

/// How long the "back online" banner stays up.
pub const ONLINE_NOTIFICATION_MS: u64 = 2_000;

/// Default lifetime of any other notification.
pub const DEFAULT_NOTIFICATION_MS: u64 = 5_000;

/// Interval between reachability probes on desktop.
pub const PROBE_INTERVAL_MS: u64 = 5_000;

/// Timeout for a single reachability probe.
pub const PROBE_TIMEOUT_MS: u64 = 3_000;

/// Inbound real-time event names.
pub mod inbound {
    pub const CONNECT: &str = "connect";
    pub const DISCONNECT: &str = "disconnect";
    pub const CONNECTED: &str = "connected";
    pub const ERROR: &str = "error";
    pub const CONNECT_ERROR: &str = "connect_error";
    pub const DRIVER_LOCATION_UPDATE: &str = "driver:location:update";
    pub const DRIVER_STATUS_UPDATE: &str = "driver:status:update";
    pub const RIDE_REQUEST_NEW: &str = "ride:request:new";
    pub const RIDE_ACCEPTED: &str = "ride:accepted";
    pub const RIDE_STATUS_UPDATE: &str = "ride:status:update";
    pub const CHAT_MESSAGE_NEW: &str = "chat:message:new";
    pub const NOTIFICATION_NEW: &str = "notification:new";
    pub const EMERGENCY_ALERT_NEW: &str = "emergency:alert:new";
    pub const ANNOUNCEMENT_NEW: &str = "announcement:new";
}

/// Outbound real-time event names.
pub mod outbound {
    pub const DRIVER_LOCATION: &str = "driver:location";
    pub const DRIVER_STATUS: &str = "driver:status";
    pub const RIDE_ACCEPT: &str = "ride:accept";
    pub const RIDE_REQUEST: &str = "ride:request";
    pub const RIDE_STATUS: &str = "ride:status";
    pub const CHAT_MESSAGE: &str = "chat:message";
    pub const EMERGENCY_ALERT: &str = "emergency:alert";
    pub const DRIVERS_NEARBY: &str = "drivers:nearby";

    /// All outbound names, in declaration order.
    pub const ALL: &[&str] = &[
        DRIVER_LOCATION,
        DRIVER_STATUS,
        RIDE_ACCEPT,
        RIDE_REQUEST,
        RIDE_STATUS,
        CHAT_MESSAGE,
        EMERGENCY_ALERT,
        DRIVERS_NEARBY,
    ];
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_constants() {
        assert_eq!(SOCKET_RECONNECT_BASE_DELAY_MS, 1_000);
        assert_eq!(SOCKET_MAX_RECONNECT_ATTEMPTS, 5);
    }

    #[test]
    fn test_outbound_names_unique() {
        let mut names = outbound::ALL.to_vec();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), outbound::ALL.len());
    }
}
