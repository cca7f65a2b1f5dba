//! Application configuration management.
//!
//! Configuration is persisted as TOML on disk. Every field has a serde
//! default so partial files load cleanly.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::constants;
use crate::error::{RhError, RhResult};
use crate::platform::{Platform, RuntimeTarget};

/// Top-level application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// API and real-time server endpoints.
    #[serde(default)]
    pub server: ServerConfig,

    /// Real-time socket reconnect behaviour.
    #[serde(default)]
    pub socket: SocketConfig,

    /// Desktop reachability probing.
    #[serde(default)]
    pub connectivity: ConnectivityConfig,

    /// In-app notification timing.
    #[serde(default)]
    pub notifications: NotificationConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Server endpoint configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// API base URL used by native builds (e.g. "http://192.168.1.20:5000").
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// API base URL used when running in a browser. Falls back to `api_url`.
    #[serde(default)]
    pub web_api_url: String,

    /// Real-time endpoint. Derived from the API URL when empty.
    #[serde(default)]
    pub socket_url: String,

    /// HTTP request timeout in milliseconds.
    #[serde(default = "default_api_timeout")]
    pub request_timeout_ms: u64,
}

/// Socket reconnect configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SocketConfig {
    /// Delay before the first reconnect attempt; doubles per failure.
    #[serde(default = "default_reconnect_base_delay")]
    pub reconnect_base_delay_ms: u64,

    /// Consecutive failures tolerated before the client gives up.
    #[serde(default = "default_max_reconnect_attempts")]
    pub max_reconnect_attempts: u32,

    /// Per-attempt connect timeout.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_ms: u64,
}

/// Reachability probe configuration (desktop only; phones use the OS primitive).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectivityConfig {
    /// Host resolved and dialed to decide reachability.
    #[serde(default = "default_probe_host")]
    pub probe_host: String,

    /// Port dialed on the probe host.
    #[serde(default = "default_probe_port")]
    pub probe_port: u16,

    /// Interval between probes.
    #[serde(default = "default_probe_interval")]
    pub probe_interval_ms: u64,

    /// Timeout for each probe step.
    #[serde(default = "default_probe_timeout")]
    pub probe_timeout_ms: u64,
}

/// In-app notification configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationConfig {
    /// Lifetime of the "no internet" record.
    #[serde(default = "default_offline_duration")]
    pub offline_duration_ms: u64,

    /// Lifetime of the "back online" record.
    #[serde(default = "default_online_duration")]
    pub online_duration_ms: u64,

    /// Lifetime of every other record.
    #[serde(default = "default_notification_duration")]
    pub default_duration_ms: u64,

    /// Keep a non-expiring record up after the socket gives up reconnecting.
    #[serde(default = "default_true")]
    pub persist_transport_failure: bool,

    /// Mirror records to native desktop notifications.
    #[serde(default)]
    pub desktop: bool,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Directory for log files. If empty, uses default location.
    #[serde(default)]
    pub directory: String,

    /// Enable JSON structured logging output.
    #[serde(default)]
    pub json_output: bool,
}

// Default value functions for serde

fn default_api_url() -> String {
    "http://localhost:5000".to_string()
}

fn default_api_timeout() -> u64 {
    constants::DEFAULT_API_TIMEOUT_MS
}

fn default_reconnect_base_delay() -> u64 {
    constants::SOCKET_RECONNECT_BASE_DELAY_MS
}

fn default_max_reconnect_attempts() -> u32 {
    constants::SOCKET_MAX_RECONNECT_ATTEMPTS
}

fn default_connect_timeout() -> u64 {
    constants::SOCKET_CONNECT_TIMEOUT_MS
}

fn default_probe_host() -> String {
    "one.one.one.one".to_string()
}

fn default_probe_port() -> u16 {
    443
}

fn default_probe_interval() -> u64 {
    constants::PROBE_INTERVAL_MS
}

fn default_probe_timeout() -> u64 {
    constants::PROBE_TIMEOUT_MS
}

fn default_offline_duration() -> u64 {
    constants::OFFLINE_NOTIFICATION_MS
}

fn default_online_duration() -> u64 {
    constants::ONLINE_NOTIFICATION_MS
}

fn default_notification_duration() -> u64 {
    constants::DEFAULT_NOTIFICATION_MS
}

fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            web_api_url: String::new(),
            socket_url: String::new(),
            request_timeout_ms: default_api_timeout(),
        }
    }
}

impl Default for SocketConfig {
    fn default() -> Self {
        Self {
            reconnect_base_delay_ms: default_reconnect_base_delay(),
            max_reconnect_attempts: default_max_reconnect_attempts(),
            connect_timeout_ms: default_connect_timeout(),
        }
    }
}

impl Default for ConnectivityConfig {
    fn default() -> Self {
        Self {
            probe_host: default_probe_host(),
            probe_port: default_probe_port(),
            probe_interval_ms: default_probe_interval(),
            probe_timeout_ms: default_probe_timeout(),
        }
    }
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            offline_duration_ms: default_offline_duration(),
            online_duration_ms: default_online_duration(),
            default_duration_ms: default_notification_duration(),
            persist_transport_failure: true,
            desktop: false,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            directory: String::new(),
            json_output: false,
        }
    }
}

impl ServerConfig {
    /// API base URL for the given runtime target, without trailing slash.
    pub fn api_base_url(&self, target: RuntimeTarget) -> String {
        let raw = match target {
            RuntimeTarget::Web if !self.web_api_url.trim().is_empty() => &self.web_api_url,
            _ => &self.api_url,
        };
        AppConfig::sanitize_url(raw)
    }

    /// Real-time endpoint URL (`ws://` or `wss://`).
    ///
    /// Uses `socket_url` if set, otherwise swaps the API URL's scheme.
    pub fn socket_endpoint(&self, target: RuntimeTarget) -> String {
        let base = if self.socket_url.trim().is_empty() {
            self.api_base_url(target)
        } else {
            AppConfig::sanitize_url(&self.socket_url)
        };

        if let Some(rest) = base.strip_prefix("https://") {
            format!("wss://{rest}")
        } else if let Some(rest) = base.strip_prefix("http://") {
            format!("ws://{rest}")
        } else {
            base
        }
    }

    /// HTTP request timeout.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

impl AppConfig {
    /// Load configuration from the default config file path.
    pub fn load_default() -> RhResult<Self> {
        let path = Self::default_config_path()?;
        if path.exists() {
            Self::load_from_file(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific file path.
    pub fn load_from_file(path: &Path) -> RhResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a specific file path.
    pub fn save_to_file(&self, path: &Path) -> RhResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = toml::to_string_pretty(self)
            .map_err(|e| RhError::Config(format!("failed to serialize config: {e}")))?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> RhResult<PathBuf> {
        Ok(Platform::config_dir()?.join("config.toml"))
    }

    /// Get the effective log directory, using the configured path or the default.
    pub fn effective_log_dir(&self) -> RhResult<PathBuf> {
        if self.logging.directory.is_empty() {
            Ok(Platform::data_dir()?.join("logs"))
        } else {
            Ok(PathBuf::from(&self.logging.directory))
        }
    }

    /// Reject values that would make the client misbehave.
    pub fn validate(&self) -> RhResult<()> {
        if self.server.api_url.trim().is_empty() {
            return Err(RhError::MissingConfig("server.api_url".into()));
        }
        if self.socket.reconnect_base_delay_ms == 0 {
            return Err(RhError::Config(
                "socket.reconnect_base_delay_ms must be positive".into(),
            ));
        }
        if self.socket.connect_timeout_ms == 0 {
            return Err(RhError::Config(
                "socket.connect_timeout_ms must be positive".into(),
            ));
        }
        if self.connectivity.probe_interval_ms == 0 {
            return Err(RhError::Config(
                "connectivity.probe_interval_ms must be positive".into(),
            ));
        }
        if self.connectivity.probe_timeout_ms == 0 {
            return Err(RhError::Config(
                "connectivity.probe_timeout_ms must be positive".into(),
            ));
        }
        Ok(())
    }

    /// Normalize a URL: trims quotes and whitespace, adds a scheme,
    /// strips trailing slashes.
    pub fn sanitize_url(address: &str) -> String {
        let trimmed = address.trim().trim_matches('"').trim();
        if trimmed.is_empty() {
            return String::new();
        }

        let with_scheme = if trimmed.contains("://") {
            trimmed.to_string()
        } else {
            format!("http://{trimmed}")
        };

        with_scheme.trim_end_matches('/').to_string()
    }
}

/// Thread-safe configuration holder for shared access across services.
#[derive(Clone)]
pub struct ConfigHandle {
    inner: Arc<RwLock<AppConfig>>,
}

impl ConfigHandle {
    /// Create a new configuration handle.
    pub fn new(config: AppConfig) -> Self {
        Self {
            inner: Arc::new(RwLock::new(config)),
        }
    }

    /// Read the configuration.
    pub async fn read(&self) -> tokio::sync::RwLockReadGuard<'_, AppConfig> {
        self.inner.read().await
    }

    /// Write/update the configuration.
    pub async fn write(&self) -> tokio::sync::RwLockWriteGuard<'_, AppConfig> {
        self.inner.write().await
    }

    /// Clone out the current configuration.
    pub async fn snapshot(&self) -> AppConfig {
        self.inner.read().await.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.socket.reconnect_base_delay_ms, 1_000);
        assert_eq!(config.socket.max_reconnect_attempts, 5);
        assert_eq!(config.socket.connect_timeout_ms, 10_000);
        assert_eq!(config.notifications.offline_duration_ms, 3_000);
        assert_eq!(config.notifications.online_duration_ms, 2_000);
        assert_eq!(config.notifications.default_duration_ms, 5_000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_sanitize_url() {
        assert_eq!(
            AppConfig::sanitize_url("  \"https://api.example.com/\"  "),
            "https://api.example.com"
        );
        assert_eq!(
            AppConfig::sanitize_url("192.168.1.5:5000"),
            "http://192.168.1.5:5000"
        );
        assert_eq!(AppConfig::sanitize_url("   "), "");
    }

    #[test]
    fn test_web_vs_native_base_url() {
        let server = ServerConfig {
            api_url: "http://192.168.1.20:5000/".into(),
            web_api_url: "https://api.example.com".into(),
            ..ServerConfig::default()
        };
        assert_eq!(
            server.api_base_url(RuntimeTarget::Native),
            "http://192.168.1.20:5000"
        );
        assert_eq!(
            server.api_base_url(RuntimeTarget::Web),
            "https://api.example.com"
        );

        let native_only = ServerConfig::default();
        assert_eq!(
            native_only.api_base_url(RuntimeTarget::Web),
            native_only.api_base_url(RuntimeTarget::Native)
        );
    }

    #[test]
    fn test_socket_endpoint_derivation() {
        let server = ServerConfig {
            api_url: "https://api.example.com".into(),
            ..ServerConfig::default()
        };
        assert_eq!(
            server.socket_endpoint(RuntimeTarget::Native),
            "wss://api.example.com"
        );

        let explicit = ServerConfig {
            socket_url: "ws://rt.example.com:9000/".into(),
            ..ServerConfig::default()
        };
        assert_eq!(
            explicit.socket_endpoint(RuntimeTarget::Native),
            "ws://rt.example.com:9000"
        );
    }

    #[test]
    fn test_validate_rejects_zero_backoff() {
        let mut config = AppConfig::default();
        config.socket.reconnect_base_delay_ms = 0;
        assert!(matches!(config.validate(), Err(RhError::Config(_))));
    }

    #[test]
    fn test_validate_rejects_zero_probe_timing() {
        let mut config = AppConfig::default();
        config.connectivity.probe_interval_ms = 0;
        assert!(matches!(config.validate(), Err(RhError::Config(_))));

        let mut config = AppConfig::default();
        config.connectivity.probe_timeout_ms = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("probe_timeout_ms"));
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
            [server]
            api_url = "https://api.example.com"

            [socket]
            max_reconnect_attempts = 3
            "#,
        )
        .unwrap();
        assert_eq!(config.server.api_url, "https://api.example.com");
        assert_eq!(config.socket.max_reconnect_attempts, 3);
        assert_eq!(config.socket.reconnect_base_delay_ms, 1_000);
        assert!(config.notifications.persist_transport_failure);
    }

    #[test]
    fn test_save_and_load_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let mut config = AppConfig::default();
        config.notifications.desktop = true;
        config.save_to_file(&path).unwrap();

        let loaded = AppConfig::load_from_file(&path).unwrap();
        assert!(loaded.notifications.desktop);
    }
}
