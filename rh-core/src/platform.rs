//! Platform detection and OS-specific utilities.

use std::path::PathBuf;
use crate::error::{RhError, RhResult};

/// Detected operating system platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Windows,
    MacOs,
    Linux,
    Android,
    Ios,
}

impl Platform {
    /// Detect the current platform at compile time.
    pub fn current() -> Self {
        if cfg!(target_os = "windows") {
            Platform::Windows
        } else if cfg!(target_os = "macos") {
            Platform::MacOs
        } else if cfg!(target_os = "android") {
            Platform::Android
        } else if cfg!(target_os = "ios") {
            Platform::Ios
        } else {
            Platform::Linux
        }
    }

    /// Whether this is a phone platform with cellular radios.
    pub fn is_mobile(&self) -> bool {
        matches!(self, Platform::Android | Platform::Ios)
    }

    /// Get the platform-specific application data directory.
    pub fn data_dir() -> RhResult<PathBuf> {
        let base = dirs::data_dir()
            .ok_or_else(|| RhError::Config("could not determine data directory".into()))?;
        Ok(base.join("Ridehail"))
    }

    /// Get the platform-specific configuration directory.
    pub fn config_dir() -> RhResult<PathBuf> {
        let base = dirs::config_dir()
            .ok_or_else(|| RhError::Config("could not determine config directory".into()))?;
        Ok(base.join("Ridehail"))
    }

    /// Get a human-readable platform name.
    pub fn name(&self) -> &'static str {
        match self {
            Platform::Windows => "Windows",
            Platform::MacOs => "macOS",
            Platform::Linux => "Linux",
            Platform::Android => "Android",
            Platform::Ios => "iOS",
        }
    }

    /// Device name reported to the real-time server.
    pub fn device_name() -> String {
        hostname::get()
            .ok()
            .and_then(|h| h.into_string().ok())
            .unwrap_or_else(|| "ridehail-client".to_string())
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Where the client is running, which decides the API base URL.
///
/// Browsers reach the API through a different origin than native builds
/// (which often talk to a LAN address during development).
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeTarget {
    Native,
    Web,
}

impl RuntimeTarget {
    /// Detect the runtime target at compile time.
    pub fn current() -> Self {
        if cfg!(target_arch = "wasm32") {
            RuntimeTarget::Web
        } else {
            RuntimeTarget::Native
        }
    }
}
