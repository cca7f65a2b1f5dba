//! Ridehail Core - Foundation types, error handling, configuration, and logging.
//!
//! This crate provides the shared foundation used by all other Ridehail crates:
//! - Application configuration (API and socket endpoints, backoff, notification timing)
//! - Global error types covering all error categories
//! - Structured logging with tracing
//! - Platform and runtime-target detection
//! - The externally-owned auth token store
//! - Common constants

pub mod auth;
pub mod config;
pub mod error;
pub mod logging;
pub mod platform;
pub mod constants;

// Re-export commonly used items at the crate root
pub use auth::{FileTokenStore, MemoryTokenStore, TokenStore};
pub use config::AppConfig;
pub use error::{RhError, RhResult};
pub use logging::init_logging;
pub use platform::{Platform, RuntimeTarget};
