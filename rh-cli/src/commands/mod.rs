//! CLI command implementations.

pub mod config;
pub mod connect;
pub mod login;
pub mod logout;
pub mod send;
pub mod status;

use std::sync::Arc;

use rh_api::ApiClient;
use rh_core::auth::{FileTokenStore, TokenStore};
use rh_core::config::ConfigHandle;
use rh_core::error::{RhError, RhResult};
use rh_core::platform::RuntimeTarget;

/// Token store shared by every command (persists between invocations).
pub fn token_store() -> RhResult<Arc<dyn TokenStore>> {
    Ok(Arc::new(FileTokenStore::open_default()?))
}

/// Helper to create an API client from config.
pub async fn create_api_client(
    config: &ConfigHandle,
    tokens: Arc<dyn TokenStore>,
) -> RhResult<ApiClient> {
    let server_config = config.read().await.server.clone();
    ApiClient::new(&server_config, RuntimeTarget::current(), tokens)
}

/// Map a dialoguer failure onto our error type.
pub fn prompt_error(e: dialoguer::Error) -> RhError {
    RhError::Internal(format!("prompt failed: {e}"))
}

/// Truncate a string to a maximum number of characters, appending an ellipsis.
pub fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len > 3 {
        let kept: String = s.chars().take(max_len - 3).collect();
        format!("{kept}...")
    } else {
        s.chars().take(max_len).collect()
    }
}
