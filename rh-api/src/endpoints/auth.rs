//! Session endpoints.
//!
//! `login` is the only place a token enters the token store; `logout`
//! is the only place one leaves it.

use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};

use rh_core::error::RhResult;
use rh_models::models::ride::UserRole;

use crate::client::ApiClient;
use crate::response::ApiResponse;

/// The signed-in account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    pub role: UserRole,
}

#[derive(Debug, Deserialize)]
struct LoginData {
    token: String,
    user: User,
}

impl ApiClient {
    /// Exchange credentials for a bearer token and store it.
    pub async fn login(&self, email: &str, password: &str) -> RhResult<User> {
        let body = json!({ "email": email, "password": password });
        let resp: ApiResponse<LoginData> = self.post_json("/auth/login", &body).await?;
        let data = resp.into_data("login")?;
        self.tokens().set_token(Some(data.token))?;
        info!("logged in as {} ({})", data.user.email, data.user.role);
        Ok(data.user)
    }

    /// End the session. The local token is cleared even if the server call fails.
    pub async fn logout(&self) -> RhResult<()> {
        let result = self.post("/auth/logout", &json!({})).await;
        self.tokens().set_token(None)?;
        match result {
            Ok(_) => {
                info!("logged out");
                Ok(())
            }
            Err(e) => {
                warn!("server logout failed, local session cleared anyway: {e}");
                Err(e)
            }
        }
    }

    /// Fetch the account behind the current token.
    pub async fn current_user(&self) -> RhResult<User> {
        let resp: ApiResponse<User> = self.get_json("/auth/me").await?;
        resp.into_data("current user")
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use rh_core::auth::{MemoryTokenStore, TokenStore};

    use super::*;
    use crate::client::tests::{client_for, serve_once};

    #[tokio::test]
    async fn test_login_stores_token() {
        let (base, server) = serve_once(
            "200 OK",
            r#"{"success":true,"data":{"token":"jwt-9","user":{"id":"u1","name":"Ada","email":"ada@example.com","role":"driver"}}}"#,
        )
        .await;
        let tokens = Arc::new(MemoryTokenStore::new());
        let client = client_for(&base, tokens.clone());

        let user = client.login("ada@example.com", "secret").await.unwrap();
        assert_eq!(user.role, UserRole::Driver);
        assert_eq!(tokens.token().as_deref(), Some("jwt-9"));

        let request = server.await.unwrap();
        assert!(request.starts_with("POST /api/auth/login"));
        assert!(request.contains(r#""email":"ada@example.com""#));
    }

    #[tokio::test]
    async fn test_failed_login_keeps_store_empty() {
        let (base, _server) =
            serve_once("200 OK", r#"{"success":false,"message":"Invalid credentials"}"#).await;
        let tokens = Arc::new(MemoryTokenStore::new());
        let client = client_for(&base, tokens.clone());

        let err = client.login("ada@example.com", "wrong").await.unwrap_err();
        assert!(err.to_string().contains("Invalid credentials"));
        assert!(tokens.token().is_none());
    }

    #[tokio::test]
    async fn test_logout_clears_token_even_on_server_error() {
        let (base, _server) = serve_once("503 Service Unavailable", "down").await;
        let tokens = Arc::new(MemoryTokenStore::with_token("jwt-9"));
        let client = client_for(&base, tokens.clone());

        assert!(client.logout().await.is_err());
        assert!(tokens.token().is_none());
    }
}
