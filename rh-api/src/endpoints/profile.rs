//! Profile endpoints.

use serde_json::json;
use tracing::info;

use rh_core::error::RhResult;
use rh_models::models::ride::UserRole;

use crate::client::ApiClient;
use crate::endpoints::auth::User;
use crate::response::ApiResponse;

impl ApiClient {
    /// Switch between rider and driver mode.
    pub async fn switch_role(&self, role: UserRole) -> RhResult<User> {
        let resp: ApiResponse<User> = self.post_json("/users/role", &json!({ "role": role })).await?;
        let user = resp.into_data("switch role")?;
        info!("acting as {}", user.role);
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use rh_core::auth::MemoryTokenStore;

    use super::*;
    use crate::client::tests::{client_for, serve_once};

    #[tokio::test]
    async fn test_switch_role_sends_lowercase_role() {
        let (base, server) = serve_once(
            "200 OK",
            r#"{"success":true,"data":{"id":"u1","name":"Ada","email":"a@b.c","role":"rider"}}"#,
        )
        .await;
        let client = client_for(&base, Arc::new(MemoryTokenStore::with_token("t")));

        let user = client.switch_role(UserRole::Rider).await.unwrap();
        assert_eq!(user.role, UserRole::Rider);
        assert!(server.await.unwrap().contains(r#"{"role":"rider"}"#));
    }
}
