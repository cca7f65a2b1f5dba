//! Payment endpoints. Only cash settlement is handled client-side.

use serde::{Deserialize, Serialize};
use serde_json::json;

use rh_core::error::RhResult;

use crate::client::ApiClient;
use crate::response::ApiResponse;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub id: String,
    pub ride_id: String,
    /// Minor currency units.
    pub amount: i64,
    pub method: String,
    pub status: String,
}

impl ApiClient {
    /// Driver confirms that the rider paid in cash.
    pub async fn confirm_cash_payment(&self, ride_id: &str) -> RhResult<Payment> {
        let resp: ApiResponse<Payment> = self
            .post_json(&format!("/payments/{ride_id}/cash/confirm"), &json!({}))
            .await?;
        resp.into_data("confirm cash payment")
    }
}
