//! Ride booking endpoints.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

use rh_core::error::RhResult;
use rh_models::models::ride::{Place, RideStatus};

use crate::client::ApiClient;
use crate::response::ApiResponse;

/// Server-side price quote for a trip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FareEstimate {
    /// Minor currency units.
    pub amount: i64,
    pub currency: String,
    #[serde(default)]
    pub distance_km: Option<f64>,
    #[serde(default)]
    pub duration_minutes: Option<f64>,
}

/// A booked ride.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ride {
    pub id: String,
    pub status: RideStatus,
    pub pickup: Place,
    pub dropoff: Place,
    #[serde(default)]
    pub driver_id: Option<String>,
    #[serde(default)]
    pub fare: Option<i64>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl ApiClient {
    /// Ask the server to price a trip.
    pub async fn estimate_fare(&self, pickup: &Place, dropoff: &Place) -> RhResult<FareEstimate> {
        let body = json!({ "pickup": pickup, "dropoff": dropoff });
        let resp: ApiResponse<FareEstimate> = self.post_json("/rides/estimate", &body).await?;
        resp.into_data("fare estimate")
    }

    /// Book a ride over HTTP.
    pub async fn request_ride(&self, pickup: &Place, dropoff: &Place) -> RhResult<Ride> {
        let body = json!({ "pickup": pickup, "dropoff": dropoff });
        let resp: ApiResponse<Ride> = self.post_json("/rides", &body).await?;
        resp.into_data("request ride")
    }

    pub async fn ride(&self, ride_id: &str) -> RhResult<Ride> {
        let resp: ApiResponse<Ride> = self.get_json(&format!("/rides/{ride_id}")).await?;
        resp.into_data("ride")
    }

    pub async fn cancel_ride(&self, ride_id: &str, reason: Option<&str>) -> RhResult<Ride> {
        let body = json!({ "reason": reason });
        let resp: ApiResponse<Ride> = self
            .post_json(&format!("/rides/{ride_id}/cancel"), &body)
            .await?;
        resp.into_data("cancel ride")
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use rh_core::auth::MemoryTokenStore;
    use rh_models::models::ride::GeoPoint;

    use super::*;
    use crate::client::tests::{client_for, serve_once};

    fn place(lat: f64, lng: f64) -> Place {
        Place {
            point: GeoPoint::new(lat, lng),
            address: None,
        }
    }

    #[tokio::test]
    async fn test_estimate_fare() {
        let (base, server) = serve_once(
            "200 OK",
            r#"{"success":true,"data":{"amount":1250,"currency":"USD","distanceKm":4.2}}"#,
        )
        .await;
        let client = client_for(&base, Arc::new(MemoryTokenStore::with_token("t")));

        let estimate = client
            .estimate_fare(&place(1.0, 2.0), &place(3.0, 4.0))
            .await
            .unwrap();
        assert_eq!(estimate.amount, 1250);
        assert_eq!(estimate.distance_km, Some(4.2));
        assert!(estimate.duration_minutes.is_none());
        assert!(server.await.unwrap().starts_with("POST /api/rides/estimate"));
    }

    #[tokio::test]
    async fn test_cancel_ride_path() {
        let (base, server) = serve_once(
            "200 OK",
            r#"{"success":true,"data":{"id":"r-7","status":"cancelled","pickup":{"latitude":1.0,"longitude":2.0},"dropoff":{"latitude":3.0,"longitude":4.0}}}"#,
        )
        .await;
        let client = client_for(&base, Arc::new(MemoryTokenStore::with_token("t")));

        let ride = client.cancel_ride("r-7", Some("changed plans")).await.unwrap();
        assert!(ride.status.is_terminal());
        let request = server.await.unwrap();
        assert!(request.starts_with("POST /api/rides/r-7/cancel"));
        assert!(request.contains("changed plans"));
    }
}
