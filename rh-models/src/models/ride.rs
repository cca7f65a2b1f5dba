//! Ride, driver, chat and safety payloads exchanged over the real-time channel.
//!
//! Field names follow the server's camelCase JSON. Optional fields are
//! optional because the server omits them, not because we tolerate junk:
//! a payload missing a required field fails to parse and is dropped.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A WGS84 coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    /// Whether the coordinate lies on the globe.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}

/// A named pickup or drop-off point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Place {
    #[serde(flatten)]
    pub point: GeoPoint,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

/// Which side of the marketplace the user is acting as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Rider,
    Driver,
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Rider => write!(f, "rider"),
            Self::Driver => write!(f, "driver"),
        }
    }
}

/// Driver availability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DriverStatus {
    Online,
    Offline,
    Busy,
    #[serde(other)]
    Unknown,
}

/// Ride lifecycle as reported by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RideStatus {
    Requested,
    Accepted,
    Arriving,
    Arrived,
    InProgress,
    Completed,
    Cancelled,
    #[serde(other)]
    Unknown,
}

impl RideStatus {
    /// Whether the ride can no longer change.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }
}

// ---- Inbound payloads ----

/// `driver:location:update`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriverLocation {
    pub driver_id: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub heading: Option<f64>,
    #[serde(default)]
    pub speed: Option<f64>,
    #[serde(default)]
    pub ride_id: Option<String>,
}

/// `driver:status:update`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriverStatusUpdate {
    pub driver_id: String,
    pub status: DriverStatus,
}

/// `ride:request:new` (delivered to drivers)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RideRequest {
    pub ride_id: String,
    #[serde(default)]
    pub rider_id: Option<String>,
    pub pickup: Place,
    pub dropoff: Place,
    /// Fare as computed by the server, in minor currency units.
    #[serde(default)]
    pub fare: Option<i64>,
    #[serde(default)]
    pub currency: Option<String>,
}

/// `ride:accepted` (delivered to the rider)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RideAccepted {
    pub ride_id: String,
    pub driver_id: String,
    #[serde(default)]
    pub eta_seconds: Option<u32>,
}

/// `ride:status:update`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RideStatusUpdate {
    pub ride_id: String,
    pub status: RideStatus,
}

/// `chat:message:new`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub ride_id: String,
    pub sender_id: String,
    pub message: String,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

/// `notification:new`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerNotification {
    #[serde(default)]
    pub title: Option<String>,
    pub message: String,
    /// Severity as sent by the server ("info", "warning", ...).
    #[serde(default, rename = "type")]
    pub level: Option<String>,
}

/// `emergency:alert:new`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmergencyAlert {
    pub user_id: String,
    #[serde(default)]
    pub ride_id: Option<String>,
    #[serde(default)]
    pub location: Option<GeoPoint>,
    #[serde(default)]
    pub message: Option<String>,
}

/// `announcement:new`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Announcement {
    #[serde(default)]
    pub title: Option<String>,
    pub message: String,
}

// ---- Outbound payloads ----

/// `driver:location`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocationReport {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub heading: Option<f64>,
}

/// `driver:status`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusReport {
    pub status: DriverStatus,
}

/// `ride:accept`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AcceptRide {
    pub ride_id: String,
}

/// `ride:request`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewRideRequest {
    pub pickup: Place,
    pub dropoff: Place,
}

/// `ride:status`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RideStatusReport {
    pub ride_id: String,
    pub status: RideStatus,
}

/// `chat:message`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutgoingChatMessage {
    pub ride_id: String,
    pub message: String,
    /// Client-generated id so the server can dedupe resends.
    pub client_id: String,
}

/// `emergency:alert`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmergencyAlertReport {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ride_id: Option<String>,
    pub location: GeoPoint,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// `drivers:nearby`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NearbyDriversQuery {
    pub latitude: f64,
    pub longitude: f64,
    pub radius_km: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_geo_point_validity() {
        assert!(GeoPoint::new(40.7, -74.0).is_valid());
        assert!(!GeoPoint::new(91.0, 0.0).is_valid());
        assert!(!GeoPoint::new(0.0, f64::NAN).is_valid());
    }

    #[test]
    fn test_ride_request_parses_flattened_places() {
        let json = serde_json::json!({
            "rideId": "r-1",
            "pickup": {"latitude": 1.0, "longitude": 2.0, "address": "Main St"},
            "dropoff": {"latitude": 3.0, "longitude": 4.0},
            "fare": 1250,
        });
        let req: RideRequest = serde_json::from_value(json).unwrap();
        assert_eq!(req.pickup.address.as_deref(), Some("Main St"));
        assert_eq!(req.dropoff.point, GeoPoint::new(3.0, 4.0));
        assert_eq!(req.fare, Some(1250));
    }

    #[test]
    fn test_unknown_status_values_are_tolerated() {
        let update: RideStatusUpdate =
            serde_json::from_value(serde_json::json!({"rideId": "r", "status": "teleporting"}))
                .unwrap();
        assert_eq!(update.status, RideStatus::Unknown);

        let update: RideStatusUpdate =
            serde_json::from_value(serde_json::json!({"rideId": "r", "status": "in_progress"}))
                .unwrap();
        assert_eq!(update.status, RideStatus::InProgress);
        assert!(!update.status.is_terminal());
        assert!(RideStatus::Cancelled.is_terminal());
    }

    #[test]
    fn test_missing_required_field_fails() {
        let result: Result<DriverLocation, _> =
            serde_json::from_value(serde_json::json!({"latitude": 1.0, "longitude": 2.0}));
        assert!(result.is_err());
    }

    #[test]
    fn test_outbound_shapes() {
        let report = LocationReport {
            latitude: 1.5,
            longitude: 2.5,
            heading: None,
        };
        assert_eq!(
            serde_json::to_value(&report).unwrap(),
            serde_json::json!({"latitude": 1.5, "longitude": 2.5})
        );

        let query = NearbyDriversQuery {
            latitude: 0.0,
            longitude: 0.0,
            radius_km: 5.0,
        };
        assert_eq!(serde_json::to_value(&query).unwrap()["radiusKm"], 5.0);
    }
}
