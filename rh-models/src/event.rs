//! The closed set of events carried by the bus.
//!
//! Every event has exactly one `EventKind`, which is what subscribers
//! register for. Payloads are fully typed; server payloads are checked
//! when they are parsed, before anything is published.

use rh_core::constants::inbound;
use rh_core::error::{RhError, RhResult};
use serde::de::DeserializeOwned;

use crate::models::connectivity::ConnectivityEvent;
use crate::models::notification::AppNotification;
use crate::models::ride::{
    Announcement, ChatMessage, DriverLocation, DriverStatusUpdate, EmergencyAlert, RideAccepted,
    RideRequest, RideStatusUpdate, ServerNotification,
};
use crate::models::transport::TransportEvent;

/// Typed inbound server events.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerEvent {
    DriverLocationUpdate(DriverLocation),
    DriverStatusUpdate(DriverStatusUpdate),
    RideRequestNew(RideRequest),
    RideAccepted(RideAccepted),
    RideStatusUpdate(RideStatusUpdate),
    ChatMessageNew(ChatMessage),
    NotificationNew(ServerNotification),
    EmergencyAlertNew(EmergencyAlert),
    AnnouncementNew(Announcement),
}

impl ServerEvent {
    /// Parse an inbound frame into a typed event.
    ///
    /// Returns `Ok(None)` for names that are not application events
    /// (lifecycle frames or names this client does not know).
    pub fn parse(name: &str, data: serde_json::Value) -> RhResult<Option<Self>> {
        let event = match name {
            inbound::DRIVER_LOCATION_UPDATE => Self::DriverLocationUpdate(payload(name, data)?),
            inbound::DRIVER_STATUS_UPDATE => Self::DriverStatusUpdate(payload(name, data)?),
            inbound::RIDE_REQUEST_NEW => Self::RideRequestNew(payload(name, data)?),
            inbound::RIDE_ACCEPTED => Self::RideAccepted(payload(name, data)?),
            inbound::RIDE_STATUS_UPDATE => Self::RideStatusUpdate(payload(name, data)?),
            inbound::CHAT_MESSAGE_NEW => Self::ChatMessageNew(payload(name, data)?),
            inbound::NOTIFICATION_NEW => Self::NotificationNew(payload(name, data)?),
            inbound::EMERGENCY_ALERT_NEW => Self::EmergencyAlertNew(payload(name, data)?),
            inbound::ANNOUNCEMENT_NEW => Self::AnnouncementNew(payload(name, data)?),
            _ => return Ok(None),
        };
        Ok(Some(event))
    }

    /// The wire name this event arrived under.
    pub fn name(&self) -> &'static str {
        self.kind().as_str()
    }

    /// Subscription key for this event.
    pub fn kind(&self) -> EventKind {
        match self {
            Self::DriverLocationUpdate(_) => EventKind::DriverLocationUpdate,
            Self::DriverStatusUpdate(_) => EventKind::DriverStatusUpdate,
            Self::RideRequestNew(_) => EventKind::RideRequestNew,
            Self::RideAccepted(_) => EventKind::RideAccepted,
            Self::RideStatusUpdate(_) => EventKind::RideStatusUpdate,
            Self::ChatMessageNew(_) => EventKind::ChatMessageNew,
            Self::NotificationNew(_) => EventKind::NotificationNew,
            Self::EmergencyAlertNew(_) => EventKind::EmergencyAlertNew,
            Self::AnnouncementNew(_) => EventKind::AnnouncementNew,
        }
    }
}

fn payload<T: DeserializeOwned>(name: &str, data: serde_json::Value) -> RhResult<T> {
    serde_json::from_value(data).map_err(|e| RhError::InvalidPayload {
        event: name.to_string(),
        reason: e.to_string(),
    })
}

/// Everything that flows through the bus.
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    Connectivity(ConnectivityEvent),
    Transport(TransportEvent),
    Server(ServerEvent),
    Notify(AppNotification),
}

impl AppEvent {
    /// Subscription key for this event.
    pub fn kind(&self) -> EventKind {
        match self {
            Self::Connectivity(event) => match event {
                ConnectivityEvent::Connected => EventKind::Connected,
                ConnectivityEvent::Disconnected => EventKind::Disconnected,
                ConnectivityEvent::InternetReachable => EventKind::InternetReachable,
                ConnectivityEvent::InternetUnreachable => EventKind::InternetUnreachable,
                ConnectivityEvent::Online => EventKind::Online,
                ConnectivityEvent::Offline => EventKind::Offline,
                ConnectivityEvent::ConnectionChange(_) => EventKind::ConnectionChange,
            },
            Self::Transport(event) => match event {
                TransportEvent::StateChanged(_) => EventKind::TransportStateChanged,
                TransportEvent::Authenticated => EventKind::TransportAuthenticated,
                TransportEvent::ReconnectScheduled { .. } => EventKind::TransportReconnectScheduled,
                TransportEvent::Failed { .. } => EventKind::TransportFailed,
                TransportEvent::AuthRequired { .. } => EventKind::TransportAuthRequired,
                TransportEvent::Error { .. } => EventKind::TransportError,
            },
            Self::Server(event) => event.kind(),
            Self::Notify(_) => EventKind::AppNotification,
        }
    }
}

/// Subscription keys, one per `AppEvent` shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EventKind {
    // Connectivity
    Connected,
    Disconnected,
    InternetReachable,
    InternetUnreachable,
    Online,
    Offline,
    ConnectionChange,
    // Transport lifecycle
    TransportStateChanged,
    TransportAuthenticated,
    TransportReconnectScheduled,
    TransportFailed,
    TransportAuthRequired,
    TransportError,
    // Server
    DriverLocationUpdate,
    DriverStatusUpdate,
    RideRequestNew,
    RideAccepted,
    RideStatusUpdate,
    ChatMessageNew,
    NotificationNew,
    EmergencyAlertNew,
    AnnouncementNew,
    // Application
    AppNotification,
}

impl EventKind {
    /// Every kind, in declaration order.
    pub const ALL: &'static [EventKind] = &[
        Self::Connected,
        Self::Disconnected,
        Self::InternetReachable,
        Self::InternetUnreachable,
        Self::Online,
        Self::Offline,
        Self::ConnectionChange,
        Self::TransportStateChanged,
        Self::TransportAuthenticated,
        Self::TransportReconnectScheduled,
        Self::TransportFailed,
        Self::TransportAuthRequired,
        Self::TransportError,
        Self::DriverLocationUpdate,
        Self::DriverStatusUpdate,
        Self::RideRequestNew,
        Self::RideAccepted,
        Self::RideStatusUpdate,
        Self::ChatMessageNew,
        Self::NotificationNew,
        Self::EmergencyAlertNew,
        Self::AnnouncementNew,
        Self::AppNotification,
    ];

    /// Stable event name, matching the wire name for server events.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Connected => "connected",
            Self::Disconnected => "disconnected",
            Self::InternetReachable => "internetReachable",
            Self::InternetUnreachable => "internetUnreachable",
            Self::Online => "online",
            Self::Offline => "offline",
            Self::ConnectionChange => "connectionChange",
            Self::TransportStateChanged => "transport:state",
            Self::TransportAuthenticated => "transport:authenticated",
            Self::TransportReconnectScheduled => "transport:reconnect",
            Self::TransportFailed => "transport:failed",
            Self::TransportAuthRequired => "transport:auth_required",
            Self::TransportError => "transport:error",
            Self::DriverLocationUpdate => inbound::DRIVER_LOCATION_UPDATE,
            Self::DriverStatusUpdate => inbound::DRIVER_STATUS_UPDATE,
            Self::RideRequestNew => inbound::RIDE_REQUEST_NEW,
            Self::RideAccepted => inbound::RIDE_ACCEPTED,
            Self::RideStatusUpdate => inbound::RIDE_STATUS_UPDATE,
            Self::ChatMessageNew => inbound::CHAT_MESSAGE_NEW,
            Self::NotificationNew => inbound::NOTIFICATION_NEW,
            Self::EmergencyAlertNew => inbound::EMERGENCY_ALERT_NEW,
            Self::AnnouncementNew => inbound::ANNOUNCEMENT_NEW,
            Self::AppNotification => "notification",
        }
    }

    /// Kinds produced by inbound server frames.
    pub fn is_server_event(&self) -> bool {
        matches!(
            self,
            Self::DriverLocationUpdate
                | Self::DriverStatusUpdate
                | Self::RideRequestNew
                | Self::RideAccepted
                | Self::RideStatusUpdate
                | Self::ChatMessageNew
                | Self::NotificationNew
                | Self::EmergencyAlertNew
                | Self::AnnouncementNew
        )
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ride::RideStatus;

    #[test]
    fn test_parse_typed_server_event() {
        let event = ServerEvent::parse(
            "ride:status:update",
            serde_json::json!({"rideId": "ride-9", "status": "arrived"}),
        )
        .unwrap()
        .unwrap();

        match &event {
            ServerEvent::RideStatusUpdate(update) => {
                assert_eq!(update.ride_id, "ride-9");
                assert_eq!(update.status, RideStatus::Arrived);
            }
            other => panic!("unexpected event: {other:?}"),
        }
        assert_eq!(event.name(), "ride:status:update");
    }

    #[test]
    fn test_parse_rejects_malformed_payload() {
        let err = ServerEvent::parse("ride:accepted", serde_json::json!({"rideId": 5}))
            .unwrap_err();
        match err {
            RhError::InvalidPayload { event, .. } => assert_eq!(event, "ride:accepted"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_parse_ignores_lifecycle_and_unknown_names() {
        for name in ["connect", "connected", "disconnect", "something:else"] {
            assert!(ServerEvent::parse(name, serde_json::Value::Null)
                .unwrap()
                .is_none());
        }
    }

    #[test]
    fn test_every_server_kind_round_trips_through_parse_name() {
        for kind in EventKind::ALL.iter().filter(|k| k.is_server_event()) {
            // Name lookups must stay in sync with the parser's match arms.
            let result = ServerEvent::parse(kind.as_str(), serde_json::json!({}));
            assert!(
                !matches!(result, Ok(None)),
                "{kind} is not recognised by ServerEvent::parse"
            );
        }
    }

    #[test]
    fn test_app_event_kinds() {
        assert_eq!(
            AppEvent::Connectivity(ConnectivityEvent::Offline).kind(),
            EventKind::Offline
        );
        assert_eq!(
            AppEvent::Transport(TransportEvent::Failed { attempts: 5 }).kind(),
            EventKind::TransportFailed
        );
        assert_eq!(EventKind::ConnectionChange.to_string(), "connectionChange");
    }

    #[test]
    fn test_kind_names_unique() {
        let mut names: Vec<_> = EventKind::ALL.iter().map(EventKind::as_str).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), EventKind::ALL.len());
    }
}
