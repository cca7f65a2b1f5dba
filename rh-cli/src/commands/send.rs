//! Send command - open the transport, send one action, close it again.

use std::sync::Arc;

use clap::Subcommand;
use console::style;

use rh_core::config::ConfigHandle;
use rh_core::error::{RhError, RhResult};
use rh_core::platform::RuntimeTarget;
use rh_models::event_bus::EventBus;
use rh_models::models::ride::{DriverStatus, GeoPoint};
use rh_models::models::transport::TransportState;
use rh_socket::{ReconnectConfig, TransportClient, WsConnector};

#[derive(Subcommand)]
pub enum SendAction {
    /// Report the driver's position.
    Location {
        #[arg(allow_hyphen_values = true)]
        latitude: f64,
        #[arg(allow_hyphen_values = true)]
        longitude: f64,
        #[arg(long)]
        heading: Option<f64>,
    },
    /// Set driver availability (online, offline, busy).
    Status { status: String },
    /// Send a chat message on a ride.
    Chat { ride_id: String, message: String },
    /// Ask for drivers near a point.
    Nearby {
        #[arg(allow_hyphen_values = true)]
        latitude: f64,
        #[arg(allow_hyphen_values = true)]
        longitude: f64,
        #[arg(long, default_value = "5")]
        radius_km: f64,
    },
}

fn parse_status(raw: &str) -> RhResult<DriverStatus> {
    match raw.to_ascii_lowercase().as_str() {
        "online" => Ok(DriverStatus::Online),
        "offline" => Ok(DriverStatus::Offline),
        "busy" => Ok(DriverStatus::Busy),
        other => Err(RhError::Config(format!("unknown driver status: {other}"))),
    }
}

/// Run the send command.
pub async fn run(config: ConfigHandle, action: SendAction) -> RhResult<()> {
    let cfg = config.snapshot().await;
    let reconnect = ReconnectConfig::from_config(&cfg.socket);
    let handshake = reconnect.connect_timeout;
    let transport = TransportClient::new(
        Arc::new(WsConnector::from_config(&cfg.server, RuntimeTarget::current())),
        super::token_store()?,
        EventBus::new(),
        reconnect,
    );

    transport.connect().await?;
    // Allow one full open + handshake before giving up.
    if let Err(e) = transport
        .wait_for_state(TransportState::Connected, handshake * 2)
        .await
    {
        transport.disconnect().await;
        return Err(e);
    }

    let sent = match action {
        SendAction::Location {
            latitude,
            longitude,
            heading,
        } => transport.send_location(GeoPoint::new(latitude, longitude), heading),
        SendAction::Status { status } => transport.update_status(parse_status(&status)?),
        SendAction::Chat { ride_id, message } => transport.send_message(&ride_id, &message),
        SendAction::Nearby {
            latitude,
            longitude,
            radius_km,
        } => transport.get_nearby_drivers(GeoPoint::new(latitude, longitude), radius_km),
    };

    transport.disconnect().await;

    if sent {
        println!("  {} Sent.", style("OK").green().bold());
        Ok(())
    } else {
        Err(RhError::Socket("transport dropped the frame".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_status() {
        assert_eq!(parse_status("Busy").unwrap(), DriverStatus::Busy);
        assert!(parse_status("asleep").is_err());
    }
}
