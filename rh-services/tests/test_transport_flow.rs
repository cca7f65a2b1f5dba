//! Transport client driven through the application root.

mod common;

use std::time::Duration;

use common::{create_test_app, Script};
use rh_core::constants::{inbound, outbound};
use rh_core::auth::TokenStore;
use rh_models::event::{AppEvent, EventKind, ServerEvent};
use rh_models::models::ride::GeoPoint;
use rh_models::models::transport::{TransportEvent, TransportState};
use rh_socket::Frame;

#[tokio::test]
async fn e2e_login_then_connect_and_exchange_frames() {
    let mut app = create_test_app(vec![Script::Open], None);
    app.registry.start().await.unwrap();
    assert_eq!(app.registry.transport().state(), TransportState::Disconnected);

    // Token arrives later, as after a login.
    app.tokens.set_token(Some("jwt".into())).unwrap();
    let mut rides = app.registry.event_bus().forward(&[EventKind::RideAccepted]);
    app.registry.transport().connect().await.unwrap();

    let mut server = app.sessions.recv().await.unwrap();
    server.to_client.send(Frame::bare(inbound::CONNECTED)).unwrap();
    app.registry
        .transport()
        .wait_for_state(TransportState::Connected, Duration::from_secs(1))
        .await
        .unwrap();

    assert!(app
        .registry
        .transport()
        .send_location(GeoPoint::new(40.0, -74.0), Some(90.0)));
    let frame = server.from_client.recv().await.unwrap();
    assert_eq!(frame.event, outbound::DRIVER_LOCATION);
    assert_eq!(frame.data["heading"], 90.0);

    server
        .to_client
        .send(Frame::new(
            inbound::RIDE_ACCEPTED,
            serde_json::json!({"rideId": "r-1", "driverId": "d-1", "etaSeconds": 120}),
        ))
        .unwrap();
    match rides.recv().await.unwrap() {
        AppEvent::Server(ServerEvent::RideAccepted(accepted)) => {
            assert_eq!(accepted.ride_id, "r-1");
            assert_eq!(accepted.eta_seconds, Some(120));
        }
        other => panic!("unexpected event: {other:?}"),
    }

    app.registry.shutdown_all().await.unwrap();
    assert!(!app
        .registry
        .transport()
        .send_location(GeoPoint::new(40.0, -74.0), None));
}

#[tokio::test(start_paused = true)]
async fn e2e_lost_session_reconnects_with_backoff() {
    let mut app = create_test_app(vec![Script::Open, Script::Refuse, Script::Open], Some("jwt"));
    let mut scheduled = app
        .registry
        .event_bus()
        .forward(&[EventKind::TransportReconnectScheduled]);
    app.registry.start().await.unwrap();

    let server = app.sessions.recv().await.unwrap();
    server.to_client.send(Frame::bare(inbound::CONNECTED)).unwrap();
    let transport = app.registry.transport().clone();
    transport
        .wait_for_state(TransportState::Connected, Duration::from_secs(1))
        .await
        .unwrap();

    drop(server);
    let mut delays = Vec::new();
    for _ in 0..2 {
        match scheduled.recv().await.unwrap() {
            AppEvent::Transport(TransportEvent::ReconnectScheduled { delay, .. }) => {
                delays.push(delay)
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }
    assert_eq!(delays, vec![Duration::from_millis(1_000), Duration::from_millis(2_000)]);

    let server = app.sessions.recv().await.unwrap();
    server.to_client.send(Frame::bare(inbound::CONNECTED)).unwrap();
    transport
        .wait_for_state(TransportState::Connected, Duration::from_secs(1))
        .await
        .unwrap();
    assert_eq!(transport.reconnect_attempt(), 0);
    assert_eq!(app.connector.attempts(), 3);

    app.registry.shutdown_all().await.unwrap();
}
