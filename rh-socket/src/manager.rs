//! Real-time transport client.
//!
//! Owns the socket lifecycle: connect, wait for the server's `connected`
//! handshake, route inbound frames onto the event bus, and reconnect with
//! exponential backoff when the session drops. A single driver task runs
//! the whole loop, so attempts never overlap.
//!
//! State sits behind a short `std::sync::Mutex` that is never held across
//! an `.await` or a bus emission. Every `connect()` bumps an epoch counter;
//! `disconnect()` bumps it again, which fences the aborted driver out of
//! any further state writes. The watch channel is updated under the lock,
//! and a bus emission is skipped once a newer state has been stored.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout, timeout_at, Instant};
use tracing::{debug, error, info, warn};

use rh_core::auth::TokenStore;
use rh_core::config::SocketConfig;
use rh_core::constants::{self, inbound, outbound};
use rh_core::error::{RhError, RhResult};
use rh_models::event::{AppEvent, ServerEvent};
use rh_models::event_bus::EventBus;
use rh_models::models::ride::{
    AcceptRide, DriverStatus, EmergencyAlertReport, GeoPoint, LocationReport, NearbyDriversQuery,
    NewRideRequest, OutgoingChatMessage, Place, RideStatus, RideStatusReport, StatusReport,
};
use rh_models::models::transport::{TransportEvent, TransportState};

use crate::frame::Frame;
use crate::transport::{Connection, Connector};

/// Configuration for reconnection behavior.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconnectConfig {
    /// Delay before the first retry; doubles on each further retry.
    pub base_delay: Duration,
    /// Retries allowed before giving up.
    pub max_attempts: u32,
    /// Limit for opening the socket and for the auth handshake.
    pub connect_timeout: Duration,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_millis(constants::SOCKET_RECONNECT_BASE_DELAY_MS),
            max_attempts: constants::SOCKET_MAX_RECONNECT_ATTEMPTS,
            connect_timeout: Duration::from_millis(constants::SOCKET_CONNECT_TIMEOUT_MS),
        }
    }
}

impl ReconnectConfig {
    pub fn from_config(config: &SocketConfig) -> Self {
        Self {
            base_delay: Duration::from_millis(config.reconnect_base_delay_ms),
            max_attempts: config.max_reconnect_attempts,
            connect_timeout: Duration::from_millis(config.connect_timeout_ms),
        }
    }

    /// Delay before retry number `attempt` (1-based).
    ///
    /// Sequence with the defaults: 1s, 2s, 4s, 8s, 16s, then `None`.
    pub fn delay_for(&self, attempt: u32) -> Option<Duration> {
        if attempt == 0 || attempt > self.max_attempts {
            return None;
        }
        let factor = 1u32.checked_shl(attempt - 1)?;
        self.base_delay.checked_mul(factor)
    }
}

struct Shared {
    state: TransportState,
    /// Bumped on every stored state change.
    revision: u64,
    epoch: u64,
    attempt: u32,
    outbound: Option<mpsc::UnboundedSender<Frame>>,
    flushed: Option<oneshot::Receiver<()>>,
    driver: Option<JoinHandle<()>>,
}

impl Shared {
    fn end_session(&mut self) {
        self.outbound = None;
        self.flushed = None;
    }
}

enum SessionEnd {
    /// Socket failed or closed; retry with backoff.
    Lost,
    /// Credentials were refused; do not retry.
    AuthRejected(String),
    /// A newer connect/disconnect superseded this driver.
    Cancelled,
}

struct Inner {
    connector: Arc<dyn Connector>,
    tokens: Arc<dyn TokenStore>,
    bus: EventBus,
    config: ReconnectConfig,
    shared: Mutex<Shared>,
    state_tx: watch::Sender<TransportState>,
}

/// Handle to the real-time transport. Clones share one connection.
#[derive(Clone)]
pub struct TransportClient {
    inner: Arc<Inner>,
}

impl TransportClient {
    pub fn new(
        connector: Arc<dyn Connector>,
        tokens: Arc<dyn TokenStore>,
        bus: EventBus,
        config: ReconnectConfig,
    ) -> Self {
        let (state_tx, _) = watch::channel(TransportState::Disconnected);
        Self {
            inner: Arc::new(Inner {
                connector,
                tokens,
                bus,
                config,
                shared: Mutex::new(Shared {
                    state: TransportState::Disconnected,
                    revision: 0,
                    epoch: 0,
                    attempt: 0,
                    outbound: None,
                    flushed: None,
                    driver: None,
                }),
                state_tx,
            }),
        }
    }

    /// Current connection state.
    pub fn state(&self) -> TransportState {
        self.inner.lock().state
    }

    pub fn is_connected(&self) -> bool {
        self.state() == TransportState::Connected
    }

    /// Consecutive failed attempts since the last authenticated session.
    pub fn reconnect_attempt(&self) -> u32 {
        self.inner.lock().attempt
    }

    pub fn reconnect_config(&self) -> &ReconnectConfig {
        &self.inner.config
    }

    /// Subscribe to connection state changes.
    pub fn state_receiver(&self) -> watch::Receiver<TransportState> {
        self.inner.state_tx.subscribe()
    }

    /// Wait until the client reaches `target`, or fail after `within`.
    pub async fn wait_for_state(&self, target: TransportState, within: Duration) -> RhResult<()> {
        let mut rx = self.state_receiver();
        let reached = timeout(within, async {
            rx.wait_for(|state| *state == target).await.map(|_| ())
        })
        .await;
        match reached {
            Ok(Ok(())) => Ok(()),
            Ok(Err(_)) => Err(RhError::Socket("transport state channel closed".into())),
            Err(_) => Err(RhError::Timeout(format!(
                "transport did not reach {target} within {}ms",
                within.as_millis()
            ))),
        }
    }

    /// Start connecting in the background.
    ///
    /// A no-op while an attempt or session is live. Fails with
    /// `MissingToken` when the token store is empty; no attempt is made.
    pub async fn connect(&self) -> RhResult<()> {
        let inner = &self.inner;
        let token = inner.tokens.token();

        let (epoch, previous, revision, token) = {
            let mut shared = inner.lock();
            if shared.state.is_active() {
                debug!("transport already {}, skipping connect", shared.state);
                return Ok(());
            }
            let Some(token) = token else {
                warn!("transport connect refused: no auth token");
                return Err(RhError::MissingToken);
            };
            shared.epoch += 1;
            shared.attempt = 0;
            let previous = shared.state;
            let revision = inner.store(&mut shared, TransportState::Connecting);
            (shared.epoch, previous, revision, token)
        };

        info!("transport state: {previous} -> {}", TransportState::Connecting);
        inner.announce(revision, TransportState::Connecting);

        let handle = tokio::spawn(Inner::drive(inner.clone(), epoch, token));
        let mut shared = inner.lock();
        if shared.epoch == epoch {
            shared.driver = Some(handle);
        } else {
            handle.abort();
        }
        Ok(())
    }

    /// Tear down the session and cancel any pending retry.
    ///
    /// Frames already accepted by a `send_*` call are written out before
    /// this returns, up to a short flush timeout.
    ///
    /// Idempotent: a second call changes nothing and publishes nothing.
    pub async fn disconnect(&self) {
        let (driver, previous, revision, flushed) = {
            let mut shared = self.inner.lock();
            shared.epoch += 1;
            let flushed = shared.flushed.take();
            shared.end_session();
            let previous = shared.state;
            let revision = (previous != TransportState::Disconnected)
                .then(|| self.inner.store(&mut shared, TransportState::Disconnected));
            (shared.driver.take(), previous, revision, flushed)
        };

        if let Some(handle) = driver {
            handle.abort();
        }

        if let Some(revision) = revision {
            info!("transport state: {previous} -> {}", TransportState::Disconnected);
            self.inner.announce(revision, TransportState::Disconnected);
            info!("transport disconnected");
        }

        if let Some(flushed) = flushed {
            let grace = Duration::from_millis(constants::SOCKET_FLUSH_TIMEOUT_MS);
            if timeout(grace, flushed).await.is_err() {
                warn!("socket writer did not flush within {}ms", grace.as_millis());
            }
        }
    }

    // ---- Outbound actions ----

    /// Report the driver's position.
    pub fn send_location(&self, point: GeoPoint, heading: Option<f64>) -> bool {
        self.send(
            outbound::DRIVER_LOCATION,
            &LocationReport {
                latitude: point.latitude,
                longitude: point.longitude,
                heading,
            },
        )
    }

    pub fn update_status(&self, status: DriverStatus) -> bool {
        self.send(outbound::DRIVER_STATUS, &StatusReport { status })
    }

    pub fn accept_ride(&self, ride_id: &str) -> bool {
        self.send(
            outbound::RIDE_ACCEPT,
            &AcceptRide {
                ride_id: ride_id.to_string(),
            },
        )
    }

    pub fn request_ride(&self, pickup: Place, dropoff: Place) -> bool {
        self.send(outbound::RIDE_REQUEST, &NewRideRequest { pickup, dropoff })
    }

    pub fn update_ride_status(&self, ride_id: &str, status: RideStatus) -> bool {
        self.send(
            outbound::RIDE_STATUS,
            &RideStatusReport {
                ride_id: ride_id.to_string(),
                status,
            },
        )
    }

    /// Send a chat message tagged with a fresh client id.
    pub fn send_message(&self, ride_id: &str, message: &str) -> bool {
        self.send(
            outbound::CHAT_MESSAGE,
            &OutgoingChatMessage {
                ride_id: ride_id.to_string(),
                message: message.to_string(),
                client_id: uuid::Uuid::new_v4().to_string(),
            },
        )
    }

    pub fn send_emergency_alert(
        &self,
        ride_id: Option<&str>,
        location: GeoPoint,
        message: Option<&str>,
    ) -> bool {
        self.send(
            outbound::EMERGENCY_ALERT,
            &EmergencyAlertReport {
                ride_id: ride_id.map(str::to_string),
                location,
                message: message.map(str::to_string),
            },
        )
    }

    pub fn get_nearby_drivers(&self, center: GeoPoint, radius_km: f64) -> bool {
        self.send(
            outbound::DRIVERS_NEARBY,
            &NearbyDriversQuery {
                latitude: center.latitude,
                longitude: center.longitude,
                radius_km,
            },
        )
    }

    /// Queue one frame on the live session.
    ///
    /// Outside `Connected` the frame is dropped, never buffered.
    fn send<T: Serialize>(&self, event: &'static str, payload: &T) -> bool {
        let shared = self.inner.lock();
        if shared.state != TransportState::Connected {
            debug!("transport {}, dropping {event}", shared.state);
            return false;
        }
        let Some(outbound) = shared.outbound.as_ref() else {
            debug!("transport has no live session, dropping {event}");
            return false;
        };
        let data = match serde_json::to_value(payload) {
            Ok(data) => data,
            Err(e) => {
                warn!("failed to serialize {event}: {e}");
                return false;
            }
        };
        outbound.send(Frame::new(event, data)).is_ok()
    }
}

impl std::fmt::Debug for TransportClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let shared = self.inner.lock();
        f.debug_struct("TransportClient")
            .field("state", &shared.state)
            .field("attempt", &shared.attempt)
            .finish()
    }
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, Shared> {
        self.shared.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_current(&self, epoch: u64) -> bool {
        self.lock().epoch == epoch
    }

    /// Store `state` and publish it to watchers. Call with the lock held.
    fn store(&self, shared: &mut Shared, state: TransportState) -> u64 {
        shared.state = state;
        shared.revision += 1;
        self.state_tx.send_replace(state);
        shared.revision
    }

    /// Emit a stored state on the bus unless a newer one replaced it.
    fn announce(&self, revision: u64, state: TransportState) {
        if self.lock().revision != revision {
            debug!("transport state {state} superseded before announcement");
            return;
        }
        self.bus
            .emit(AppEvent::Transport(TransportEvent::StateChanged(state)));
    }

    /// Move to `new_state` if this driver is still current.
    fn transition(&self, epoch: u64, new_state: TransportState) {
        let revision = {
            let mut shared = self.lock();
            if shared.epoch != epoch || shared.state == new_state {
                return;
            }
            info!("transport state: {} -> {new_state}", shared.state);
            self.store(&mut shared, new_state)
        };
        self.announce(revision, new_state);
    }

    fn publish(&self, epoch: u64, event: TransportEvent) {
        if self.is_current(epoch) {
            self.bus.emit(AppEvent::Transport(event));
        }
    }

    async fn drive(self: Arc<Self>, epoch: u64, first_token: String) {
        let mut token = first_token;
        loop {
            match self.run_session(epoch, &token).await {
                SessionEnd::Cancelled => return,
                SessionEnd::AuthRejected(reason) => {
                    self.require_auth(epoch, reason);
                    return;
                }
                SessionEnd::Lost => {}
            }

            let attempt = {
                let mut shared = self.lock();
                if shared.epoch != epoch {
                    return;
                }
                shared.end_session();
                shared.attempt += 1;
                shared.attempt
            };

            let Some(delay) = self.config.delay_for(attempt) else {
                let attempts = attempt - 1;
                error!("transport gave up after {attempts} reconnect attempt(s)");
                self.transition(epoch, TransportState::Failed);
                self.publish(epoch, TransportEvent::Failed { attempts });
                return;
            };

            warn!(
                "transport reconnect attempt {attempt}/{} in {}ms",
                self.config.max_attempts,
                delay.as_millis()
            );
            self.transition(epoch, TransportState::Reconnecting);
            self.publish(epoch, TransportEvent::ReconnectScheduled { attempt, delay });

            sleep(delay).await;
            if !self.is_current(epoch) {
                return;
            }

            token = match self.tokens.token() {
                Some(token) => token,
                None => {
                    self.require_auth(epoch, "auth token was cleared".into());
                    return;
                }
            };
            self.transition(epoch, TransportState::Connecting);
        }
    }

    async fn run_session(&self, epoch: u64, token: &str) -> SessionEnd {
        let opened = timeout(self.config.connect_timeout, self.connector.connect(token)).await;
        let Connection {
            outbound,
            mut inbound,
            flushed,
        } = match opened {
            Ok(Ok(connection)) => connection,
            Ok(Err(e)) if e.is_auth_error() => return SessionEnd::AuthRejected(e.to_string()),
            Ok(Err(e)) => {
                warn!("transport connect failed: {e}");
                return SessionEnd::Lost;
            }
            Err(_) => {
                warn!(
                    "transport connect timed out after {}ms",
                    self.config.connect_timeout.as_millis()
                );
                return SessionEnd::Lost;
            }
        };

        {
            let mut shared = self.lock();
            if shared.epoch != epoch {
                return SessionEnd::Cancelled;
            }
            shared.outbound = Some(outbound);
            shared.flushed = flushed;
        }
        self.transition(epoch, TransportState::Authenticating);

        let deadline = Instant::now() + self.config.connect_timeout;
        let mut authenticated = false;
        loop {
            let next = if authenticated {
                inbound.recv().await
            } else {
                match timeout_at(deadline, inbound.recv()).await {
                    Ok(next) => next,
                    Err(_) => {
                        warn!("transport handshake timed out");
                        return SessionEnd::Lost;
                    }
                }
            };
            let Some(frame) = next else {
                info!("transport connection closed");
                return SessionEnd::Lost;
            };
            if !self.is_current(epoch) {
                return SessionEnd::Cancelled;
            }

            match frame.event.as_str() {
                inbound::CONNECTED => {
                    if authenticated {
                        debug!("duplicate handshake ignored");
                        continue;
                    }
                    authenticated = true;
                    self.lock().attempt = 0;
                    self.transition(epoch, TransportState::Connected);
                    self.publish(epoch, TransportEvent::Authenticated);
                }
                inbound::CONNECT_ERROR if !authenticated => {
                    return SessionEnd::AuthRejected(frame.reason());
                }
                inbound::CONNECT_ERROR => {
                    warn!("transport connect_error on live session: {}", frame.reason());
                    return SessionEnd::Lost;
                }
                inbound::ERROR => {
                    let message = frame.reason();
                    warn!("transport error from server: {message}");
                    self.publish(epoch, TransportEvent::Error { message });
                }
                inbound::DISCONNECT => {
                    info!("server ended the session: {}", frame.reason());
                    return SessionEnd::Lost;
                }
                inbound::CONNECT => debug!("transport open acknowledged"),
                name => self.dispatch(epoch, name, frame.data),
            }
        }
    }

    fn dispatch(&self, epoch: u64, name: &str, data: serde_json::Value) {
        match ServerEvent::parse(name, data) {
            Ok(Some(event)) => {
                debug!("transport event: {name}");
                if self.is_current(epoch) {
                    self.bus.emit(AppEvent::Server(event));
                }
            }
            Ok(None) => debug!("ignoring unknown transport event: {name}"),
            Err(e) => warn!("dropping transport event: {e}"),
        }
    }

    fn require_auth(&self, epoch: u64, reason: String) {
        {
            let mut shared = self.lock();
            if shared.epoch != epoch {
                return;
            }
            shared.end_session();
            shared.attempt = 0;
        }
        warn!("transport needs fresh credentials: {reason}");
        self.transition(epoch, TransportState::Disconnected);
        self.publish(epoch, TransportEvent::AuthRequired { reason });
    }
}
