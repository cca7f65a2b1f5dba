//! Connectivity state machine and the service that publishes it.
//!
//! The machine turns raw snapshots into de-duplicated transitions. Per
//! snapshot it emits, in order: link changes (`Connected`/`Disconnected`),
//! reachability changes, the composite `Online`/`Offline` signal, and
//! finally the raw `ConnectionChange`.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use tracing::{debug, info};

use rh_core::error::RhResult;
use rh_models::event::AppEvent;
use rh_models::event_bus::EventBus;
use rh_models::models::connectivity::{ConnectivityEvent, ConnectivityStatus};

use crate::reachability::{ConnectivityProvider, ReachabilityObserver};
use crate::service::{Service, ServiceState};

/// Derives connectivity transitions from a stream of snapshots.
///
/// The composite value starts unknown, so the first snapshot always
/// produces `Online` or `Offline`. After that the composite signal only
/// fires on a flip, which keeps the online/offline sequence alternating.
#[derive(Debug, Default)]
pub struct ConnectivityStateMachine {
    online: Option<bool>,
    connected: Option<bool>,
    /// Last definite reachability; `Unknown` snapshots leave it untouched.
    reachable: Option<bool>,
    last: Option<ConnectivityStatus>,
}

impl ConnectivityStateMachine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one snapshot and collect the events it produces.
    pub fn observe(&mut self, status: ConnectivityStatus) -> Vec<ConnectivityEvent> {
        let mut events = Vec::with_capacity(4);

        if self.connected.is_some_and(|prev| prev != status.is_connected) {
            events.push(if status.is_connected {
                ConnectivityEvent::Connected
            } else {
                ConnectivityEvent::Disconnected
            });
        }
        self.connected = Some(status.is_connected);

        if let Some(now) = status.is_internet_reachable.as_option() {
            if self.reachable.is_some_and(|prev| prev != now) {
                events.push(if now {
                    ConnectivityEvent::InternetReachable
                } else {
                    ConnectivityEvent::InternetUnreachable
                });
            }
            self.reachable = Some(now);
        }

        let has_internet = status.has_internet();
        if self.online != Some(has_internet) {
            self.online = Some(has_internet);
            events.push(if has_internet {
                ConnectivityEvent::Online
            } else {
                ConnectivityEvent::Offline
            });
        }

        events.push(ConnectivityEvent::ConnectionChange(status.clone()));
        self.last = Some(status);
        events
    }

    /// Composite signal; false until the first snapshot arrives.
    pub fn is_online(&self) -> bool {
        self.online.unwrap_or(false)
    }

    pub fn current(&self) -> Option<&ConnectivityStatus> {
        self.last.as_ref()
    }
}

struct ConnectionInner {
    observer: ReachabilityObserver,
    machine: Mutex<ConnectivityStateMachine>,
    bus: EventBus,
    state: Mutex<ServiceState>,
}

impl ConnectionInner {
    fn machine(&self) -> MutexGuard<'_, ConnectivityStateMachine> {
        self.machine.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_state(&self, state: ServiceState) {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = state;
    }

    fn apply(&self, status: ConnectivityStatus) {
        let events = self.machine().observe(status);
        for event in events {
            match &event {
                ConnectivityEvent::Online => info!("connectivity: online"),
                ConnectivityEvent::Offline => info!("connectivity: offline"),
                ConnectivityEvent::ConnectionChange(_) => {}
                other => debug!("connectivity: {other:?}"),
            }
            self.bus.emit(AppEvent::Connectivity(event));
        }
    }
}

/// Wires the reachability observer through the state machine onto the bus.
///
/// Cheap to clone; clones share one observer and one machine.
#[derive(Clone)]
pub struct ConnectionService {
    inner: Arc<ConnectionInner>,
}

impl ConnectionService {
    pub fn new(provider: Arc<dyn ConnectivityProvider>, bus: EventBus) -> Self {
        Self {
            inner: Arc::new(ConnectionInner {
                observer: ReachabilityObserver::new(provider),
                machine: Mutex::new(ConnectivityStateMachine::new()),
                bus,
                state: Mutex::new(ServiceState::Created),
            }),
        }
    }

    /// Start observing. Idempotent.
    pub fn start(&self) -> RhResult<()> {
        let weak: Weak<ConnectionInner> = Arc::downgrade(&self.inner);
        let started = self.inner.observer.start(move |status| {
            if let Some(inner) = weak.upgrade() {
                inner.apply(status);
            }
        });
        match started {
            Ok(()) => {
                self.inner.set_state(ServiceState::Running);
                Ok(())
            }
            Err(e) => {
                self.inner.set_state(ServiceState::Failed);
                Err(e)
            }
        }
    }

    /// Stop observing. Idempotent.
    pub fn stop(&self) {
        self.inner.observer.stop();
        self.inner.set_state(ServiceState::Stopped);
    }

    /// Feed a snapshot directly, bypassing the provider.
    pub fn process(&self, status: ConnectivityStatus) {
        self.inner.apply(status);
    }

    pub fn is_online(&self) -> bool {
        self.inner.machine().is_online()
    }

    pub fn current_status(&self) -> Option<ConnectivityStatus> {
        self.inner.machine().current().cloned()
    }

    pub fn bus(&self) -> &EventBus {
        &self.inner.bus
    }
}

impl Service for ConnectionService {
    fn name(&self) -> &str { "connection" }
    fn state(&self) -> ServiceState {
        *self.inner.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
    fn init(&mut self) -> RhResult<()> {
        self.start()?;
        info!("connection service initialized");
        Ok(())
    }
    fn shutdown(&mut self) -> RhResult<()> {
        self.stop();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ConnectivityEvent::*;

    fn snapshot(connected: bool, reachable: Option<bool>) -> ConnectivityStatus {
        ConnectivityStatus::from_flags(connected, reachable)
    }

    fn without_raw(events: Vec<ConnectivityEvent>) -> Vec<ConnectivityEvent> {
        events
            .into_iter()
            .filter(|e| !matches!(e, ConnectionChange(_)))
            .collect()
    }

    #[test]
    fn test_first_snapshot_always_emits_composite() {
        let mut machine = ConnectivityStateMachine::new();
        let events = machine.observe(snapshot(false, None));
        assert_eq!(events, vec![Offline, ConnectionChange(snapshot(false, None))]);
        assert!(!machine.is_online());
    }

    #[test]
    fn test_duplicate_snapshot_only_yields_raw_change() {
        let mut machine = ConnectivityStateMachine::new();
        machine.observe(snapshot(true, Some(true)));
        let events = machine.observe(snapshot(true, Some(true)));
        assert_eq!(events, vec![ConnectionChange(snapshot(true, Some(true)))]);
    }

    #[test]
    fn test_emission_order() {
        let mut machine = ConnectivityStateMachine::new();
        machine.observe(snapshot(true, Some(true)));

        let events = machine.observe(snapshot(false, Some(false)));
        assert_eq!(
            events,
            vec![
                Disconnected,
                InternetUnreachable,
                Offline,
                ConnectionChange(snapshot(false, Some(false))),
            ]
        );
    }

    #[test]
    fn test_unknown_reachability_keeps_last_definite_value() {
        let mut machine = ConnectivityStateMachine::new();
        machine.observe(snapshot(true, Some(true)));
        assert_eq!(without_raw(machine.observe(snapshot(true, None))), vec![Offline]);
        // Reachability was true before the unknown blip, so no reachable event.
        assert_eq!(without_raw(machine.observe(snapshot(true, Some(true)))), vec![Online]);
    }

    #[test]
    fn test_documented_scenario() {
        let mut machine = ConnectivityStateMachine::new();
        let mut composite = Vec::new();
        let inputs = [
            snapshot(true, Some(true)),
            snapshot(true, Some(true)),
            snapshot(false, None),
            snapshot(true, Some(true)),
        ];
        for input in inputs {
            for event in machine.observe(input) {
                if matches!(event, Online | Offline) {
                    composite.push(event);
                }
            }
        }
        assert_eq!(composite, vec![Online, Offline, Online]);
    }

    #[test]
    fn test_composite_alternates_for_arbitrary_input() {
        let reachabilities = [Some(true), Some(false), None];
        let mut machine = ConnectivityStateMachine::new();
        let mut last: Option<ConnectivityEvent> = None;

        // Walk a deterministic pseudo-random sequence over all combinations.
        let mut seed: u32 = 7;
        for _ in 0..500 {
            seed = seed.wrapping_mul(1_103_515_245).wrapping_add(12_345);
            let connected = (seed >> 16) & 1 == 1;
            let reachable = reachabilities[((seed >> 17) % 3) as usize];
            for event in machine.observe(snapshot(connected, reachable)) {
                if matches!(event, Online | Offline) {
                    assert_ne!(last.as_ref(), Some(&event), "composite repeated");
                    last = Some(event);
                }
            }
        }
    }

    #[tokio::test]
    async fn test_service_publishes_to_bus() {
        use crate::reachability::ManualProvider;
        use rh_models::event::EventKind;

        let provider = Arc::new(ManualProvider::new());
        let bus = EventBus::new();
        let mut rx = bus.forward(&[EventKind::Online, EventKind::Offline]);
        let service = ConnectionService::new(provider.clone(), bus);

        service.start().unwrap();
        provider.publish(snapshot(true, Some(true)));
        assert_eq!(rx.recv().await.unwrap(), AppEvent::Connectivity(Online));
        assert!(service.is_online());
        assert_eq!(service.current_status(), Some(snapshot(true, Some(true))));

        service.stop();
        service.stop();
        assert_eq!(provider.unsubscribe_count(), 1);
        assert_eq!(service.state(), ServiceState::Stopped);
    }
}
