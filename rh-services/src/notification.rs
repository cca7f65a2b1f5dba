//! Notification presentation queue.
//!
//! Turns connectivity transitions, server notifications, application
//! requests and terminal transport failures into visible records. Each
//! record owns an independent auto-dismiss timer; the terminal failure
//! record has none and stays until dismissed.
//!
//! Optionally mirrors records to native desktop notifications.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use rh_core::config::NotificationConfig;
use rh_core::constants;
use rh_core::error::RhResult;
use rh_models::event::{AppEvent, EventKind, ServerEvent};
use rh_models::event_bus::{EventBus, SubscriptionId};
use rh_models::models::connectivity::ConnectivityEvent;
use rh_models::models::notification::{NotificationId, NotificationKind, NotificationRecord};
use rh_models::models::transport::TransportEvent;

use crate::service::{Service, ServiceState};

const OFFLINE_MESSAGE: &str = "You are offline. Some features are unavailable.";
const ONLINE_MESSAGE: &str = "Back online.";
const TRANSPORT_FAILED_MESSAGE: &str =
    "Lost connection to the server. Reconnect to receive live updates.";

/// Bus kinds the queue reacts to.
const WATCHED: &[EventKind] = &[
    EventKind::Offline,
    EventKind::Online,
    EventKind::AppNotification,
    EventKind::NotificationNew,
    EventKind::TransportFailed,
];

struct Entry {
    record: NotificationRecord,
    timer: Option<JoinHandle<()>>,
}

#[derive(Default)]
struct Entries {
    next_id: u64,
    items: Vec<Entry>,
}

struct QueueInner {
    bus: EventBus,
    config: NotificationConfig,
    entries: Mutex<Entries>,
    visible_tx: watch::Sender<Vec<NotificationRecord>>,
    subscription: Mutex<Option<SubscriptionId>>,
    state: Mutex<ServiceState>,
}

/// Ordered list of visible notifications.
///
/// Cheap to clone; clones share one queue.
#[derive(Clone)]
pub struct NotificationQueue {
    inner: Arc<QueueInner>,
}

impl NotificationQueue {
    pub fn new(bus: EventBus, config: NotificationConfig) -> Self {
        let (visible_tx, _) = watch::channel(Vec::new());
        Self {
            inner: Arc::new(QueueInner {
                bus,
                config,
                entries: Mutex::new(Entries::default()),
                visible_tx,
                subscription: Mutex::new(None),
                state: Mutex::new(ServiceState::Created),
            }),
        }
    }

    /// Start reacting to bus events. Idempotent.
    pub fn attach(&self) {
        let mut subscription = lock(&self.inner.subscription);
        if subscription.is_some() {
            return;
        }
        let weak: Weak<QueueInner> = Arc::downgrade(&self.inner);
        *subscription = Some(self.inner.bus.on_many(WATCHED, move |event| {
            match weak.upgrade() {
                Some(inner) => inner.handle_event(event),
                None => Ok(()),
            }
        }));
        debug!("notification queue attached to bus");
    }

    /// Stop reacting to bus events. Visible records are kept.
    pub fn detach(&self) {
        if let Some(id) = lock(&self.inner.subscription).take() {
            self.inner.bus.off_all(id);
            debug!("notification queue detached from bus");
        }
    }

    /// Show a record directly. `None` duration means persistent.
    pub fn show(
        &self,
        kind: NotificationKind,
        message: impl Into<String>,
        duration_ms: Option<u64>,
    ) -> NotificationId {
        self.inner.push(kind, message.into(), duration_ms)
    }

    /// Remove a record and cancel its timer.
    ///
    /// Returns false if the id is unknown or already gone.
    pub fn dismiss(&self, id: NotificationId) -> bool {
        self.inner.remove(id)
    }

    /// Dismiss everything. Returns how many records were removed.
    pub fn clear(&self) -> usize {
        let removed = {
            let mut entries = self.inner.entries();
            std::mem::take(&mut entries.items)
        };
        for entry in &removed {
            if let Some(timer) = &entry.timer {
                timer.abort();
            }
        }
        if !removed.is_empty() {
            self.inner.publish_visible();
        }
        removed.len()
    }

    /// Visible records, oldest first.
    pub fn visible(&self) -> Vec<NotificationRecord> {
        self.inner
            .entries()
            .items
            .iter()
            .map(|entry| entry.record.clone())
            .collect()
    }

    /// Watch the visible list.
    pub fn subscribe(&self) -> watch::Receiver<Vec<NotificationRecord>> {
        self.inner.visible_tx.subscribe()
    }
}

impl QueueInner {
    fn entries(&self) -> MutexGuard<'_, Entries> {
        lock(&self.entries)
    }

    fn handle_event(self: &Arc<Self>, event: &AppEvent) -> RhResult<()> {
        let cfg = &self.config;
        match event {
            AppEvent::Connectivity(ConnectivityEvent::Offline) => {
                self.push(
                    NotificationKind::Offline,
                    OFFLINE_MESSAGE.into(),
                    Some(cfg.offline_duration_ms),
                );
            }
            AppEvent::Connectivity(ConnectivityEvent::Online) => {
                self.push(
                    NotificationKind::Online,
                    ONLINE_MESSAGE.into(),
                    Some(cfg.online_duration_ms),
                );
            }
            AppEvent::Notify(request) => {
                self.push(
                    request.kind,
                    request.message.clone(),
                    Some(request.duration_ms.unwrap_or(cfg.default_duration_ms)),
                );
            }
            AppEvent::Server(ServerEvent::NotificationNew(incoming)) => {
                let message = match &incoming.title {
                    Some(title) if !title.is_empty() => format!("{title}: {}", incoming.message),
                    _ => incoming.message.clone(),
                };
                self.push(
                    NotificationKind::from_level(incoming.level.as_deref()),
                    message,
                    Some(cfg.default_duration_ms),
                );
            }
            AppEvent::Transport(TransportEvent::Failed { .. }) => {
                let duration = if cfg.persist_transport_failure {
                    None
                } else {
                    Some(cfg.default_duration_ms)
                };
                self.push(NotificationKind::Error, TRANSPORT_FAILED_MESSAGE.into(), duration);
            }
            _ => {}
        }
        Ok(())
    }

    fn push(
        self: &Arc<Self>,
        kind: NotificationKind,
        message: String,
        duration_ms: Option<u64>,
    ) -> NotificationId {
        let record = {
            let mut entries = self.entries();
            entries.next_id += 1;
            let record = NotificationRecord {
                id: NotificationId(entries.next_id),
                kind,
                message,
                duration_ms,
                created_at: Utc::now(),
            };
            let timer = record.duration().and_then(|d| self.schedule(record.id, d));
            entries.items.push(Entry {
                record: record.clone(),
                timer,
            });
            record
        };

        info!(
            "notification {} ({}): {}",
            record.id, record.kind, record.message
        );
        self.publish_visible();
        if self.config.desktop {
            if let Err(e) = show_desktop(&record) {
                warn!("desktop notification failed: {e}");
            }
        }
        record.id
    }

    fn schedule(self: &Arc<Self>, id: NotificationId, after: Duration) -> Option<JoinHandle<()>> {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!("no runtime for notification {id} timer, it will stay until dismissed");
            return None;
        };
        let weak = Arc::downgrade(self);
        Some(runtime.spawn(async move {
            tokio::time::sleep(after).await;
            if let Some(inner) = weak.upgrade() {
                inner.expire(id);
            }
        }))
    }

    /// Timer path: drop the record without aborting the running timer.
    fn expire(&self, id: NotificationId) {
        let removed = {
            let mut entries = self.entries();
            let before = entries.items.len();
            entries.items.retain(|entry| entry.record.id != id);
            before != entries.items.len()
        };
        if removed {
            debug!("notification {id} expired");
            self.publish_visible();
        }
    }

    fn remove(&self, id: NotificationId) -> bool {
        let entry = {
            let mut entries = self.entries();
            entries
                .items
                .iter()
                .position(|entry| entry.record.id == id)
                .map(|pos| entries.items.remove(pos))
        };
        let Some(entry) = entry else {
            return false;
        };
        if let Some(timer) = entry.timer {
            timer.abort();
        }
        debug!("notification {id} dismissed");
        self.publish_visible();
        true
    }

    fn publish_visible(&self) {
        let snapshot: Vec<NotificationRecord> = self
            .entries()
            .items
            .iter()
            .map(|entry| entry.record.clone())
            .collect();
        self.visible_tx.send_replace(snapshot);
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Mirror a record to the native notification center.
#[cfg(not(test))]
fn show_desktop(record: &NotificationRecord) -> RhResult<()> {
    let mut notification = notify_rust::Notification::new();
    notification
        .summary(constants::APP_NAME)
        .body(&record.message)
        .appname(constants::APP_NAME);
    if let Some(ms) = record.duration_ms {
        notification.timeout(notify_rust::Timeout::Milliseconds(
            u32::try_from(ms).unwrap_or(u32::MAX),
        ));
    }
    notification
        .show()
        .map_err(|e| rh_core::error::RhError::Notification(e.to_string()))?;
    Ok(())
}

#[cfg(test)]
fn show_desktop(_record: &NotificationRecord) -> RhResult<()> {
    Ok(())
}

impl Service for NotificationQueue {
    fn name(&self) -> &str { "notification" }
    fn state(&self) -> ServiceState {
        *lock(&self.inner.state)
    }
    fn init(&mut self) -> RhResult<()> {
        self.attach();
        *lock(&self.inner.state) = ServiceState::Running;
        info!("notification queue initialized");
        Ok(())
    }
    fn shutdown(&mut self) -> RhResult<()> {
        self.detach();
        self.clear();
        *lock(&self.inner.state) = ServiceState::Stopped;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rh_models::models::notification::AppNotification;
    use rh_models::models::ride::ServerNotification;

    fn queue() -> (EventBus, NotificationQueue) {
        let bus = EventBus::new();
        let queue = NotificationQueue::new(bus.clone(), NotificationConfig::default());
        queue.attach();
        (bus, queue)
    }

    #[tokio::test(start_paused = true)]
    async fn test_offline_record_expires_after_three_seconds() {
        let (bus, queue) = queue();
        bus.emit(AppEvent::Connectivity(ConnectivityEvent::Offline));

        let visible = queue.visible();
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].kind, NotificationKind::Offline);
        assert_eq!(visible[0].duration_ms, Some(constants::OFFLINE_NOTIFICATION_MS));

        tokio::time::sleep(Duration::from_millis(2_999)).await;
        assert_eq!(queue.visible().len(), 1);
        tokio::time::sleep(Duration::from_millis(2)).await;
        assert!(queue.visible().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_dismiss_cancels_timer_and_is_idempotent() {
        let (_bus, queue) = queue();
        let id = queue.show(NotificationKind::Info, "hello", Some(1_000));

        assert!(queue.dismiss(id));
        assert!(!queue.dismiss(id));
        assert!(!queue.dismiss(NotificationId(999)));

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(queue.visible().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_transport_failure_is_persistent() {
        let (bus, queue) = queue();
        bus.emit(AppEvent::Transport(TransportEvent::Failed { attempts: 5 }));

        tokio::time::sleep(Duration::from_secs(600)).await;
        let visible = queue.visible();
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].kind, NotificationKind::Error);
        assert!(visible[0].is_persistent());
    }

    #[tokio::test]
    async fn test_server_and_app_notifications() {
        let (bus, queue) = queue();
        bus.emit(AppEvent::Server(ServerEvent::NotificationNew(ServerNotification {
            title: Some("Ride".into()),
            message: "Your driver is arriving".into(),
            level: Some("success".into()),
        })));
        bus.emit(AppEvent::Notify(
            AppNotification::new(NotificationKind::Warning, "Low balance").with_duration_ms(750),
        ));

        let visible = queue.visible();
        assert_eq!(visible.len(), 2);
        assert_eq!(visible[0].message, "Ride: Your driver is arriving");
        assert_eq!(visible[0].kind, NotificationKind::Success);
        assert_eq!(visible[0].duration_ms, Some(constants::DEFAULT_NOTIFICATION_MS));
        assert_eq!(visible[1].duration_ms, Some(750));
        assert!(visible[0].id < visible[1].id);
    }

    #[tokio::test]
    async fn test_detach_stops_reacting() {
        let (bus, queue) = queue();
        queue.detach();
        queue.detach();
        bus.emit(AppEvent::Connectivity(ConnectivityEvent::Offline));
        assert!(queue.visible().is_empty());
        assert_eq!(bus.subscriber_count(EventKind::Offline), 0);
    }

    #[tokio::test]
    async fn test_watch_channel_tracks_visible_list() {
        let (_bus, queue) = queue();
        let mut rx = queue.subscribe();

        queue.show(NotificationKind::Info, "one", None);
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow_and_update().len(), 1);

        assert_eq!(queue.clear(), 1);
        rx.changed().await.unwrap();
        assert!(rx.borrow().is_empty());
    }

    #[test]
    fn test_show_without_runtime_keeps_record() {
        let bus = EventBus::new();
        let queue = NotificationQueue::new(bus, NotificationConfig::default());
        queue.show(NotificationKind::Info, "no timer here", Some(10));
        assert_eq!(queue.visible().len(), 1);
    }

    #[test]
    fn test_service_lifecycle() {
        let bus = EventBus::new();
        let mut queue = NotificationQueue::new(bus.clone(), NotificationConfig::default());
        assert_eq!(queue.name(), "notification");

        queue.init().unwrap();
        assert!(queue.is_healthy());
        assert_eq!(bus.subscriber_count(EventKind::Online), 1);

        queue.shutdown().unwrap();
        assert_eq!(queue.state(), ServiceState::Stopped);
        assert_eq!(bus.subscriber_count(EventKind::Online), 0);
    }
}
