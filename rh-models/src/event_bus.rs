//! In-process publish/subscribe bus.
//!
//! Subscribers register a callback per `EventKind` and are invoked
//! synchronously, in registration order, on every `emit`. The subscriber
//! list is snapshotted before delivery, so a callback may subscribe or
//! unsubscribe (itself or others) while an emit is in flight; the change
//! applies to the next emit.
//!
//! A callback returning `Err` is logged and skipped over: the remaining
//! subscribers still receive the event. Panics are not caught.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use tokio::sync::mpsc;
use tracing::{debug, warn};

use rh_core::error::RhResult;

use crate::event::{AppEvent, EventKind};

type Handler = Arc<dyn Fn(&AppEvent) -> RhResult<()> + Send + Sync>;

/// Handle returned by `on`; pass it to `off` to unsubscribe.
///
/// One id covers every kind the subscription was registered for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

#[derive(Clone)]
struct Subscriber {
    id: SubscriptionId,
    handler: Handler,
}

#[derive(Default)]
struct BusInner {
    subscribers: Mutex<HashMap<EventKind, Vec<Subscriber>>>,
    next_id: AtomicU64,
}

impl BusInner {
    fn lock(&self) -> MutexGuard<'_, HashMap<EventKind, Vec<Subscriber>>> {
        self.subscribers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn allocate_id(&self) -> SubscriptionId {
        SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    fn insert(&self, kinds: &[EventKind], id: SubscriptionId, handler: Handler) {
        let mut map = self.lock();
        for kind in kinds {
            map.entry(*kind).or_default().push(Subscriber {
                id,
                handler: handler.clone(),
            });
        }
    }

    fn remove(&self, kind: Option<EventKind>, id: SubscriptionId) -> bool {
        let mut map = self.lock();
        let mut removed = false;
        let mut strip = |list: &mut Vec<Subscriber>| {
            if let Some(pos) = list.iter().position(|s| s.id == id) {
                list.remove(pos);
                removed = true;
            }
        };
        match kind {
            Some(kind) => {
                if let Some(list) = map.get_mut(&kind) {
                    strip(list);
                }
            }
            None => map.values_mut().for_each(&mut strip),
        }
        map.retain(|_, list| !list.is_empty());
        removed
    }
}

/// Typed publish/subscribe registry, cheap to clone.
///
/// Every component that publishes or consumes events holds a clone of the
/// same bus.
#[derive(Clone, Default)]
pub struct EventBus {
    inner: Arc<BusInner>,
}

impl EventBus {
    /// Create an empty bus.
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe `handler` to one kind. Appends to the end of the list.
    pub fn on<F>(&self, kind: EventKind, handler: F) -> SubscriptionId
    where
        F: Fn(&AppEvent) -> RhResult<()> + Send + Sync + 'static,
    {
        self.on_many(&[kind], handler)
    }

    /// Subscribe one handler to several kinds under a single id.
    pub fn on_many<F>(&self, kinds: &[EventKind], handler: F) -> SubscriptionId
    where
        F: Fn(&AppEvent) -> RhResult<()> + Send + Sync + 'static,
    {
        let id = self.inner.allocate_id();
        self.inner.insert(kinds, id, Arc::new(handler));
        debug!("event_bus: subscription {:?} registered for {} kind(s)", id, kinds.len());
        id
    }

    /// Unsubscribe `id` from `kind`. Unknown ids are ignored.
    ///
    /// Returns whether anything was removed.
    pub fn off(&self, kind: EventKind, id: SubscriptionId) -> bool {
        self.inner.remove(Some(kind), id)
    }

    /// Unsubscribe `id` from every kind it was registered for.
    pub fn off_all(&self, id: SubscriptionId) -> bool {
        self.inner.remove(None, id)
    }

    /// Deliver `event` to every current subscriber of its kind.
    ///
    /// Returns how many subscribers handled it without error.
    pub fn emit(&self, event: AppEvent) -> usize {
        let kind = event.kind();
        let snapshot: Vec<Subscriber> = self
            .inner
            .lock()
            .get(&kind)
            .cloned()
            .unwrap_or_default();

        if snapshot.is_empty() {
            debug!("event_bus: no subscribers for {kind}");
            return 0;
        }

        let mut delivered = 0;
        for subscriber in &snapshot {
            match (subscriber.handler)(&event) {
                Ok(()) => delivered += 1,
                Err(e) => warn!(
                    "event_bus: subscriber {:?} failed on {kind}: {e}",
                    subscriber.id
                ),
            }
        }
        debug!("event_bus: emitted {kind} to {delivered}/{} subscriber(s)", snapshot.len());
        delivered
    }

    /// Bridge the given kinds into an async channel.
    ///
    /// The subscription removes itself on the first emit after the
    /// receiver is dropped.
    pub fn forward(&self, kinds: &[EventKind]) -> mpsc::UnboundedReceiver<AppEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = self.inner.allocate_id();
        let weak: Weak<BusInner> = Arc::downgrade(&self.inner);

        let handler: Handler = Arc::new(move |event: &AppEvent| {
            if tx.send(event.clone()).is_err() {
                if let Some(inner) = weak.upgrade() {
                    inner.remove(None, id);
                    debug!("event_bus: forwarder {id:?} closed");
                }
            }
            Ok(())
        });
        self.inner.insert(kinds, id, handler);
        rx
    }

    /// Number of subscribers currently registered for `kind`.
    pub fn subscriber_count(&self, kind: EventKind) -> usize {
        self.inner.lock().get(&kind).map_or(0, Vec::len)
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let map = self.inner.lock();
        let total: usize = map.values().map(Vec::len).sum();
        f.debug_struct("EventBus")
            .field("kinds", &map.len())
            .field("subscribers", &total)
            .finish()
    }
}
