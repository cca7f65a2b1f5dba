//! Network reachability observation.
//!
//! A `ConnectivityProvider` wraps whatever the host platform offers for
//! connectivity callbacks. The `ReachabilityObserver` subscribes to it once
//! and forwards every raw snapshot, redundant ones included, to a single
//! callback. Interpreting the snapshots is the state machine's job.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use rh_core::error::{RhError, RhResult};
use rh_models::models::connectivity::ConnectivityStatus;

/// Source of connectivity snapshots.
pub trait ConnectivityProvider: Send + Sync {
    /// Start delivering snapshots. Replaces any previous subscription.
    fn subscribe(&self) -> RhResult<mpsc::UnboundedReceiver<ConnectivityStatus>>;

    /// Stop delivering snapshots and release platform resources.
    fn unsubscribe(&self);
}

/// Provider fed by the host application.
///
/// Embedders forward their platform callbacks through `publish`. The most
/// recent snapshot is replayed to a new subscriber, the way platform
/// listeners report the current state on registration.
#[derive(Debug, Default)]
pub struct ManualProvider {
    inner: Mutex<ManualInner>,
}

#[derive(Debug, Default)]
struct ManualInner {
    sender: Option<mpsc::UnboundedSender<ConnectivityStatus>>,
    last: Option<ConnectivityStatus>,
    unsubscribes: usize,
}

impl ManualProvider {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, ManualInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Push a snapshot. Returns false when nobody is subscribed.
    pub fn publish(&self, status: ConnectivityStatus) -> bool {
        let mut inner = self.lock();
        inner.last = Some(status.clone());
        match &inner.sender {
            Some(sender) => sender.send(status).is_ok(),
            None => false,
        }
    }

    pub fn is_subscribed(&self) -> bool {
        self.lock().sender.is_some()
    }

    /// How many times the subscription has been released.
    pub fn unsubscribe_count(&self) -> usize {
        self.lock().unsubscribes
    }
}

impl ConnectivityProvider for ManualProvider {
    fn subscribe(&self) -> RhResult<mpsc::UnboundedReceiver<ConnectivityStatus>> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut inner = self.lock();
        if let Some(last) = inner.last.clone() {
            let _ = tx.send(last);
        }
        inner.sender = Some(tx);
        Ok(rx)
    }

    fn unsubscribe(&self) {
        let mut inner = self.lock();
        inner.sender = None;
        inner.unsubscribes += 1;
    }
}

/// Subscribes to a provider and forwards raw snapshots to one callback.
pub struct ReachabilityObserver {
    provider: Arc<dyn ConnectivityProvider>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl ReachabilityObserver {
    pub fn new(provider: Arc<dyn ConnectivityProvider>) -> Self {
        Self {
            provider,
            task: Mutex::new(None),
        }
    }

    fn task(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.task.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Begin observing. A second call while running is a no-op.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start<F>(&self, on_change: F) -> RhResult<()>
    where
        F: Fn(ConnectivityStatus) + Send + 'static,
    {
        let mut task = self.task();
        if task.is_some() {
            debug!("reachability observer already running");
            return Ok(());
        }

        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|_| RhError::Internal("reachability observer needs a tokio runtime".into()))?;
        let mut rx = self.provider.subscribe()?;

        *task = Some(runtime.spawn(async move {
            while let Some(status) = rx.recv().await {
                on_change(status);
            }
            debug!("connectivity provider closed its stream");
        }));
        info!("reachability observer started");
        Ok(())
    }

    /// Stop observing and release the provider subscription.
    ///
    /// Idempotent; the provider is unsubscribed exactly once per `start`.
    pub fn stop(&self) {
        let Some(handle) = self.task().take() else {
            return;
        };
        handle.abort();
        self.provider.unsubscribe();
        info!("reachability observer stopped");
    }

    pub fn is_running(&self) -> bool {
        self.task().is_some()
    }
}

impl Drop for ReachabilityObserver {
    fn drop(&mut self) {
        self.stop();
    }
}
