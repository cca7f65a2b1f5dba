//! Active connectivity probe for desktop hosts.
//!
//! Desktop platforms have no connectivity callback we can subscribe to, so
//! this provider polls: a DNS lookup of the probe host stands in for "has a
//! link", and a TCP connect to it stands in for "internet reachable".

use std::net::SocketAddr;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::net::{lookup_host, TcpStream};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval, timeout, MissedTickBehavior};
use tracing::{debug, info, warn};

use rh_core::config::ConnectivityConfig;
use rh_core::error::{RhError, RhResult};
use rh_models::models::connectivity::ConnectivityStatus;

use crate::reachability::ConnectivityProvider;

/// Polling provider that probes a well-known host.
pub struct ProbeProvider {
    host: String,
    port: u16,
    period: Duration,
    probe_timeout: Duration,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl ProbeProvider {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        let defaults = ConnectivityConfig::default();
        Self {
            host: host.into(),
            port,
            period: Duration::from_millis(defaults.probe_interval_ms),
            probe_timeout: Duration::from_millis(defaults.probe_timeout_ms),
            task: Mutex::new(None),
        }
    }

    pub fn from_config(config: &ConnectivityConfig) -> Self {
        Self::new(config.probe_host.clone(), config.probe_port)
            .with_interval(Duration::from_millis(config.probe_interval_ms))
            .with_timeout(Duration::from_millis(config.probe_timeout_ms))
    }

    /// Set the polling period. A zero period is ignored.
    pub fn with_interval(mut self, period: Duration) -> Self {
        if period.is_zero() {
            warn!("ignoring zero probe interval, keeping {}ms", self.period.as_millis());
        } else {
            self.period = period;
        }
        self
    }

    /// Set the per-probe timeout. A zero timeout is ignored.
    pub fn with_timeout(mut self, probe_timeout: Duration) -> Self {
        if probe_timeout.is_zero() {
            warn!(
                "ignoring zero probe timeout, keeping {}ms",
                self.probe_timeout.as_millis()
            );
        } else {
            self.probe_timeout = probe_timeout;
        }
        self
    }

    fn task(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.task.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run a single probe.
    pub async fn probe_once(&self) -> ConnectivityStatus {
        probe(&self.host, self.port, self.probe_timeout).await
    }
}

async fn probe(host: &str, port: u16, limit: Duration) -> ConnectivityStatus {
    let addrs: Vec<SocketAddr> = match timeout(limit, lookup_host((host, port))).await {
        Ok(Ok(addrs)) => addrs.collect(),
        Ok(Err(e)) => {
            debug!("probe lookup of {host} failed: {e}");
            Vec::new()
        }
        Err(_) => {
            debug!("probe lookup of {host} timed out");
            Vec::new()
        }
    };

    let Some(addr) = addrs.first() else {
        return ConnectivityStatus::from_flags(false, Some(false));
    };

    let reachable = matches!(timeout(limit, TcpStream::connect(addr)).await, Ok(Ok(_)));
    debug!("probe {addr}: reachable={reachable}");
    ConnectivityStatus::from_flags(true, Some(reachable))
}

impl ConnectivityProvider for ProbeProvider {
    fn subscribe(&self) -> RhResult<mpsc::UnboundedReceiver<ConnectivityStatus>> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|_| RhError::Internal("probe provider needs a tokio runtime".into()))?;
        let (tx, rx) = mpsc::unbounded_channel();
        let host = self.host.clone();
        let port = self.port;
        let period = self.period;
        let limit = self.probe_timeout;

        let handle = runtime.spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if tx.send(probe(&host, port, limit).await).is_err() {
                    break;
                }
            }
        });

        if let Some(previous) = self.task().replace(handle) {
            previous.abort();
        }
        info!(
            "connectivity probe started ({}:{} every {}ms)",
            self.host,
            self.port,
            self.period.as_millis()
        );
        Ok(rx)
    }

    fn unsubscribe(&self) {
        if let Some(handle) = self.task().take() {
            handle.abort();
            info!("connectivity probe stopped");
        }
    }
}

impl Drop for ProbeProvider {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}
