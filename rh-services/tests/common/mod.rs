//! Shared test utilities for integration tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::mpsc;

use rh_core::auth::{MemoryTokenStore, TokenStore};
use rh_core::config::AppConfig;
use rh_core::error::{RhError, RhResult};
use rh_models::models::connectivity::ConnectivityStatus;
use rh_services::{ManualProvider, ServiceRegistry};
use rh_socket::{Connection, Connector, Frame};

/// What the mock server does with the next connect attempt.
pub enum Script {
    Refuse,
    Open,
}

/// Server side of an open mock session.
pub struct ServerEnd {
    pub to_client: mpsc::UnboundedSender<Frame>,
    pub from_client: mpsc::UnboundedReceiver<Frame>,
}

/// Connector that follows a script, refusing once the script runs out.
pub struct ScriptedConnector {
    scripts: Mutex<VecDeque<Script>>,
    attempts: AtomicUsize,
    sessions: mpsc::UnboundedSender<ServerEnd>,
}

impl ScriptedConnector {
    pub fn new(scripts: Vec<Script>) -> (Arc<Self>, mpsc::UnboundedReceiver<ServerEnd>) {
        let (sessions, rx) = mpsc::unbounded_channel();
        let connector = Arc::new(Self {
            scripts: Mutex::new(scripts.into()),
            attempts: AtomicUsize::new(0),
            sessions,
        });
        (connector, rx)
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Connector for ScriptedConnector {
    async fn connect(&self, _token: &str) -> RhResult<Connection> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let next = self.scripts.lock().unwrap().pop_front();
        match next.unwrap_or(Script::Refuse) {
            Script::Refuse => Err(RhError::Socket("connection refused".into())),
            Script::Open => {
                let (to_client, inbound) = mpsc::unbounded_channel();
                let (outbound, from_client) = mpsc::unbounded_channel();
                let _ = self.sessions.send(ServerEnd {
                    to_client,
                    from_client,
                });
                Ok(Connection::new(outbound, inbound))
            }
        }
    }
}

/// Everything a registry-level test needs to drive the layer.
pub struct TestApp {
    pub registry: ServiceRegistry,
    pub provider: Arc<ManualProvider>,
    pub connector: Arc<ScriptedConnector>,
    pub sessions: mpsc::UnboundedReceiver<ServerEnd>,
    pub tokens: Arc<MemoryTokenStore>,
}

/// Build a registry over a manual provider and a scripted connector.
pub fn create_test_app(scripts: Vec<Script>, token: Option<&str>) -> TestApp {
    let provider = Arc::new(ManualProvider::new());
    let (connector, sessions) = ScriptedConnector::new(scripts);
    let tokens = Arc::new(match token {
        Some(t) => MemoryTokenStore::with_token(t),
        None => MemoryTokenStore::new(),
    });
    let shared: Arc<dyn TokenStore> = tokens.clone();
    let registry = ServiceRegistry::new(
        AppConfig::default(),
        provider.clone(),
        connector.clone(),
        shared,
    )
    .expect("default config should build a registry");
    TestApp {
        registry,
        provider,
        connector,
        sessions,
        tokens,
    }
}

pub fn snapshot(connected: bool, reachable: Option<bool>) -> ConnectivityStatus {
    ConnectivityStatus::from_flags(connected, reachable)
}
