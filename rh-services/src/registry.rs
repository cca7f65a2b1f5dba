//! Application root.
//!
//! The registry builds every long-lived component exactly once, hands out
//! references to them, and owns their lifecycle: services start in
//! registration order and stop in reverse. UI layers wait on `ready()`
//! instead of polling for components to exist.

use std::sync::Arc;
use tokio::sync::{watch, RwLock};
use tracing::{error, info, warn};

use rh_api::ApiClient;
use rh_core::auth::TokenStore;
use rh_core::config::{AppConfig, ConfigHandle};
use rh_core::error::{RhError, RhResult};
use rh_core::platform::RuntimeTarget;
use rh_models::event_bus::EventBus;
use rh_socket::{Connector, ReconnectConfig, TransportClient};

use crate::connectivity::ConnectionService;
use crate::notification::NotificationQueue;
use crate::reachability::ConnectivityProvider;
use crate::service::{Service, ServiceState};

/// Central registry that owns the connectivity and real-time layer.
pub struct ServiceRegistry {
    config: ConfigHandle,
    bus: EventBus,
    tokens: Arc<dyn TokenStore>,
    api: ApiClient,
    transport: TransportClient,
    connection: ConnectionService,
    notifications: NotificationQueue,
    /// Registered services in initialization order.
    services: Vec<(String, Arc<RwLock<Box<dyn Service>>>)>,
    ready_tx: watch::Sender<bool>,
}

impl ServiceRegistry {
    /// Build every component from the configuration.
    ///
    /// Nothing is started; call `start` (or `register_all` + `init_all`).
    pub fn new(
        config: AppConfig,
        provider: Arc<dyn ConnectivityProvider>,
        connector: Arc<dyn Connector>,
        tokens: Arc<dyn TokenStore>,
    ) -> RhResult<Self> {
        config.validate()?;

        let bus = EventBus::new();
        let api = ApiClient::new(&config.server, RuntimeTarget::current(), tokens.clone())?;
        let transport = TransportClient::new(
            connector,
            tokens.clone(),
            bus.clone(),
            ReconnectConfig::from_config(&config.socket),
        );
        let connection = ConnectionService::new(provider, bus.clone());
        let notifications = NotificationQueue::new(bus.clone(), config.notifications.clone());
        let (ready_tx, _) = watch::channel(false);

        Ok(Self {
            config: ConfigHandle::new(config),
            bus,
            tokens,
            api,
            transport,
            connection,
            notifications,
            services: Vec::new(),
            ready_tx,
        })
    }

    /// Register a service. Services are initialized in registration order.
    pub fn register<S: Service + 'static>(&mut self, service: S) {
        let name = service.name().to_string();
        info!("registered service: {name}");
        self.services
            .push((name, Arc::new(RwLock::new(Box::new(service)))));
    }

    /// Register the built-in services.
    ///
    /// The notification queue goes first so it is listening before the
    /// first connectivity snapshot is published.
    pub fn register_all(&mut self) {
        self.register(self.notifications.clone());
        self.register(self.connection.clone());
        info!("registered {} default services", self.services.len());
    }

    /// Initialize all registered services in order.
    pub async fn init_all(&self) -> RhResult<()> {
        info!("initializing {} services", self.services.len());

        for (name, service) in &self.services {
            info!("initializing service: {name}");
            let mut svc = service.write().await;
            if let Err(e) = svc.init() {
                error!("failed to initialize service {name}: {e}");
                return Err(RhError::ServiceInit(format!("{name}: {e}")));
            }
        }

        info!("all services initialized");
        Ok(())
    }

    /// Register (if needed) and start everything, then open the transport.
    ///
    /// A missing token is not fatal: the transport stays disconnected
    /// until the user logs in and `transport().connect()` is called.
    pub async fn start(&mut self) -> RhResult<()> {
        if self.services.is_empty() {
            self.register_all();
        }
        self.init_all().await?;

        match self.transport.connect().await {
            Ok(()) => {}
            Err(RhError::MissingToken) => {
                warn!("no auth token, real-time transport stays offline until login");
            }
            Err(e) => return Err(e),
        }

        self.ready_tx.send_replace(true);
        info!("application ready");
        Ok(())
    }

    /// Disconnect the transport and shut down all services in reverse order.
    pub async fn shutdown_all(&self) -> RhResult<()> {
        info!("shutting down services");
        self.ready_tx.send_replace(false);
        self.transport.disconnect().await;

        for (name, service) in self.services.iter().rev() {
            info!("shutting down service: {name}");
            let mut svc = service.write().await;
            if let Err(e) = svc.shutdown() {
                error!("error shutting down service {name}: {e}");
                // Continue shutting down other services
            }
        }

        info!("all services shut down");
        Ok(())
    }

    /// Resolves once `start` has completed.
    pub async fn ready(&self) {
        let mut rx = self.ready_tx.subscribe();
        let _ = rx.wait_for(|ready| *ready).await;
    }

    pub fn is_ready(&self) -> bool {
        *self.ready_tx.borrow()
    }

    pub fn config(&self) -> &ConfigHandle {
        &self.config
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.bus
    }

    pub fn tokens(&self) -> &Arc<dyn TokenStore> {
        &self.tokens
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn transport(&self) -> &TransportClient {
        &self.transport
    }

    pub fn connection(&self) -> &ConnectionService {
        &self.connection
    }

    pub fn notifications(&self) -> &NotificationQueue {
        &self.notifications
    }

    /// Get the health status of all services.
    pub async fn health_check(&self) -> Vec<(String, ServiceState, bool)> {
        let mut results = Vec::new();
        for (name, service) in &self.services {
            let svc = service.read().await;
            results.push((name.clone(), svc.state(), svc.is_healthy()));
        }
        results
    }

    /// Get the number of registered services.
    pub fn service_count(&self) -> usize {
        self.services.len()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use async_trait::async_trait;
    use rh_core::auth::MemoryTokenStore;
    use rh_models::models::connectivity::ConnectivityStatus;
    use rh_models::models::notification::NotificationKind;
    use rh_models::models::transport::TransportState;
    use rh_socket::Connection;

    use super::*;
    use crate::reachability::ManualProvider;

    struct RefusingConnector;

    #[async_trait]
    impl Connector for RefusingConnector {
        async fn connect(&self, _token: &str) -> RhResult<Connection> {
            Err(RhError::Socket("connection refused".into()))
        }
    }

    fn registry(tokens: Arc<dyn TokenStore>) -> (Arc<ManualProvider>, ServiceRegistry) {
        let provider = Arc::new(ManualProvider::new());
        let registry = ServiceRegistry::new(
            AppConfig::default(),
            provider.clone(),
            Arc::new(RefusingConnector),
            tokens,
        )
        .unwrap();
        (provider, registry)
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let mut config = AppConfig::default();
        config.server.api_url = String::new();
        let result = ServiceRegistry::new(
            config,
            Arc::new(ManualProvider::new()),
            Arc::new(RefusingConnector),
            Arc::new(MemoryTokenStore::new()),
        );
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_register_all() {
        let (_provider, mut registry) = registry(Arc::new(MemoryTokenStore::new()));
        registry.register_all();
        assert_eq!(registry.service_count(), 2);
    }

    #[tokio::test]
    async fn test_start_without_token_is_ready_but_offline() {
        let (_provider, mut registry) = registry(Arc::new(MemoryTokenStore::new()));
        assert!(!registry.is_ready());

        registry.start().await.unwrap();
        assert!(registry.is_ready());
        registry.ready().await;
        assert_eq!(registry.transport().state(), TransportState::Disconnected);

        for (name, state, healthy) in registry.health_check().await {
            assert!(healthy, "service {name} is not healthy (state: {state})");
        }

        registry.shutdown_all().await.unwrap();
        registry.shutdown_all().await.unwrap();
        assert!(!registry.is_ready());
        for (_, state, _) in registry.health_check().await {
            assert_eq!(state, ServiceState::Stopped);
        }
    }

    #[tokio::test]
    async fn test_ready_waits_for_start() {
        let (_provider, mut registry) = registry(Arc::new(MemoryTokenStore::new()));
        let ready_rx = registry.ready_tx.subscribe();

        let waiter = tokio::spawn(async move {
            let mut rx = ready_rx;
            let reached = rx.wait_for(|ready| *ready).await.is_ok();
            reached
        });
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!waiter.is_finished());

        registry.start().await.unwrap();
        assert!(waiter.await.unwrap());
        registry.shutdown_all().await.unwrap();
    }

    #[tokio::test]
    async fn test_components_share_one_bus() {
        let (provider, mut registry) = registry(Arc::new(MemoryTokenStore::new()));
        registry.start().await.unwrap();

        let mut visible = registry.notifications().subscribe();
        provider.publish(ConnectivityStatus::offline());
        let records = visible
            .wait_for(|records| !records.is_empty())
            .await
            .unwrap()
            .clone();
        assert_eq!(records[0].kind, NotificationKind::Offline);
        assert!(!registry.connection().is_online());

        registry.shutdown_all().await.unwrap();
        assert_eq!(provider.unsubscribe_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_with_token_opens_transport() {
        let (_provider, mut registry) = registry(Arc::new(MemoryTokenStore::with_token("jwt")));
        registry.start().await.unwrap();
        assert!(registry.transport().state().is_active());

        registry.shutdown_all().await.unwrap();
        assert_eq!(registry.transport().state(), TransportState::Disconnected);
    }
}
