//! Ridehail Services - Connectivity, notifications and the application root.
//!
//! This crate provides the service trait and the components that sit
//! between the platform, the real-time transport and the UI:
//! - Reachability observation over a pluggable connectivity provider
//! - A desktop probe provider for hosts without a platform callback
//! - The connectivity state machine and the service that feeds it to the bus
//! - The notification presentation queue with per-record auto-dismissal
//! - The service registry that builds every component once and owns
//!   their lifecycle

pub mod service;
pub mod reachability;
pub mod probe;
pub mod connectivity;
pub mod notification;
pub mod registry;

// Re-export key types
pub use service::{Service, ServiceState};
pub use reachability::{ConnectivityProvider, ManualProvider, ReachabilityObserver};
pub use probe::ProbeProvider;
pub use connectivity::{ConnectionService, ConnectivityStateMachine};
pub use notification::NotificationQueue;
pub use registry::ServiceRegistry;
