//! Service trait and lifecycle management.
//!
//! Long-lived components implement `Service` so the registry can start
//! them in order, stop them in reverse, and report their health.

use rh_core::error::RhResult;

/// Lifecycle state of a service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceState {
    /// Service has been created but not initialized.
    Created,
    /// Service is running and ready.
    Running,
    /// Service has been stopped.
    Stopped,
    /// Service encountered a fatal error.
    Failed,
}

impl std::fmt::Display for ServiceState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Created => write!(f, "created"),
            Self::Running => write!(f, "running"),
            Self::Stopped => write!(f, "stopped"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// A component with a start/stop lifecycle.
///
/// Services are handles over shared state, so `init` and `shutdown` act on
/// every clone. Both must be safe to call more than once.
pub trait Service: Send + Sync {
    /// Human-readable name of this service.
    fn name(&self) -> &str;

    /// Current state of this service.
    fn state(&self) -> ServiceState;

    /// Start the service. Called once during application startup.
    fn init(&mut self) -> RhResult<()>;

    /// Stop the service. Called during application teardown.
    fn shutdown(&mut self) -> RhResult<()>;

    /// Health check. Returns true if the service is operational.
    fn is_healthy(&self) -> bool {
        self.state() == ServiceState::Running
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Counts real transitions so repeated calls can be checked.
    struct CountingService {
        state: ServiceState,
        starts: usize,
        stops: usize,
    }

    impl Service for CountingService {
        fn name(&self) -> &str { "counting" }
        fn state(&self) -> ServiceState { self.state }
        fn init(&mut self) -> RhResult<()> {
            if self.state != ServiceState::Running {
                self.starts += 1;
                self.state = ServiceState::Running;
            }
            Ok(())
        }
        fn shutdown(&mut self) -> RhResult<()> {
            if self.state == ServiceState::Running {
                self.stops += 1;
                self.state = ServiceState::Stopped;
            }
            Ok(())
        }
    }

    #[test]
    fn test_repeated_lifecycle_calls() {
        let mut svc = CountingService {
            state: ServiceState::Created,
            starts: 0,
            stops: 0,
        };
        assert!(!svc.is_healthy());

        svc.init().unwrap();
        svc.init().unwrap();
        assert!(svc.is_healthy());
        assert_eq!(svc.starts, 1);

        svc.shutdown().unwrap();
        svc.shutdown().unwrap();
        assert!(!svc.is_healthy());
        assert_eq!(svc.stops, 1);
    }

    #[test]
    fn test_service_state_display() {
        assert_eq!(ServiceState::Running.to_string(), "running");
        assert_eq!(ServiceState::Failed.to_string(), "failed");
    }
}
