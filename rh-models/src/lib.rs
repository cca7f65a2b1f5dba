//! Ridehail Models - Shared data model and the in-process event bus.
//!
//! Everything that crosses a component boundary lives here:
//! - Connectivity snapshots and the events derived from them
//! - Typed ride, driver, chat and alert payloads exchanged with the server
//! - Notification records and kinds
//! - Transport connection state
//! - The closed `AppEvent` union and the `EventBus` that fans it out

pub mod models;
pub mod event;
pub mod event_bus;

// Re-export key types
pub use event::{AppEvent, EventKind, ServerEvent};
pub use event_bus::{EventBus, SubscriptionId};
pub use models::connectivity::{ConnectionType, ConnectivityEvent, ConnectivityStatus, Reachability};
pub use models::notification::{AppNotification, NotificationId, NotificationKind, NotificationRecord};
pub use models::transport::{TransportEvent, TransportState};
