//! Ridehail Socket - real-time transport client.
//!
//! This crate provides:
//! - The JSON frame codec used on the wire (`{"event": ..., "data": ...}`)
//! - A `Connector` abstraction with a WebSocket implementation
//! - `TransportClient`, which owns the connect/authenticate/reconnect
//!   lifecycle, publishes inbound server events onto the event bus, and
//!   exposes the outbound ride/driver/chat actions

pub mod frame;
pub mod manager;
pub mod transport;

pub use frame::Frame;
pub use manager::{ReconnectConfig, TransportClient};
pub use transport::{Connection, Connector, WsConnector};
