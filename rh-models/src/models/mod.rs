//! Data model types grouped by concern.

pub mod connectivity;
pub mod notification;
pub mod ride;
pub mod transport;
