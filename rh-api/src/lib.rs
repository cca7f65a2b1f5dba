//! Ridehail API - HTTP client for the ride-hailing server.
//!
//! The server does all the real work (pricing, matching, payments); this
//! crate only carries requests there. It handles bearer authentication from
//! the shared token store, web/native base URL selection, retry with
//! exponential backoff on gateway errors, and the `{success, data, message}`
//! response envelope.

pub mod client;
pub mod endpoints;
pub mod response;

// Re-export key types
pub use client::{ApiClient, RetryConfig};
pub use endpoints::auth::User;
pub use endpoints::payments::Payment;
pub use endpoints::rides::{FareEstimate, Ride};
pub use response::ApiResponse;
