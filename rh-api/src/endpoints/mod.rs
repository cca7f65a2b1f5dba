//! API endpoint modules organized by category.
//!
//! Each module adds typed methods to `ApiClient` for one group of routes.

pub mod auth;
pub mod payments;
pub mod profile;
pub mod rides;
