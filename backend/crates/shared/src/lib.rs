//! Shared Kernel
//!
//! The vocabulary every marketplace crate agrees on:
//! - the unified error type and its HTTP classification
//! - typed integer identifiers for persisted records
//! - offset pagination for list endpoints
//! - deferred path and query extractors (feature `axum`)
//!
//! Nothing here knows about sessions, listings or orders.

pub mod error {
    pub mod app_error;
    pub mod problem;
    pub mod kind;
}
#[cfg(feature = "axum")]
pub mod extract;
pub mod id;
pub mod pagination;
