//! HTTP request handlers organized by domain
//!
//! Each submodule contains handlers for a specific API area.

pub mod auth;
pub mod export;
pub mod stats;
pub mod subscriptions;

// Re-export all handlers for use in router
pub use auth::*;
pub use export::*;
pub use stats::*;
pub use subscriptions::*;

/// Calendar date the renewal math runs against
pub(crate) fn today() -> chrono::NaiveDate {
    chrono::Utc::now().date_naive()
}
