//! CLI command implementations
//!
//! Commands are organized by domain:
//! - `core` - Database setup (init) and shared utilities (open_db)
//! - `import` - Export to and import from JSON documents
//! - `serve` - Web server command
//! - `stats` - Per-currency cost summary
//! - `subscriptions` - Subscription management commands

pub mod core;
pub mod import;
pub mod serve;
pub mod stats;
pub mod subscriptions;

// Re-export command functions for main.rs
pub use core::*;
pub use import::*;
pub use serve::*;
pub use stats::*;
pub use subscriptions::*;

use chrono::NaiveDate;

/// The local calendar date used for renewal and payment figures
pub fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

/// Shorten `s` to at most `max` characters, marking the cut with "..."
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Format an amount with its currency code
pub fn money(amount: f64, currency: &str) -> String {
    format!("{:.2} {}", amount, currency)
}
