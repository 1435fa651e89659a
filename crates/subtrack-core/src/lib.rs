//! Subtrack Core Library
//!
//! Shared functionality for the subtrack subscription tracker:
//! - Subscription model and input types
//! - Validation of the price/start date/charges invariant
//! - Recurrence calculations (next renewal, payment history, monthly cost)
//! - Per-currency portfolio statistics
//! - Repository interface with in-memory and SQLite implementations
//! - JSON export and merge/replace import

pub mod db;
pub mod error;
pub mod export;
pub mod models;
pub mod recurrence;
pub mod repository;
pub mod service;
pub mod stats;
pub mod validate;

pub use db::Database;
pub use error::{Error, ErrorKind, Result, ValidationErrors};
pub use export::{
    export_subscriptions, import_json, import_subscriptions, ExportDocument, ImportMode,
    ImportOptions, ImportOutcome, EXPORT_VERSION,
};
pub use models::{
    Charge, ChargeInput, NewSubscription, RecurringDuration, Subscription, SubscriptionInput,
    SubscriptionPatch,
};
pub use recurrence::{
    monthly_cost, monthly_equivalent, next_renewal_date, payment_history, renewal_outlook,
    total_spent, Payment, PaymentStatus, RenewalOutlook, SubscriptionDetails,
};
pub use repository::{MemoryRepository, SubscriptionRepository};
pub use service::{create_subscription, delete_subscription, get_subscription, update_subscription};
pub use stats::{group_by_currency, portfolio_stats, stats_by_currency, PortfolioStats};
pub use validate::validate_subscription;
