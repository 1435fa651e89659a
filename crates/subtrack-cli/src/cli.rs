//! CLI argument definitions using clap
//!
//! The command implementations live in the `commands` module.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use subtrack_core::{ChargeInput, SubscriptionInput};

/// Subtrack - Know what your subscriptions cost
#[derive(Parser)]
#[command(name = "subtrack")]
#[command(about = "Self-hosted subscription tracker", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Database path
    #[arg(long, default_value = "subtrack.db", global = true)]
    pub db: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable database encryption (not recommended for production)
    ///
    /// By default, the database is encrypted using SQLCipher.
    /// Set SUBTRACK_DB_KEY environment variable with your passphrase.
    #[arg(long, global = true)]
    pub no_encrypt: bool,

    /// User whose subscriptions are read and written
    #[arg(long, env = "SUBTRACK_USER", default_value = "local", global = true)]
    pub user: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize the database
    Init,

    /// Start the web server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "3000")]
        port: u16,

        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Disable authentication; every request acts as --user
        #[arg(long)]
        no_auth: bool,

        /// Directory of static UI files to serve
        #[arg(long)]
        static_dir: Option<PathBuf>,
    },

    /// Manage subscriptions (list, add, show, remove)
    Subscriptions {
        #[command(subcommand)]
        action: Option<SubscriptionsAction>,
    },

    /// Cost summary per currency
    Stats {
        /// Only this currency (e.g. USD)
        #[arg(short, long)]
        currency: Option<String>,
    },

    /// Export subscriptions as a JSON document
    Export {
        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Import subscriptions from an export document
    Import {
        /// JSON file to import
        #[arg(short, long)]
        file: PathBuf,

        /// Replace all existing subscriptions instead of merging
        #[arg(long)]
        replace: bool,
    },
}

#[derive(Subcommand)]
pub enum SubscriptionsAction {
    /// List subscriptions with their next renewal
    List,

    /// Add a subscription
    Add(AddArgs),

    /// Show renewal, cost and payment history for one subscription
    Show {
        /// Subscription ID
        id: String,
    },

    /// Delete a subscription
    Remove {
        /// Subscription ID
        id: String,
    },
}

#[derive(Args)]
pub struct AddArgs {
    /// Display name
    #[arg(short, long)]
    pub title: String,

    /// Price per billing cycle (omit when using --charge)
    #[arg(short, long)]
    pub price: Option<f64>,

    /// Currency code
    #[arg(short, long, default_value = "USD")]
    pub currency: String,

    /// Billing cycle: weekly, bi-weekly, monthly, quarterly, semi-annually, yearly
    #[arg(long, default_value = "monthly")]
    pub cycle: String,

    /// First billing date (YYYY-MM-DD)
    #[arg(short, long)]
    pub start: Option<String>,

    /// Link to the provider
    #[arg(long)]
    pub url: Option<String>,

    /// Free-form notes
    #[arg(short, long)]
    pub description: Option<String>,

    /// Extra charge as AMOUNT@DAY@YYYY-MM-DD (repeatable)
    #[arg(long = "charge", value_parser = parse_charge)]
    pub charges: Vec<ChargeInput>,
}

impl AddArgs {
    pub fn into_input(self) -> SubscriptionInput {
        SubscriptionInput {
            title: self.title,
            description: self.description,
            url: self.url,
            price: self.price,
            charges: (!self.charges.is_empty()).then_some(self.charges),
            currency: self.currency,
            recurring_duration: Some(self.cycle),
            start_date: self.start,
        }
    }
}

/// Parse `AMOUNT@DAY@DATE`; range checks are left to the validator
pub fn parse_charge(s: &str) -> Result<ChargeInput, String> {
    let parts: Vec<&str> = s.split('@').map(str::trim).collect();
    let [amount, day, start] = parts.as_slice() else {
        return Err(format!("expected AMOUNT@DAY@YYYY-MM-DD, got '{}'", s));
    };

    let amount = amount
        .parse::<f64>()
        .map_err(|_| format!("invalid charge amount '{}'", amount))?;
    let day = day
        .parse::<i64>()
        .map_err(|_| format!("invalid day of month '{}'", day))?;

    Ok(ChargeInput {
        amount: Some(amount),
        day_of_month: Some(day),
        start_date: Some(start.to_string()),
    })
}
