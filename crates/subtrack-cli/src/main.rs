//! Subtrack CLI - Track recurring subscriptions and what they cost
//!
//! Usage:
//!   subtrack init                      Initialize database
//!   subtrack subscriptions add ...     Add a subscription
//!   subtrack stats                     Per-currency cost summary
//!   subtrack serve --port 3000         Start web server

mod cli;
mod commands;


use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .init();

    let today = commands::today();

    match cli.command {
        Commands::Init => commands::cmd_init(&cli.db, cli.no_encrypt),
        Commands::Serve {
            port,
            host,
            no_auth,
            static_dir,
        } => {
            commands::cmd_serve(
                &cli.db,
                &host,
                port,
                no_auth,
                cli.no_encrypt,
                static_dir.as_deref(),
                &cli.user,
            )
            .await
        }
        Commands::Subscriptions { action } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            match action {
                None | Some(SubscriptionsAction::List) => {
                    commands::cmd_subscriptions_list(&db, &cli.user, today)
                }
                Some(SubscriptionsAction::Add(args)) => {
                    commands::cmd_subscriptions_add(&db, &cli.user, args.into_input())
                        .map(|_| ())
                }
                Some(SubscriptionsAction::Show { id }) => {
                    commands::cmd_subscriptions_show(&db, &cli.user, &id, today)
                }
                Some(SubscriptionsAction::Remove { id }) => {
                    commands::cmd_subscriptions_remove(&db, &cli.user, &id)
                }
            }
        }
        Commands::Stats { currency } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            commands::cmd_stats(&db, &cli.user, currency.as_deref(), today)
        }
        Commands::Export { output } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            commands::cmd_export(&db, &cli.user, output.as_deref())
        }
        Commands::Import { file, replace } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            commands::cmd_import(&db, &cli.user, &file, replace).map(|_| ())
        }
    }
}
