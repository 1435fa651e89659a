//! Core command implementations and shared utilities
//!
//! This module contains:
//! - `open_db` - Shared utility to open the database
//! - `cmd_init` - Initialize the database

use std::path::Path;

use anyhow::{Context, Result};
use subtrack_core::Database;
use tracing::debug;

/// Open database with encryption by default, or unencrypted if --no-encrypt
pub fn open_db(db_path: &Path, no_encrypt: bool) -> Result<Database> {
    let path_str = db_path
        .to_str()
        .context("Database path is not valid UTF-8")?;
    debug!(path = %path_str, encrypted = !no_encrypt, "Opening database");
    if no_encrypt {
        Database::new_unencrypted(path_str).context("Failed to open database (unencrypted)")
    } else {
        Database::new(path_str).context("Failed to open database")
    }
}

pub fn cmd_init(db_path: &Path, no_encrypt: bool) -> Result<()> {
    println!("🔧 Initializing database at {}...", db_path.display());

    // Opening runs the migrations
    open_db(db_path, no_encrypt)?;

    if no_encrypt {
        println!("   ⚠️  Encryption: DISABLED (--no-encrypt)");
    } else {
        println!("   🔒 Encryption: ENABLED");
    }

    println!("✅ Database initialized successfully!");
    println!();
    println!("Next steps:");
    println!("  1. Add a subscription: subtrack subscriptions add --title Netflix --price 15.49 --start 2024-01-31");
    println!("  2. Or import a backup: subtrack import --file subscriptions.json");
    println!("  3. Start web UI: subtrack serve");

    Ok(())
}
