//! Server command implementation

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use subtrack_server::{parse_api_keys, ServerConfig};

use super::open_db;

pub async fn cmd_serve(
    db_path: &Path,
    host: &str,
    port: u16,
    no_auth: bool,
    no_encrypt: bool,
    static_dir: Option<&Path>,
    user: &str,
) -> Result<()> {
    println!("🚀 Starting Subtrack web server...");
    println!("   Database: {}", db_path.display());
    println!("   Listening: http://{}:{}", host, port);
    if let Some(dir) = static_dir {
        println!("   Static files: {}", dir.display());
    }

    // key=user_id pairs, comma-separated
    let api_keys = parse_api_keys(&std::env::var("SUBTRACK_API_KEYS").unwrap_or_default());

    if no_auth {
        println!();
        println!("   ⚠️  Authentication DISABLED - every request acts as '{}'", user);
        println!("      Do not expose to network!");
    } else {
        println!("   🔒 Authentication: access proxy header");
        if !api_keys.is_empty() {
            println!(
                "   🔑 API keys: {} configured (SUBTRACK_API_KEYS)",
                api_keys.len()
            );
        }
    }
    println!();

    let db = open_db(db_path, no_encrypt)?;
    let static_dir = static_dir
        .map(|dir| dir.to_str().context("Static directory path is not valid UTF-8"))
        .transpose()?;

    let config = ServerConfig {
        require_auth: !no_auth,
        api_keys,
        dev_user: user.to_string(),
        ..Default::default()
    };

    subtrack_server::serve_with_config(Arc::new(db), host, port, static_dir, config).await
}
