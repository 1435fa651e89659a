//! SQLite storage with connection pooling and migrations
//!
//! - `subscriptions` - the [`SubscriptionRepository`](crate::SubscriptionRepository)
//!   implementation backed by this database

use std::sync::Arc;

use chrono::{DateTime, Utc};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use tempfile::TempDir;
use tracing::{debug, info};

use crate::error::{Error, Result};

mod subscriptions;


pub type DbPool = Pool<SqliteConnectionManager>;
pub type DbConn = PooledConnection<SqliteConnectionManager>;

/// Environment variable holding the database passphrase
pub const DB_KEY_ENV: &str = "SUBTRACK_DB_KEY";

/// Turn a passphrase into a SQLCipher raw key
///
/// The salt is fixed so a database file can be moved or renamed and still
/// open with the same passphrase. Changing it locks out existing databases.
fn derive_key(passphrase: &str) -> Result<String> {
    use argon2::{password_hash::SaltString, Argon2, PasswordHasher};

    const APP_SALT: &[u8; 16] = b"subtrack-salt-v1";

    let salt = SaltString::encode_b64(APP_SALT)
        .map_err(|e| Error::Encryption(format!("Failed to create salt: {}", e)))?;
    let hash = Argon2::default()
        .hash_password(passphrase.as_bytes(), &salt)
        .map_err(|e| Error::Encryption(format!("Failed to derive key: {}", e)))?;
    let output = hash
        .hash
        .ok_or_else(|| Error::Encryption("No hash output".to_string()))?;
    Ok(hex::encode(output.as_bytes()))
}

/// Parse a stored timestamp
///
/// Rows written by this crate hold RFC 3339; the SQLite default
/// `CURRENT_TIMESTAMP` format is accepted too.
pub(crate) fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| {
            chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").map(|dt| dt.and_utc())
        })
        .ok()
}

/// Pooled handle to a subtrack database
#[derive(Clone)]
pub struct Database {
    pool: DbPool,
    db_path: String,
    // Keeps the directory of a throwaway database alive as long as any clone
    _scratch: Option<Arc<TempDir>>,
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database").field("path", &self.db_path).finish()
    }
}

impl Database {
    /// Open an encrypted database, keyed from `SUBTRACK_DB_KEY`
    ///
    /// Fails when the variable is unset; use [`Database::new_unencrypted`]
    /// to opt out of encryption explicitly.
    pub fn new(path: &str) -> Result<Self> {
        match std::env::var(DB_KEY_ENV) {
            Ok(key) => Self::new_with_key(path, Some(&key)),
            Err(_) => Err(Error::Encryption(format!(
                "Database encryption required. Set {} or pass --no-encrypt.",
                DB_KEY_ENV
            ))),
        }
    }

    pub fn new_unencrypted(path: &str) -> Result<Self> {
        Self::new_with_key(path, None)
    }

    pub fn new_with_key(path: &str, passphrase: Option<&str>) -> Result<Self> {
        let manager = SqliteConnectionManager::file(path);

        let pool = match passphrase {
            Some(pass) => {
                let key_pragma = format!("PRAGMA key = 'x\"{}\"';", derive_key(pass)?);
                let manager = manager.with_init(move |conn| conn.execute_batch(&key_pragma));
                Pool::builder().max_size(8).build(manager)?
            }
            None => Pool::builder().max_size(8).build(manager)?,
        };

        let db = Self {
            pool,
            db_path: path.to_string(),
            _scratch: None,
        };
        db.run_migrations()?;
        info!(path, encrypted = passphrase.is_some(), "Database opened");
        Ok(db)
    }

    /// Unencrypted database in a private temporary directory
    ///
    /// A file is used instead of `:memory:` so every pooled connection sees
    /// the same data. The directory is removed when the last clone drops.
    pub fn in_memory() -> Result<Self> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("subtrack.db");
        let mut db = Self::new_unencrypted(&path.to_string_lossy())?;
        db._scratch = Some(Arc::new(dir));
        Ok(db)
    }

    pub fn conn(&self) -> Result<DbConn> {
        Ok(self.pool.get()?)
    }

    fn run_migrations(&self) -> Result<()> {
        let conn = self.conn()?;

        conn.execute_batch(
            r#"
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;

            CREATE TABLE IF NOT EXISTS subscriptions (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                title TEXT NOT NULL,
                description TEXT,
                url TEXT,
                price REAL NOT NULL,
                -- JSON array of {amount, dayOfMonth, startDate}; NULL for simple subscriptions
                charges TEXT,
                currency TEXT NOT NULL,
                recurring_duration TEXT NOT NULL,
                start_date DATE NOT NULL,
                created_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP
            );

            CREATE INDEX IF NOT EXISTS idx_subscriptions_user ON subscriptions(user_id);
            "#,
        )?;

        debug!("Migrations complete");
        Ok(())
    }
}
