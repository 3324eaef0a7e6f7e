//! TTL-bounded result cache keyed by step fingerprint
//!
//! Consulted before the runner is invoked and populated after a
//! successful run. Expiry is lazy: checked on read, stale rows deleted
//! as they are seen. A disabled cache misses on every get and drops
//! every put.

mod fingerprint;

pub use fingerprint::fingerprint;

use anyhow::{Context, Result};
use rusqlite::{Connection, OptionalExtension};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

/// Persistent result cache
///
/// Concurrent access from parallel steps goes through the inner
/// connection lock; each get/put is a single atomic statement, so
/// unrelated fingerprints never interfere.
pub struct ResultCache {
    conn: Option<Mutex<Connection>>,
    ttl: Duration,
}

impl ResultCache {
    /// Open or create the cache database
    pub fn open(path: &Path, ttl: Duration) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("failed to open result cache at {}", path.display()))?;

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS results (
                fingerprint TEXT PRIMARY KEY,
                payload TEXT NOT NULL,
                expires_at TEXT NOT NULL,
                created_at TEXT NOT NULL
            );
            "#,
        )?;

        Ok(Self {
            conn: Some(Mutex::new(conn)),
            ttl,
        })
    }

    /// In-memory cache, useful for tests and single runs
    pub fn in_memory(ttl: Duration) -> Result<Self> {
        Self::open(Path::new(":memory:"), ttl)
    }

    /// A cache that never hits and never stores
    pub fn disabled() -> Self {
        Self {
            conn: None,
            ttl: Duration::ZERO,
        }
    }

    /// Whether this cache stores anything
    pub fn is_enabled(&self) -> bool {
        self.conn.is_some()
    }

    /// Get the default cache database path
    pub fn default_path() -> Result<PathBuf> {
        let data_dir = dirs::data_dir().context("could not determine data directory")?;
        let cache_dir = data_dir.join("taskline");
        std::fs::create_dir_all(&cache_dir)
            .with_context(|| format!("failed to create {}", cache_dir.display()))?;
        Ok(cache_dir.join("results.db"))
    }

    /// Look up a cached result; expired entries are removed and miss
    pub fn get(&self, fingerprint: &str) -> Result<Option<String>> {
        let Some(ref conn) = self.conn else {
            return Ok(None);
        };
        let conn = conn.lock().expect("cache lock poisoned");

        let now = chrono::Utc::now().to_rfc3339();
        let row: Option<(String, String)> = conn
            .query_row(
                "SELECT payload, expires_at FROM results WHERE fingerprint = ?1",
                [fingerprint],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        match row {
            Some((payload, expires_at)) if expires_at > now => Ok(Some(payload)),
            Some(_) => {
                conn.execute("DELETE FROM results WHERE fingerprint = ?1", [fingerprint])?;
                Ok(None)
            }
            None => Ok(None),
        }
    }

    /// Store a result under its fingerprint
    pub fn put(&self, fingerprint: &str, payload: &str) -> Result<()> {
        let Some(ref conn) = self.conn else {
            return Ok(());
        };
        let conn = conn.lock().expect("cache lock poisoned");

        let now = chrono::Utc::now();
        let expires_at = now + chrono::Duration::from_std(self.ttl).unwrap_or_default();

        conn.execute(
            "INSERT INTO results (fingerprint, payload, expires_at, created_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(fingerprint) DO UPDATE SET
                payload = excluded.payload,
                expires_at = excluded.expires_at",
            (
                fingerprint,
                payload,
                expires_at.to_rfc3339(),
                now.to_rfc3339(),
            ),
        )?;

        Ok(())
    }

    /// Remove expired entries eagerly (space reclamation only)
    pub fn sweep(&self) -> Result<usize> {
        let Some(ref conn) = self.conn else {
            return Ok(0);
        };
        let conn = conn.lock().expect("cache lock poisoned");

        let now = chrono::Utc::now().to_rfc3339();
        let removed = conn.execute("DELETE FROM results WHERE expires_at <= ?1", [now])?;
        Ok(removed)
    }
}
