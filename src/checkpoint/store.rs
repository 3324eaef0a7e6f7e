//! SQLite-backed checkpoint persistence

use super::Checkpoint;
use anyhow::{Context, Result};
use rusqlite::{Connection, OptionalExtension};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use thiserror::Error;

/// Resume was requested with an id that does not exist
///
/// A user error, not a crash; the CLI reports it and exits.
#[derive(Debug, Clone, Error)]
#[error("checkpoint '{id}' not found")]
pub struct CheckpointNotFound {
    pub id: String,
}

/// Persists, loads, lists and deletes checkpoints
///
/// `save` is an upsert keyed by checkpoint id, so concurrent saves of
/// the same id are last-write-wins on `last_updated_at`.
pub struct CheckpointStore {
    conn: Mutex<Connection>,
}

impl CheckpointStore {
    /// Open or create the checkpoint database
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("failed to open checkpoint store at {}", path.display()))?;

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS checkpoints (
                id TEXT PRIMARY KEY,
                workflow_name TEXT NOT NULL,
                started_at TEXT NOT NULL,
                last_updated_at TEXT NOT NULL,
                snapshot TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_checkpoints_workflow
                ON checkpoints(workflow_name);
            "#,
        )?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// In-memory store, useful for tests
    pub fn in_memory() -> Result<Self> {
        Self::open(Path::new(":memory:"))
    }

    /// Get the default checkpoint database path
    pub fn default_path() -> Result<PathBuf> {
        let data_dir = dirs::data_dir().context("could not determine data directory")?;
        let store_dir = data_dir.join("taskline");
        std::fs::create_dir_all(&store_dir)
            .with_context(|| format!("failed to create {}", store_dir.display()))?;
        Ok(store_dir.join("checkpoints.db"))
    }

    /// Save (upsert) a checkpoint
    pub fn save(&self, checkpoint: &Checkpoint) -> Result<()> {
        let snapshot = serde_json::to_string(checkpoint)?;
        let conn = self.conn.lock().expect("checkpoint lock poisoned");

        conn.execute(
            "INSERT INTO checkpoints (id, workflow_name, started_at, last_updated_at, snapshot)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(id) DO UPDATE SET
                last_updated_at = excluded.last_updated_at,
                snapshot = excluded.snapshot",
            (
                &checkpoint.id,
                &checkpoint.workflow_name,
                checkpoint.started_at.to_rfc3339(),
                checkpoint.last_updated_at.to_rfc3339(),
                &snapshot,
            ),
        )?;

        Ok(())
    }

    /// Load a checkpoint by id
    pub fn load(&self, id: &str) -> Result<Checkpoint> {
        let conn = self.conn.lock().expect("checkpoint lock poisoned");

        let snapshot: Option<String> = conn
            .query_row("SELECT snapshot FROM checkpoints WHERE id = ?1", [id], |row| {
                row.get(0)
            })
            .optional()?;

        let snapshot = snapshot.ok_or_else(|| CheckpointNotFound { id: id.to_string() })?;
        let checkpoint = serde_json::from_str(&snapshot)
            .with_context(|| format!("corrupt checkpoint snapshot '{}'", id))?;

        Ok(checkpoint)
    }

    /// List all checkpoints, most recently updated first
    pub fn list(&self) -> Result<Vec<Checkpoint>> {
        let conn = self.conn.lock().expect("checkpoint lock poisoned");

        let mut stmt = conn.prepare(
            "SELECT snapshot FROM checkpoints ORDER BY last_updated_at DESC",
        )?;

        let snapshots = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;

        snapshots
            .iter()
            .map(|s| serde_json::from_str(s).context("corrupt checkpoint snapshot"))
            .collect()
    }

    /// Delete a checkpoint by id
    pub fn delete(&self, id: &str) -> Result<()> {
        let conn = self.conn.lock().expect("checkpoint lock poisoned");

        let removed = conn.execute("DELETE FROM checkpoints WHERE id = ?1", [id])?;
        if removed == 0 {
            return Err(CheckpointNotFound { id: id.to_string() }.into());
        }

        Ok(())
    }
}
