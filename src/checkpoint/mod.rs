//! Run checkpoints - persisted snapshots enabling resume

mod store;

pub use store::{CheckpointNotFound, CheckpointStore};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Metadata attached to a checkpoint at run start
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CheckpointMetadata {
    /// Repository / working directory the run targets
    pub working_dir: Option<PathBuf>,

    /// Optional feature description for operator inspection
    pub description: Option<String>,
}

/// A persisted snapshot of run progress
///
/// Written after every task completion and from the auto-save timer;
/// resuming re-hydrates the engine's task set so finished steps are
/// never re-invoked.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Unique checkpoint id
    pub id: String,

    /// Workflow this run belongs to
    pub workflow_name: String,

    /// When the run started
    pub started_at: DateTime<Utc>,

    /// Last save time (last-write-wins under concurrent saves)
    pub last_updated_at: DateTime<Utc>,

    /// Steps that reached Succeeded
    pub completed_tasks: Vec<String>,

    /// Steps that reached Failed
    pub failed_tasks: Vec<String>,

    /// Step currently being dispatched, if any
    pub current_step: Option<String>,

    /// Result payloads by step name
    pub results: HashMap<String, String>,

    /// Run metadata
    #[serde(default)]
    pub metadata: CheckpointMetadata,
}

impl Checkpoint {
    /// Create a fresh checkpoint for a new run
    pub fn new(workflow_name: impl Into<String>) -> Self {
        let workflow_name = workflow_name.into();
        let now = Utc::now();
        let id = format!("{}-{}", workflow_name, now.format("%Y%m%d-%H%M%S%3f"));

        Self {
            id,
            workflow_name,
            started_at: now,
            last_updated_at: now,
            completed_tasks: Vec::new(),
            failed_tasks: Vec::new(),
            current_step: None,
            results: HashMap::new(),
            metadata: CheckpointMetadata::default(),
        }
    }

    /// Record a successful step
    pub fn record_completed(&mut self, step: &str, result: String) {
        if !self.completed_tasks.iter().any(|s| s == step) {
            self.completed_tasks.push(step.to_string());
        }
        self.results.insert(step.to_string(), result);
        self.touch();
    }

    /// Record a failed step
    pub fn record_failed(&mut self, step: &str) {
        if !self.failed_tasks.iter().any(|s| s == step) {
            self.failed_tasks.push(step.to_string());
        }
        self.touch();
    }

    /// Update the save timestamp
    pub fn touch(&mut self) {
        self.last_updated_at = Utc::now();
    }

    /// Whether this step already reached a terminal state
    pub fn is_settled(&self, step: &str) -> bool {
        self.completed_tasks.iter().any(|s| s == step)
            || self.failed_tasks.iter().any(|s| s == step)
    }
}
