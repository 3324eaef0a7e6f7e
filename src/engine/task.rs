//! Runtime task instances and their state machine

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Task lifecycle states
///
/// `Pending → Running → {Succeeded, Failed}`. A task whose dependency
/// failed is moved to `Skipped` rather than left pending forever, so
/// the final result can account for every task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Pending,
    Running,
    Succeeded,
    Failed,
    Skipped,
}

impl TaskStatus {
    /// Whether the task can no longer change state
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskStatus::Succeeded | TaskStatus::Failed | TaskStatus::Skipped
        )
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Running => "running",
            TaskStatus::Succeeded => "succeeded",
            TaskStatus::Failed => "failed",
            TaskStatus::Skipped => "skipped",
        };
        f.write_str(s)
    }
}

/// The runtime instance of a step within one run
///
/// Created when the engine first schedules the step, mutated on every
/// status transition, never destroyed mid-run; its final state feeds
/// the workflow result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentTask {
    /// Step this task instantiates
    pub step_name: String,

    /// Role the step runs under
    pub role: String,

    /// Current lifecycle state
    pub status: TaskStatus,

    /// When the task was created
    pub created_at: DateTime<Utc>,

    /// When the task last changed status
    pub updated_at: DateTime<Utc>,

    /// Runner invocations so far
    pub attempts: u32,

    /// Opaque result payload, present once succeeded
    pub result: Option<String>,

    /// Error message, present iff failed
    pub error: Option<String>,
}

impl AgentTask {
    /// Create a pending task for a step
    pub fn new(step_name: impl Into<String>, role: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            step_name: step_name.into(),
            role: role.into(),
            status: TaskStatus::Pending,
            created_at: now,
            updated_at: now,
            attempts: 0,
            result: None,
            error: None,
        }
    }

    /// Transition to a new status
    pub fn transition(&mut self, status: TaskStatus) {
        self.status = status;
        self.updated_at = Utc::now();
    }

    /// Mark succeeded with a result payload
    pub fn succeed(&mut self, result: String) {
        self.result = Some(result);
        self.error = None;
        self.transition(TaskStatus::Succeeded);
    }

    /// Mark failed with an error message
    pub fn fail(&mut self, error: String) {
        self.error = Some(error);
        self.transition(TaskStatus::Failed);
    }
}
