//! Core types and traits for step runners

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Error types that can occur while running a step
#[derive(Debug, Clone, Error)]
pub enum RunnerError {
    /// Step work exceeded its time budget
    #[error("timeout after {elapsed:?}")]
    Timeout { elapsed: Duration },

    /// Step work ran but failed
    #[error("execution failed (exit code {exit_code:?}): {stderr}")]
    ExecutionFailed {
        exit_code: Option<i32>,
        stdout: String,
        stderr: String,
    },

    /// The runner could not start the work at all
    #[error("failed to start runner: {message}")]
    Spawn { message: String },

    /// Invalid runner configuration
    #[error("invalid runner configuration: {message}")]
    Config { message: String },
}

impl RunnerError {
    /// Check if this error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            RunnerError::Timeout { .. } | RunnerError::ExecutionFailed { .. }
        )
    }

    /// Create a timeout error
    pub fn timeout(elapsed: Duration) -> Self {
        Self::Timeout { elapsed }
    }

    /// Create an execution failed error
    pub fn execution_failed(exit_code: Option<i32>, stdout: String, stderr: String) -> Self {
        Self::ExecutionFailed {
            exit_code,
            stdout,
            stderr,
        }
    }

    /// Create a spawn error
    pub fn spawn(message: impl Into<String>) -> Self {
        Self::Spawn {
            message: message.into(),
        }
    }
}

/// Request to run one step's work
#[derive(Debug, Clone)]
pub struct TaskRequest {
    /// Name of the step being run
    pub step_name: String,

    /// Role the step runs under
    pub role: String,

    /// Step description (the work prompt for command runners)
    pub description: String,

    /// Working directory for the request
    pub working_dir: Option<PathBuf>,

    /// Override timeout for this request
    pub timeout: Option<Duration>,
}

impl TaskRequest {
    /// Create a request for a step
    pub fn new(step_name: impl Into<String>, role: impl Into<String>) -> Self {
        Self {
            step_name: step_name.into(),
            role: role.into(),
            description: String::new(),
            working_dir: None,
            timeout: None,
        }
    }

    /// Set the description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Set working directory
    pub fn with_working_dir(mut self, dir: PathBuf) -> Self {
        self.working_dir = Some(dir);
        self
    }

    /// Set timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Output from a completed step run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskOutput {
    /// Opaque result payload
    pub payload: String,

    /// Runner that produced this output
    pub runner: String,

    /// Time taken to run
    pub duration: Duration,
}

impl TaskOutput {
    pub fn new(payload: String, runner: String, duration: Duration) -> Self {
        Self {
            payload,
            runner,
            duration,
        }
    }
}

/// Trait for step runners
///
/// The engine is agnostic to what a runner does; a no-op runner and a
/// runner that shells out to an external tool are both valid.
#[async_trait]
pub trait Runner: Send + Sync {
    /// Run one step's work
    async fn execute(&self, request: &TaskRequest) -> Result<TaskOutput, RunnerError>;

    /// Get the runner name
    fn name(&self) -> &str;
}

/// Implement Runner for Box<dyn Runner>
#[async_trait]
impl Runner for Box<dyn Runner> {
    async fn execute(&self, request: &TaskRequest) -> Result<TaskOutput, RunnerError> {
        (**self).execute(request).await
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_runner_error_retryable() {
        assert!(RunnerError::timeout(Duration::from_secs(30)).is_retryable());
        assert!(RunnerError::execution_failed(Some(1), "".into(), "boom".into()).is_retryable());

        assert!(!RunnerError::spawn("no such binary").is_retryable());
        assert!(
            !RunnerError::Config {
                message: "bad".into()
            }
            .is_retryable()
        );
    }

    #[test]
    fn test_task_request_builder() {
        let request = TaskRequest::new("analyze", "analyzer")
            .with_description("Find bugs")
            .with_working_dir(PathBuf::from("/tmp"))
            .with_timeout(Duration::from_secs(60));

        assert_eq!(request.step_name, "analyze");
        assert_eq!(request.role, "analyzer");
        assert_eq!(request.description, "Find bugs");
        assert!(request.working_dir.is_some());
        assert!(request.timeout.is_some());
    }
}
