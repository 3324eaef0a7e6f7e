//! No-op runner for dry experiments and tests

use super::types::{Runner, RunnerError, TaskOutput, TaskRequest};
use async_trait::async_trait;
use std::time::Instant;

/// Runner that performs no real work and always succeeds
///
/// The payload echoes the step identity so downstream consumers can
/// still see which step produced it.
#[derive(Debug, Default)]
pub struct NoopRunner;

impl NoopRunner {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Runner for NoopRunner {
    async fn execute(&self, request: &TaskRequest) -> Result<TaskOutput, RunnerError> {
        let start = Instant::now();
        tracing::debug!(step = %request.step_name, role = %request.role, "noop run");

        Ok(TaskOutput::new(
            format!("noop: {} ({})", request.step_name, request.role),
            "noop".into(),
            start.elapsed(),
        ))
    }

    fn name(&self) -> &str {
        "noop"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_noop_always_succeeds() {
        let runner = NoopRunner::new();
        let output = runner
            .execute(&TaskRequest::new("compile", "worker"))
            .await
            .unwrap();

        assert!(output.payload.contains("compile"));
        assert_eq!(output.runner, "noop");
    }
}
