//! Reporting sinks for live observability
//!
//! The engine notifies a [`ReportSink`] on every status change.
//! Delivery is fire-and-forget; run correctness never depends on the
//! sink, and the default is a no-op. Sinks are injected into the
//! engine constructor - there is no process-wide singleton.

use crate::engine::TaskStatus;
use std::io::{self, Write};

/// Consumer of step and workflow status-change events
pub trait ReportSink: Send + Sync {
    /// A workflow run began
    fn on_workflow_start(&self, workflow: &str, step_count: usize);

    /// A task changed status
    fn on_step_update(&self, workflow: &str, step: &str, status: TaskStatus);

    /// A workflow run finished
    fn on_workflow_end(
        &self,
        workflow: &str,
        success: bool,
        completed: usize,
        failed: usize,
        duration_ms: u64,
    );
}

/// Sink that discards every event
#[derive(Debug, Default)]
pub struct NoopSink;

impl ReportSink for NoopSink {
    fn on_workflow_start(&self, _workflow: &str, _step_count: usize) {}

    fn on_step_update(&self, _workflow: &str, _step: &str, _status: TaskStatus) {}

    fn on_workflow_end(
        &self,
        _workflow: &str,
        _success: bool,
        _completed: usize,
        _failed: usize,
        _duration_ms: u64,
    ) {
    }
}

/// Console sink writing progress to stderr
#[derive(Debug, Default)]
pub struct ConsoleSink;

impl ConsoleSink {
    pub fn new() -> Self {
        Self
    }

    fn format_duration(ms: u64) -> String {
        if ms < 1000 {
            format!("{}ms", ms)
        } else {
            format!("{:.1}s", ms as f64 / 1000.0)
        }
    }
}

impl ReportSink for ConsoleSink {
    fn on_workflow_start(&self, workflow: &str, step_count: usize) {
        eprintln!("Running workflow '{}' ({} steps)", workflow, step_count);
    }

    fn on_step_update(&self, _workflow: &str, step: &str, status: TaskStatus) {
        match status {
            TaskStatus::Running => {
                eprint!("  {}... ", step);
                let _ = io::stderr().flush();
            }
            TaskStatus::Succeeded => eprintln!("✓ {}", step),
            TaskStatus::Failed => eprintln!("✗ {}", step),
            TaskStatus::Skipped => eprintln!("- {} (skipped)", step),
            TaskStatus::Pending => {}
        }
    }

    fn on_workflow_end(
        &self,
        workflow: &str,
        success: bool,
        completed: usize,
        failed: usize,
        duration_ms: u64,
    ) {
        eprintln!();
        if success {
            eprintln!(
                "✓ Workflow '{}' completed ({} steps in {})",
                workflow,
                completed,
                Self::format_duration(duration_ms)
            );
        } else {
            eprintln!(
                "✗ Workflow '{}' failed ({} completed, {} failed, {})",
                workflow,
                completed,
                failed,
                Self::format_duration(duration_ms)
            );
        }
    }
}
