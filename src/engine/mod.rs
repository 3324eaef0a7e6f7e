//! Workflow execution engine
//!
//! The engine turns a validated [`crate::config::WorkflowDefinition`]
//! into an [`ExecutionPlan`] of dependency-ordered groups and drives it
//! to completion: concurrent dispatch within parallel groups, result
//! caching, bounded retry, checkpointing and nested workflows.

mod cancel;
mod planner;
mod recovery;
mod scheduler;
mod task;
mod validator;

pub use cancel::CancellationToken;
pub use planner::{ExecutionPlan, Group, PlanError, build_plan};
pub use recovery::{RetryDecision, RetryPolicy};
pub use scheduler::{EngineError, EngineOptions, ExecutionEngine, WorkflowResult};
pub use task::{AgentTask, TaskStatus};
pub use validator::{ValidationReport, validate};
