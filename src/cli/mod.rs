//! CLI layer
//!
//! Command implementations plus signal handling for graceful shutdown.
//! Commands translate configuration and flags into an engine, run it
//! and map the outcome to an exit code.

pub mod commands;
pub mod signals;

pub use commands::{
    RunOverrides, delete_checkpoint, list_checkpoints, list_workflows, plan_workflow,
    run_workflow, sweep_cache, validate_workflow,
};
pub use signals::setup_signal_handlers;
