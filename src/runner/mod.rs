//! Pluggable step runners
//!
//! The engine dispatches each step to a [`Runner`]; what the work
//! actually is stays runner-specific. Selection happens once, at
//! construction time, from configuration.

mod command;
mod noop;
mod types;

pub use command::CommandRunner;
pub use noop::NoopRunner;
pub use types::{Runner, RunnerError, TaskOutput, TaskRequest};

use crate::config::TasklineConfig;
use std::sync::Arc;
use std::time::Duration;

/// Build the configured runner
pub fn from_config(config: &TasklineConfig) -> anyhow::Result<Arc<dyn Runner>> {
    let timeout = Duration::from_secs(config.defaults.timeout);
    match config.defaults.runner.as_str() {
        "noop" => Ok(Arc::new(NoopRunner::new())),
        "command" => Ok(Arc::new(CommandRunner::from_roles(&config.roles, timeout))),
        other => anyhow::bail!("unknown runner '{}' (expected 'noop' or 'command')", other),
    }
}
