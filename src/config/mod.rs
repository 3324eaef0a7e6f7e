//! Configuration types and loading for taskline

mod loader;
mod workflow;

pub use loader::{
    CacheSettings, CheckpointSettings, Defaults, RetrySettings, RoleConfig, TasklineConfig,
    WorkflowRegistry,
};
pub use workflow::{SpawnSpec, Step, WorkflowDefinition};

/// Directory under the user config dir holding workflow files
pub(crate) fn workflow_dir_name() -> &'static str {
    "taskline/workflows"
}
