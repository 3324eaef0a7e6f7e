//! Configuration loading with multi-layer merge

use super::{WorkflowDefinition, workflow_dir_name};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Top-level taskline configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TasklineConfig {
    /// Global defaults
    #[serde(default)]
    pub defaults: Defaults,

    /// Result cache settings
    #[serde(default)]
    pub cache: CacheSettings,

    /// Retry settings
    #[serde(default)]
    pub retry: RetrySettings,

    /// Checkpoint settings
    #[serde(default)]
    pub checkpoint: CheckpointSettings,

    /// Role definitions
    #[serde(default)]
    pub roles: HashMap<String, RoleConfig>,
}

/// Global default settings
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Defaults {
    /// Default per-step timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Max concurrent steps within a parallel group (unbounded if unset)
    pub max_concurrency: Option<usize>,

    /// Stop the run at the first failing group instead of continuing
    #[serde(default)]
    pub abort_on_error: bool,

    /// Runner selection: "noop" or "command"
    #[serde(default = "default_runner")]
    pub runner: String,
}

fn default_timeout() -> u64 {
    300
}

fn default_runner() -> String {
    "noop".into()
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            timeout: default_timeout(),
            max_concurrency: None,
            abort_on_error: false,
            runner: default_runner(),
        }
    }
}

/// Result cache settings
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CacheSettings {
    /// Whether cached results are consulted at all
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Entry time-to-live in seconds
    #[serde(default = "default_cache_ttl")]
    pub ttl_secs: u64,
}

fn default_cache_ttl() -> u64 {
    3600
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_secs: default_cache_ttl(),
        }
    }
}

/// Retry settings
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RetrySettings {
    /// Whether failed runner invocations are retried
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Maximum number of retries after the first attempt
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Initial backoff delay in milliseconds
    #[serde(default = "default_retry_delay")]
    pub initial_delay_ms: u64,

    /// Perturb delays to avoid thundering-herd retries
    #[serde(default = "default_true")]
    pub jitter: bool,
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_delay() -> u64 {
    1000
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            enabled: true,
            max_retries: default_max_retries(),
            initial_delay_ms: default_retry_delay(),
            jitter: true,
        }
    }
}

/// Checkpoint settings
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CheckpointSettings {
    /// Whether checkpoints are persisted during a run
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Auto-save interval in seconds
    #[serde(default = "default_autosave")]
    pub autosave_secs: u64,

    /// Database path (defaults to the user data directory)
    pub path: Option<PathBuf>,
}

fn default_autosave() -> u64 {
    30
}

impl Default for CheckpointSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            autosave_secs: default_autosave(),
            path: None,
        }
    }
}

fn default_true() -> bool {
    true
}

/// A role that steps can run under
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RoleConfig {
    /// Human-readable description
    #[serde(default)]
    pub description: String,

    /// Command template for the command runner (ignored by the no-op runner)
    pub command: Option<String>,
}

impl TasklineConfig {
    /// Load configuration from the standard hierarchy
    ///
    /// Load order (later overrides earlier):
    /// 1. Built-in defaults
    /// 2. ~/.config/taskline/config.toml
    /// 3. .taskline/config.toml (project)
    pub fn load(project_dir: Option<&Path>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(user_config_path) = Self::user_config_path() {
            if user_config_path.exists() {
                let user_config = Self::load_file(&user_config_path)
                    .with_context(|| format!("loading {}", user_config_path.display()))?;
                config.merge(user_config);
            }
        }

        let project_config_path = project_dir
            .map(|p| p.join(".taskline/config.toml"))
            .unwrap_or_else(|| PathBuf::from(".taskline/config.toml"));

        if project_config_path.exists() {
            let project_config = Self::load_file(&project_config_path)
                .with_context(|| format!("loading {}", project_config_path.display()))?;
            config.merge(project_config);
        }

        Ok(config)
    }

    /// Load configuration from a specific file
    pub fn load_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let config: Self = toml::from_str(&contents)
            .with_context(|| format!("parsing {}", path.display()))?;
        Ok(config)
    }

    /// Get the user config path (~/.config/taskline/config.toml)
    pub fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("taskline/config.toml"))
    }

    /// Merge another config into this one (other takes precedence)
    pub fn merge(&mut self, other: Self) {
        if other.defaults.timeout != default_timeout() {
            self.defaults.timeout = other.defaults.timeout;
        }
        if other.defaults.max_concurrency.is_some() {
            self.defaults.max_concurrency = other.defaults.max_concurrency;
        }
        if other.defaults.abort_on_error {
            self.defaults.abort_on_error = other.defaults.abort_on_error;
        }
        if other.defaults.runner != default_runner() {
            self.defaults.runner = other.defaults.runner;
        }

        self.cache = other.cache;
        self.retry = other.retry;

        if other.checkpoint.path.is_some() {
            self.checkpoint.path = other.checkpoint.path.clone();
        }
        self.checkpoint.enabled = other.checkpoint.enabled;
        self.checkpoint.autosave_secs = other.checkpoint.autosave_secs;

        for (name, role) in other.roles {
            self.roles.insert(name, role);
        }
    }

    /// Get a role by name
    pub fn get_role(&self, name: &str) -> Option<&RoleConfig> {
        self.roles.get(name)
    }

    /// Names of all configured roles
    pub fn role_names(&self) -> std::collections::HashSet<String> {
        self.roles.keys().cloned().collect()
    }
}

/// A set of workflow definitions resolvable by name
///
/// Nested-workflow references are looked up here, so the registry must
/// contain every workflow a run can reach.
#[derive(Debug, Clone, Default)]
pub struct WorkflowRegistry {
    workflows: HashMap<String, WorkflowDefinition>,
}

impl WorkflowRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load every workflow file from the standard hierarchy
    ///
    /// Project workflows (.taskline/workflows/*.toml) shadow user
    /// workflows (~/.config/taskline/workflows/*.toml) with the same name.
    pub fn load(project_dir: Option<&Path>) -> Result<Self> {
        let mut registry = Self::new();

        if let Some(user_dir) = dirs::config_dir() {
            let user_path = user_dir.join(workflow_dir_name());
            if user_path.is_dir() {
                registry.load_dir(&user_path)?;
            }
        }

        let project_path = project_dir
            .map(|p| p.join(".taskline/workflows"))
            .unwrap_or_else(|| PathBuf::from(".taskline/workflows"));
        if project_path.is_dir() {
            registry.load_dir(&project_path)?;
        }

        Ok(registry)
    }

    /// Load every *.toml workflow in a directory
    pub fn load_dir(&mut self, dir: &Path) -> Result<()> {
        for entry in std::fs::read_dir(dir).with_context(|| format!("reading {}", dir.display()))?
        {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) == Some("toml") {
                let workflow = load_workflow_file(&path)?;
                self.insert(workflow);
            }
        }
        Ok(())
    }

    /// Add a workflow to the registry, replacing any same-named entry
    pub fn insert(&mut self, workflow: WorkflowDefinition) {
        self.workflows.insert(workflow.name.clone(), workflow);
    }

    /// Resolve a workflow by name
    pub fn get(&self, name: &str) -> Option<&WorkflowDefinition> {
        self.workflows.get(name)
    }

    /// Whether a workflow name resolves
    pub fn contains(&self, name: &str) -> bool {
        self.workflows.contains_key(name)
    }

    /// All workflow names, sorted for stable listing
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<_> = self.workflows.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

fn load_workflow_file(path: &Path) -> Result<WorkflowDefinition> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    let workflow: WorkflowDefinition = toml::from_str(&contents)
        .with_context(|| format!("parsing {}", path.display()))?;

    workflow.validate().map_err(|errors| {
        anyhow::anyhow!(
            "workflow '{}' failed validation:\n  {}",
            workflow.name,
            errors.join("\n  ")
        )
    })?;

    Ok(workflow)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = TasklineConfig::default();
        assert_eq!(config.defaults.timeout, 300);
        assert!(config.cache.enabled);
        assert!(config.retry.enabled);
        assert_eq!(config.retry.max_retries, 3);
        assert!(config.roles.is_empty());
    }

    #[test]
    fn test_load_config_file() {
        let dir = TempDir::new().unwrap();
        let config_path = dir.path().join("config.toml");

        let mut file = std::fs::File::create(&config_path).unwrap();
        writeln!(
            file,
            r#"
            [defaults]
            timeout = 60
            max_concurrency = 4

            [retry]
            max_retries = 5
            initial_delay_ms = 250

            [roles.analyzer]
            description = "Static analysis"
            command = "analyze-tool"
        "#
        )
        .unwrap();

        let config = TasklineConfig::load_file(&config_path).unwrap();
        assert_eq!(config.defaults.timeout, 60);
        assert_eq!(config.defaults.max_concurrency, Some(4));
        assert_eq!(config.retry.max_retries, 5);
        assert!(config.roles.contains_key("analyzer"));
    }

    #[test]
    fn test_merge_precedence() {
        let mut base = TasklineConfig::default();
        base.roles.insert("worker".into(), RoleConfig::default());

        let mut overlay = TasklineConfig::default();
        overlay.defaults.max_concurrency = Some(2);
        overlay.roles.insert(
            "worker".into(),
            RoleConfig {
                description: "overridden".into(),
                command: None,
            },
        );

        base.merge(overlay);
        assert_eq!(base.defaults.max_concurrency, Some(2));
        assert_eq!(base.roles["worker"].description, "overridden");
    }

    #[test]
    fn test_registry_load_dir() {
        let dir = TempDir::new().unwrap();

        std::fs::write(
            dir.path().join("build.toml"),
            r#"
            name = "build"

            [[steps]]
            name = "compile"
            role = "worker"
        "#,
        )
        .unwrap();

        std::fs::write(
            dir.path().join("deploy.toml"),
            r#"
            name = "deploy"

            [[steps]]
            name = "ship"
            role = "worker"
        "#,
        )
        .unwrap();

        let mut registry = WorkflowRegistry::new();
        registry.load_dir(dir.path()).unwrap();

        assert!(registry.contains("build"));
        assert!(registry.contains("deploy"));
        assert_eq!(registry.names(), vec!["build", "deploy"]);
    }

    #[test]
    fn test_registry_rejects_invalid_workflow() {
        let dir = TempDir::new().unwrap();

        std::fs::write(
            dir.path().join("bad.toml"),
            r#"
            name = "bad"

            [[steps]]
            name = "a"
            role = "worker"
            depends_on = ["missing"]
        "#,
        )
        .unwrap();

        let mut registry = WorkflowRegistry::new();
        assert!(registry.load_dir(dir.path()).is_err());
    }
}
