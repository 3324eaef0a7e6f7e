//! CLI command implementations

use super::signals;
use crate::cache::ResultCache;
use crate::checkpoint::CheckpointStore;
use crate::config::{TasklineConfig, WorkflowRegistry};
use crate::engine::{
    CancellationToken, EngineOptions, ExecutionEngine, ExecutionPlan, RetryPolicy, build_plan,
    validate,
};
use crate::report::{ConsoleSink, NoopSink, ReportSink};
use crate::runner;
use anyhow::{Context, Result, bail};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// CLI flags that override configuration for one run
#[derive(Debug, Clone, Default)]
pub struct RunOverrides {
    pub max_concurrency: Option<usize>,
    pub no_cache: bool,
    pub no_retry: bool,
    pub max_retries: Option<u32>,
    pub retry_delay_ms: Option<u64>,
    pub no_checkpoint: bool,
    pub checkpoint_interval: Option<u64>,
    pub abort_on_error: bool,
    pub runner: Option<String>,
    pub working_dir: Option<PathBuf>,
}

/// Run a workflow (or resume one from a checkpoint)
pub async fn run_workflow(
    workflow_name: Option<&str>,
    resume_id: Option<&str>,
    dry_run: bool,
    config: &TasklineConfig,
    registry: WorkflowRegistry,
    overrides: RunOverrides,
    quiet: bool,
) -> Result<i32> {
    let token = CancellationToken::new();
    let engine = build_engine(config, registry.clone(), &overrides, quiet, token.clone())?;

    if dry_run {
        let name = workflow_name.context("--dry-run requires a workflow name")?;
        let workflow = lookup(&registry, name)?;
        let plan = engine.dry_run(&workflow)?;
        print_plan(&workflow.name, &plan);
        return Ok(0);
    }

    tokio::spawn(signals::setup_signal_handlers(token));

    let result = match (resume_id, workflow_name) {
        (Some(id), _) => engine.resume(id).await?,
        (None, Some(name)) => {
            let workflow = lookup(&registry, name)?;
            engine.run(&workflow).await?
        }
        (None, None) => bail!("expected a workflow name or --resume <checkpoint-id>"),
    };

    if !result.success && !overrides.no_checkpoint && config.checkpoint.enabled {
        eprintln!(
            "\nTo resume this run: taskline run --resume {}",
            result.checkpoint_id
        );
    }

    Ok(if result.success { 0 } else { 1 })
}

/// Show the execution plan without running anything
pub fn plan_workflow(
    workflow_name: &str,
    config: &TasklineConfig,
    registry: &WorkflowRegistry,
) -> Result<i32> {
    let workflow = lookup(registry, workflow_name)?;

    let report = validate(&workflow, registry, &config.role_names());
    if !report.is_valid() {
        eprintln!("✗ Workflow '{}' has errors:", workflow.name);
        for error in &report.errors {
            eprintln!("  {}", error);
        }
        return Ok(1);
    }

    let plan = build_plan(&workflow)?;
    print_plan(&workflow.name, &plan);
    Ok(0)
}

/// Validate a workflow and report errors and warnings
pub fn validate_workflow(
    workflow_name: &str,
    config: &TasklineConfig,
    registry: &WorkflowRegistry,
) -> Result<i32> {
    let workflow = lookup(registry, workflow_name)?;
    let report = validate(&workflow, registry, &config.role_names());

    for warning in &report.warnings {
        println!("  warning: {}", warning);
    }

    if report.is_valid() {
        println!(
            "✓ Workflow '{}' is valid ({} steps)",
            workflow.name,
            workflow.steps.len()
        );
        Ok(0)
    } else {
        println!("✗ Workflow '{}' has {} error(s):", workflow.name, report.errors.len());
        for error in &report.errors {
            println!("  {}", error);
        }
        Ok(1)
    }
}

/// List stored checkpoints, most recently updated first
pub fn list_checkpoints(config: &TasklineConfig) -> Result<i32> {
    let store = open_checkpoint_store(config)?;
    let checkpoints = store.list()?;

    if checkpoints.is_empty() {
        println!("(no checkpoints)");
        return Ok(0);
    }

    for checkpoint in checkpoints {
        let state = if checkpoint.failed_tasks.is_empty() {
            format!("{} completed", checkpoint.completed_tasks.len())
        } else {
            format!(
                "{} completed, {} failed",
                checkpoint.completed_tasks.len(),
                checkpoint.failed_tasks.len()
            )
        };
        println!(
            "{}  {}  updated {}  ({})",
            checkpoint.id,
            checkpoint.workflow_name,
            checkpoint.last_updated_at.format("%Y-%m-%d %H:%M:%S"),
            state
        );
    }

    Ok(0)
}

/// Delete a stored checkpoint
pub fn delete_checkpoint(config: &TasklineConfig, id: &str) -> Result<i32> {
    let store = open_checkpoint_store(config)?;
    store.delete(id)?;
    println!("Deleted checkpoint '{}'", id);
    Ok(0)
}

/// Remove expired entries from the result cache
pub fn sweep_cache(config: &TasklineConfig) -> Result<i32> {
    if !config.cache.enabled {
        println!("(result cache is disabled)");
        return Ok(0);
    }

    let ttl = Duration::from_secs(config.cache.ttl_secs);
    let cache = ResultCache::open(&ResultCache::default_path()?, ttl)?;
    let removed = cache.sweep()?;
    println!("Removed {} expired cache entr{}", removed, if removed == 1 { "y" } else { "ies" });
    Ok(0)
}

/// List registered workflows
pub fn list_workflows(registry: &WorkflowRegistry) -> Result<i32> {
    let names = registry.names();
    if names.is_empty() {
        println!("(no workflows found)");
        return Ok(0);
    }

    for name in names {
        if let Some(workflow) = registry.get(name) {
            if workflow.description.is_empty() {
                println!("{}  ({} steps)", name, workflow.steps.len());
            } else {
                println!(
                    "{}  ({} steps) - {}",
                    name,
                    workflow.steps.len(),
                    workflow.description
                );
            }
        }
    }

    Ok(0)
}

fn lookup(
    registry: &WorkflowRegistry,
    name: &str,
) -> Result<crate::config::WorkflowDefinition> {
    registry.get(name).cloned().with_context(|| {
        let known = registry.names().join(", ");
        if known.is_empty() {
            format!("unknown workflow '{}' (no workflows registered)", name)
        } else {
            format!("unknown workflow '{}' (available: {})", name, known)
        }
    })
}

fn print_plan(workflow_name: &str, plan: &ExecutionPlan) {
    println!(
        "Plan for '{}' ({} steps, {} groups):",
        workflow_name,
        plan.step_count(),
        plan.groups.len()
    );
    for group in &plan.groups {
        let names: Vec<&str> = group.steps.iter().map(|s| s.name.as_str()).collect();
        let mode = if group.parallel { "parallel" } else { "sequential" };
        println!("  {}. [{}] {}", group.order + 1, mode, names.join(", "));
    }
}

fn open_checkpoint_store(config: &TasklineConfig) -> Result<CheckpointStore> {
    let path = match config.checkpoint.path {
        Some(ref path) => path.clone(),
        None => CheckpointStore::default_path()?,
    };
    CheckpointStore::open(&path)
}

/// Wire configuration and CLI overrides into an engine
fn build_engine(
    config: &TasklineConfig,
    registry: WorkflowRegistry,
    overrides: &RunOverrides,
    quiet: bool,
    token: CancellationToken,
) -> Result<ExecutionEngine> {
    let mut effective = config.clone();
    if let Some(ref runner_name) = overrides.runner {
        effective.defaults.runner = runner_name.clone();
    }
    let runner = runner::from_config(&effective)?;

    let cache = if overrides.no_cache || !config.cache.enabled {
        ResultCache::disabled()
    } else {
        let ttl = Duration::from_secs(config.cache.ttl_secs);
        ResultCache::open(&ResultCache::default_path()?, ttl)?
    };

    let checkpoints = open_checkpoint_store(config)?;

    let retry = if overrides.no_retry || !config.retry.enabled {
        RetryPolicy::disabled()
    } else {
        RetryPolicy {
            max_retries: overrides.max_retries.unwrap_or(config.retry.max_retries),
            initial_delay: Duration::from_millis(
                overrides.retry_delay_ms.unwrap_or(config.retry.initial_delay_ms),
            ),
            jitter: config.retry.jitter,
        }
    };

    let options = EngineOptions {
        max_concurrency: overrides.max_concurrency.or(config.defaults.max_concurrency),
        abort_on_error: overrides.abort_on_error || config.defaults.abort_on_error,
        step_timeout: Duration::from_secs(config.defaults.timeout),
        checkpoint_enabled: !overrides.no_checkpoint && config.checkpoint.enabled,
        autosave_interval: Duration::from_secs(
            overrides
                .checkpoint_interval
                .unwrap_or(config.checkpoint.autosave_secs),
        ),
        known_roles: config.role_names(),
        working_dir: overrides.working_dir.clone(),
    };

    let sink: Arc<dyn ReportSink> = if quiet {
        Arc::new(NoopSink)
    } else {
        Arc::new(ConsoleSink::new())
    };

    Ok(ExecutionEngine::new(
        Arc::new(registry),
        runner,
        Arc::new(checkpoints),
        Arc::new(cache),
        options,
    )
    .with_sink(sink)
    .with_retry_policy(retry)
    .with_cancellation(token))
}
