//! The execution engine - walks the plan group by group
//!
//! For each group the engine dispatches eligible steps to the runner
//! (bounded by the concurrency limit for parallel groups), consults
//! the result cache, applies the retry policy, persists checkpoints,
//! recurses into nested workflows and expands spawned tasks, then
//! aggregates a final [`WorkflowResult`].

use super::cancel::CancellationToken;
use super::planner::{self, ExecutionPlan, PlanError};
use super::recovery::RetryPolicy;
use super::task::{AgentTask, TaskStatus};
use super::validator;
use crate::cache::{ResultCache, fingerprint};
use crate::checkpoint::{Checkpoint, CheckpointNotFound, CheckpointStore};
use crate::config::{Step, WorkflowDefinition, WorkflowRegistry};
use crate::report::{NoopSink, ReportSink};
use crate::runner::{Runner, RunnerError, TaskRequest};
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Errors that stop a run before or outside step execution
///
/// Per-step runner failures never surface here; they are captured in
/// the [`WorkflowResult`].
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("workflow validation failed:\n  {}", errors.join("\n  "))]
    Validation { errors: Vec<String> },

    #[error(transparent)]
    Plan(#[from] PlanError),

    #[error(transparent)]
    CheckpointNotFound(#[from] CheckpointNotFound),

    #[error("unknown workflow '{name}'")]
    UnknownWorkflow { name: String },

    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

/// Per-run engine options
#[derive(Debug, Clone)]
pub struct EngineOptions {
    /// Concurrency bound within a parallel group (unbounded if unset)
    pub max_concurrency: Option<usize>,

    /// Stop processing further groups after the first failing step
    pub abort_on_error: bool,

    /// Default per-step timeout
    pub step_timeout: Duration,

    /// Whether checkpoints are persisted at all
    pub checkpoint_enabled: bool,

    /// Auto-save interval (zero disables the timer)
    pub autosave_interval: Duration,

    /// Roles the preflight validator accepts
    pub known_roles: HashSet<String>,

    /// Working directory handed to the runner
    pub working_dir: Option<PathBuf>,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            max_concurrency: None,
            abort_on_error: false,
            step_timeout: Duration::from_secs(300),
            checkpoint_enabled: true,
            autosave_interval: Duration::from_secs(30),
            known_roles: HashSet::new(),
            working_dir: None,
        }
    }
}

/// Final outcome of one workflow run
#[derive(Debug, Clone)]
pub struct WorkflowResult {
    /// Workflow that ran
    pub workflow_name: String,

    /// True iff no task failed and the run was not interrupted
    pub success: bool,

    /// Tasks that reached Succeeded
    pub completed_tasks: Vec<AgentTask>,

    /// Tasks that reached Failed
    pub failed_tasks: Vec<AgentTask>,

    /// Tasks skipped because a dependency failed
    pub skipped_tasks: Vec<AgentTask>,

    /// Results of nested workflow runs, by workflow name
    pub nested_workflows: HashMap<String, WorkflowResult>,

    /// Checkpoint id of this run, for resume
    pub checkpoint_id: String,

    /// Total run time
    pub duration: Duration,
}

impl WorkflowResult {
    /// Names of failed steps, for error reporting
    pub fn failed_names(&self) -> Vec<&str> {
        self.failed_tasks.iter().map(|t| t.step_name.as_str()).collect()
    }

    /// Get a completed step's result payload
    pub fn step_result(&self, step: &str) -> Option<&str> {
        self.completed_tasks
            .iter()
            .find(|t| t.step_name == step)
            .and_then(|t| t.result.as_deref())
    }
}

/// Outcome of dispatching one step, applied by the coordinator
#[derive(Debug)]
struct StepOutcome {
    step: Step,
    status: TaskStatus,
    attempts: u32,
    result: Option<String>,
    error: Option<String>,
    from_cache: bool,
    nested: Option<(String, WorkflowResult)>,
}

/// Mutable state of one run, owned by the coordinating loop
struct RunState {
    tasks: HashMap<String, AgentTask>,
    task_order: Vec<String>,
    checkpoint: Arc<Mutex<Checkpoint>>,
    nested: HashMap<String, WorkflowResult>,
}

impl RunState {
    fn status_of(&self, step: &str) -> TaskStatus {
        self.tasks
            .get(step)
            .map(|t| t.status)
            .unwrap_or(TaskStatus::Pending)
    }
}

/// The orchestrating core
///
/// Cheap to clone; all collaborators are injected shared handles, so
/// nested runs and parallel dispatch reuse the same cache, checkpoint
/// store and reporting sink.
#[derive(Clone)]
pub struct ExecutionEngine {
    registry: Arc<WorkflowRegistry>,
    runner: Arc<dyn Runner>,
    sink: Arc<dyn ReportSink>,
    cache: Arc<ResultCache>,
    checkpoints: Arc<CheckpointStore>,
    retry: RetryPolicy,
    options: EngineOptions,
    cancel: CancellationToken,
}

impl ExecutionEngine {
    /// Create an engine with a no-op sink and default retry policy
    pub fn new(
        registry: Arc<WorkflowRegistry>,
        runner: Arc<dyn Runner>,
        checkpoints: Arc<CheckpointStore>,
        cache: Arc<ResultCache>,
        options: EngineOptions,
    ) -> Self {
        Self {
            registry,
            runner,
            sink: Arc::new(NoopSink),
            cache,
            checkpoints,
            retry: RetryPolicy::default(),
            options,
            cancel: CancellationToken::new(),
        }
    }

    /// Set the reporting sink
    pub fn with_sink(mut self, sink: Arc<dyn ReportSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Set the retry policy
    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry = policy;
        self
    }

    /// Set the cancellation token
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Validate and plan without executing anything
    pub fn dry_run(&self, workflow: &WorkflowDefinition) -> Result<ExecutionPlan, EngineError> {
        self.preflight(workflow)?;
        Ok(planner::build_plan(workflow)?)
    }

    /// Run a workflow from scratch
    pub async fn run(&self, workflow: &WorkflowDefinition) -> Result<WorkflowResult, EngineError> {
        self.preflight(workflow)?;
        let plan = planner::build_plan(workflow)?;

        let mut checkpoint = Checkpoint::new(&workflow.name);
        checkpoint.metadata.working_dir = self.options.working_dir.clone();

        self.execute(workflow, plan, checkpoint).await
    }

    /// Resume an interrupted run from a checkpoint
    ///
    /// Steps recorded as completed or failed re-enter their terminal
    /// state and are never re-invoked.
    pub async fn resume(&self, checkpoint_id: &str) -> Result<WorkflowResult, EngineError> {
        let checkpoint = self.load_checkpoint(checkpoint_id)?;

        let workflow = self
            .registry
            .get(&checkpoint.workflow_name)
            .cloned()
            .ok_or_else(|| EngineError::UnknownWorkflow {
                name: checkpoint.workflow_name.clone(),
            })?;

        self.preflight(&workflow)?;
        let plan = planner::build_plan(&workflow)?;

        tracing::info!(
            checkpoint = checkpoint_id,
            workflow = %workflow.name,
            completed = checkpoint.completed_tasks.len(),
            "resuming run"
        );

        self.execute(&workflow, plan, checkpoint).await
    }

    fn preflight(&self, workflow: &WorkflowDefinition) -> Result<(), EngineError> {
        let report = validator::validate(workflow, &self.registry, &self.options.known_roles);
        for warning in &report.warnings {
            tracing::warn!(workflow = %workflow.name, "{}", warning);
        }
        if !report.is_valid() {
            return Err(EngineError::Validation {
                errors: report.errors,
            });
        }
        Ok(())
    }

    fn load_checkpoint(&self, id: &str) -> Result<Checkpoint, EngineError> {
        self.checkpoints.load(id).map_err(|e| match e.downcast::<CheckpointNotFound>() {
            Ok(not_found) => EngineError::CheckpointNotFound(not_found),
            Err(other) => EngineError::Store(other),
        })
    }

    /// Nested runs go through a boxed future to break type recursion
    fn run_nested(
        &self,
        workflow: WorkflowDefinition,
    ) -> Pin<Box<dyn Future<Output = Result<WorkflowResult, EngineError>> + Send>> {
        let engine = self.clone();
        Box::pin(async move { engine.run(&workflow).await })
    }

    /// The run loop proper
    async fn execute(
        &self,
        workflow: &WorkflowDefinition,
        mut plan: ExecutionPlan,
        checkpoint: Checkpoint,
    ) -> Result<WorkflowResult, EngineError> {
        let started = Instant::now();

        let mut state = RunState {
            tasks: HashMap::new(),
            task_order: Vec::new(),
            checkpoint: Arc::new(Mutex::new(checkpoint)),
            nested: HashMap::new(),
        };

        // Seed tasks, rehydrating terminal states from the checkpoint
        {
            let cp = state.checkpoint.lock().expect("checkpoint lock poisoned");
            for task in &plan.tasks {
                let mut task = task.clone();
                rehydrate(&cp, &mut task);
                state.task_order.push(task.step_name.clone());
                state.tasks.insert(task.step_name.clone(), task);
            }
        }

        self.sink.on_workflow_start(&workflow.name, plan.step_count());

        let autosave = self.spawn_autosave(state.checkpoint.clone());

        let mut gi = 0;
        while gi < plan.groups.len() {
            if self.cancel.is_cancelled() {
                tracing::info!(workflow = %workflow.name, "cancellation requested, stopping dispatch");
                break;
            }

            let group = plan.groups[gi].clone();
            let mut eligible: Vec<Step> = Vec::new();
            let mut to_spawn: Vec<Step> = Vec::new();

            for step in &group.steps {
                let status = state.status_of(&step.name);
                if status.is_terminal() {
                    // Rehydrated from a checkpoint; re-splice its spawns
                    if status == TaskStatus::Succeeded {
                        to_spawn.extend(self.unspawned(step, &state));
                    }
                    continue;
                }

                let blocked = step.depends_on.iter().any(|d| {
                    matches!(
                        state.status_of(d),
                        TaskStatus::Failed | TaskStatus::Skipped
                    )
                });
                if blocked {
                    self.mark_skipped(&mut state, &workflow.name, &step.name);
                    continue;
                }

                let ready = step
                    .depends_on
                    .iter()
                    .all(|d| state.status_of(d) == TaskStatus::Succeeded);
                if ready {
                    eligible.push(step.clone());
                }
            }

            let mut group_failed = false;

            if group.parallel && eligible.len() > 1 {
                let permits = self
                    .options
                    .max_concurrency
                    .unwrap_or(eligible.len())
                    .max(1);
                let semaphore = Arc::new(Semaphore::new(permits));
                let mut join_set = JoinSet::new();

                for step in eligible {
                    self.mark_running(&mut state, &workflow.name, &step.name);
                    let engine = self.clone();
                    let semaphore = semaphore.clone();
                    let workflow_name = workflow.name.clone();
                    join_set.spawn(async move {
                        let _permit =
                            semaphore.acquire_owned().await.expect("semaphore closed");
                        dispatch_step(engine, workflow_name, step).await
                    });
                }

                while let Some(joined) = join_set.join_next().await {
                    match joined {
                        Ok(outcome) => {
                            if outcome.status == TaskStatus::Failed {
                                group_failed = true;
                            }
                            let spawns =
                                self.apply_outcome(&mut state, &workflow.name, outcome);
                            to_spawn.extend(spawns);
                        }
                        Err(e) => {
                            tracing::error!(error = %e, "step task aborted unexpectedly");
                            group_failed = true;
                        }
                    }
                }
            } else {
                for step in eligible {
                    if self.cancel.is_cancelled() {
                        break;
                    }
                    self.mark_running(&mut state, &workflow.name, &step.name);
                    let outcome =
                        dispatch_step(self.clone(), workflow.name.clone(), step).await;
                    if outcome.status == TaskStatus::Failed {
                        group_failed = true;
                    }
                    let spawns = self.apply_outcome(&mut state, &workflow.name, outcome);
                    to_spawn.extend(spawns);

                    if group_failed && self.options.abort_on_error {
                        break;
                    }
                }
            }

            // A panicked step task would otherwise be left Running
            for step in &group.steps {
                if state.status_of(&step.name) == TaskStatus::Running {
                    if let Some(task) = state.tasks.get_mut(&step.name) {
                        task.fail("step task aborted unexpectedly".into());
                    }
                }
            }

            // Splice dynamically spawned steps right after this group
            let mut offset = 0;
            for step in to_spawn {
                if state.tasks.contains_key(&step.name) {
                    tracing::warn!(step = %step.name, "spawned step name already exists, skipping");
                    continue;
                }
                let mut task = AgentTask::new(&step.name, &step.role);
                {
                    let cp = state.checkpoint.lock().expect("checkpoint lock poisoned");
                    rehydrate(&cp, &mut task);
                }
                state.task_order.push(step.name.clone());
                state.tasks.insert(step.name.clone(), task);
                plan.splice_after(gi + offset, step);
                offset += 1;
            }

            if group_failed && self.options.abort_on_error {
                tracing::warn!(workflow = %workflow.name, group = gi, "aborting run on error");
                break;
            }

            gi += 1;
        }

        if let Some(handle) = autosave {
            handle.abort();
        }

        // An abort_on_error stop is already reflected in failed_tasks;
        // only cancellation forces success to false on its own
        let interrupted = self.cancel.is_cancelled();
        let result = self.finish(workflow, state, started, interrupted);

        self.sink.on_workflow_end(
            &workflow.name,
            result.success,
            result.completed_tasks.len(),
            result.failed_tasks.len(),
            result.duration.as_millis() as u64,
        );

        Ok(result)
    }

    /// Aggregate the final result and write the terminal checkpoint
    fn finish(
        &self,
        workflow: &WorkflowDefinition,
        state: RunState,
        started: Instant,
        interrupted: bool,
    ) -> WorkflowResult {
        let mut completed = Vec::new();
        let mut failed = Vec::new();
        let mut skipped = Vec::new();

        for name in &state.task_order {
            if let Some(task) = state.tasks.get(name) {
                match task.status {
                    TaskStatus::Succeeded => completed.push(task.clone()),
                    TaskStatus::Failed => failed.push(task.clone()),
                    TaskStatus::Skipped => skipped.push(task.clone()),
                    TaskStatus::Pending | TaskStatus::Running => {}
                }
            }
        }

        let final_checkpoint = {
            let mut cp = state.checkpoint.lock().expect("checkpoint lock poisoned");
            cp.current_step = None;
            cp.touch();
            cp.clone()
        };

        // The terminal checkpoint matters for resume; retry once
        if self.options.checkpoint_enabled {
            if let Err(e) = self.checkpoints.save(&final_checkpoint) {
                tracing::warn!(error = %e, "final checkpoint save failed, retrying");
                if let Err(e) = self.checkpoints.save(&final_checkpoint) {
                    tracing::error!(error = %e, "final checkpoint save failed twice");
                }
            }
        }

        WorkflowResult {
            workflow_name: workflow.name.clone(),
            success: failed.is_empty() && !interrupted,
            completed_tasks: completed,
            failed_tasks: failed,
            skipped_tasks: skipped,
            nested_workflows: state.nested,
            checkpoint_id: final_checkpoint.id,
            duration: started.elapsed(),
        }
    }

    /// Spawn steps of a rehydrated step that are not yet in the run
    fn unspawned(&self, step: &Step, state: &RunState) -> Vec<Step> {
        step.spawn_tasks
            .iter()
            .filter(|spec| !state.tasks.contains_key(&spec.name))
            .map(|spec| Step::from_spawn(spec, &step.name))
            .collect()
    }

    fn mark_running(&self, state: &mut RunState, workflow: &str, step: &str) {
        if let Some(task) = state.tasks.get_mut(step) {
            task.transition(TaskStatus::Running);
        }
        {
            let mut cp = state.checkpoint.lock().expect("checkpoint lock poisoned");
            cp.current_step = Some(step.to_string());
        }
        self.sink.on_step_update(workflow, step, TaskStatus::Running);
    }

    fn mark_skipped(&self, state: &mut RunState, workflow: &str, step: &str) {
        if let Some(task) = state.tasks.get_mut(step) {
            task.transition(TaskStatus::Skipped);
        }
        tracing::debug!(workflow, step, "skipping step with failed dependency");
        self.sink.on_step_update(workflow, step, TaskStatus::Skipped);
    }

    /// Fold a step outcome into the run state; returns steps to spawn
    fn apply_outcome(
        &self,
        state: &mut RunState,
        workflow: &str,
        outcome: StepOutcome,
    ) -> Vec<Step> {
        let step_name = outcome.step.name.clone();

        if let Some(task) = state.tasks.get_mut(&step_name) {
            task.attempts = outcome.attempts;
            match outcome.status {
                TaskStatus::Succeeded => task.succeed(outcome.result.clone().unwrap_or_default()),
                TaskStatus::Failed => {
                    task.fail(outcome.error.clone().unwrap_or_else(|| "unknown error".into()))
                }
                other => task.transition(other),
            }
        }

        let snapshot = {
            let mut cp = state.checkpoint.lock().expect("checkpoint lock poisoned");
            match outcome.status {
                TaskStatus::Succeeded => {
                    cp.record_completed(&step_name, outcome.result.clone().unwrap_or_default());
                }
                TaskStatus::Failed => cp.record_failed(&step_name),
                _ => {}
            }
            cp.clone()
        };
        self.save_checkpoint(&snapshot);

        if let Some((name, nested_result)) = outcome.nested {
            state.nested.insert(name, nested_result);
        }

        self.sink.on_step_update(workflow, &step_name, outcome.status);
        tracing::info!(
            workflow,
            step = %step_name,
            status = %outcome.status,
            attempts = outcome.attempts,
            from_cache = outcome.from_cache,
            "step settled"
        );

        if outcome.status == TaskStatus::Succeeded {
            outcome
                .step
                .spawn_tasks
                .iter()
                .map(|spec| Step::from_spawn(spec, &step_name))
                .collect()
        } else {
            Vec::new()
        }
    }

    /// Best-effort checkpoint write; never fails a step
    fn save_checkpoint(&self, checkpoint: &Checkpoint) {
        if !self.options.checkpoint_enabled {
            return;
        }
        if let Err(e) = self.checkpoints.save(checkpoint) {
            tracing::warn!(error = %e, checkpoint = %checkpoint.id, "checkpoint save failed");
        }
    }

    fn spawn_autosave(
        &self,
        checkpoint: Arc<Mutex<Checkpoint>>,
    ) -> Option<tokio::task::JoinHandle<()>> {
        if !self.options.checkpoint_enabled || self.options.autosave_interval.is_zero() {
            return None;
        }

        let store = self.checkpoints.clone();
        let interval = self.options.autosave_interval;
        Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await; // first tick fires immediately
            loop {
                ticker.tick().await;
                let snapshot = {
                    let mut cp = checkpoint.lock().expect("checkpoint lock poisoned");
                    cp.touch();
                    cp.clone()
                };
                if let Err(e) = store.save(&snapshot) {
                    tracing::warn!(error = %e, "checkpoint auto-save failed");
                }
            }
        }))
    }
}

/// Run one step to a terminal outcome
///
/// Owns clones of the engine handles so it can be spawned onto the
/// runtime for parallel groups.
async fn dispatch_step(
    engine: ExecutionEngine,
    workflow_name: String,
    step: Step,
) -> StepOutcome {
    // Nested workflow steps recurse instead of invoking the runner
    if let Some(nested_name) = step.nested_workflow.clone() {
        return dispatch_nested(engine, step, nested_name).await;
    }

    let fp = fingerprint(&step, &[("workflow", workflow_name.as_str())]);

    match engine.cache.get(&fp) {
        Ok(Some(payload)) => {
            tracing::debug!(step = %step.name, fingerprint = %fp, "cache hit");
            return StepOutcome {
                step,
                status: TaskStatus::Succeeded,
                attempts: 0,
                result: Some(payload),
                error: None,
                from_cache: true,
                nested: None,
            };
        }
        Ok(None) => {}
        Err(e) => tracing::warn!(error = %e, step = %step.name, "cache read failed"),
    }

    let timeout = step
        .timeout_secs
        .map(Duration::from_secs)
        .unwrap_or(engine.options.step_timeout);

    let mut request = TaskRequest::new(&step.name, &step.role)
        .with_description(&step.description)
        .with_timeout(timeout);
    if let Some(ref dir) = engine.options.working_dir {
        request = request.with_working_dir(dir.clone());
    }

    let mut attempt = 0u32;
    loop {
        attempt += 1;
        let started = Instant::now();

        let result = match tokio::time::timeout(timeout, engine.runner.execute(&request)).await {
            Ok(result) => result,
            Err(_) => Err(RunnerError::timeout(started.elapsed())),
        };

        match result {
            Ok(output) => {
                if let Err(e) = engine.cache.put(&fp, &output.payload) {
                    tracing::warn!(error = %e, step = %step.name, "cache write failed");
                }
                return StepOutcome {
                    step,
                    status: TaskStatus::Succeeded,
                    attempts: attempt,
                    result: Some(output.payload),
                    error: None,
                    from_cache: false,
                    nested: None,
                };
            }
            Err(err) => {
                let decision = engine.retry.decide(attempt);
                if decision.retry && err.is_retryable() && !engine.cancel.is_cancelled() {
                    tracing::warn!(
                        step = %step.name,
                        attempt,
                        delay_ms = decision.delay.as_millis() as u64,
                        error = %err,
                        "step failed, retrying"
                    );
                    // A cancel during the backoff must not buy the
                    // step another attempt
                    tokio::select! {
                        _ = tokio::time::sleep(decision.delay) => continue,
                        _ = engine.cancel.cancelled() => {
                            tracing::debug!(step = %step.name, "cancelled during retry backoff");
                        }
                    }
                }

                return StepOutcome {
                    step,
                    status: TaskStatus::Failed,
                    attempts: attempt,
                    result: None,
                    error: Some(err.to_string()),
                    from_cache: false,
                    nested: None,
                };
            }
        }
    }
}

/// Run a nested workflow as the body of the parent step
async fn dispatch_nested(
    engine: ExecutionEngine,
    step: Step,
    nested_name: String,
) -> StepOutcome {
    let Some(child) = engine.registry.get(&nested_name).cloned() else {
        // Preflight catches this; guard anyway for spawned references
        return StepOutcome {
            step,
            status: TaskStatus::Failed,
            attempts: 0,
            result: None,
            error: Some(format!("unknown nested workflow '{}'", nested_name)),
            from_cache: false,
            nested: None,
        };
    };

    tracing::info!(step = %step.name, nested = %nested_name, "entering nested workflow");

    match engine.run_nested(child).await {
        Ok(nested_result) => {
            if nested_result.success {
                StepOutcome {
                    step,
                    status: TaskStatus::Succeeded,
                    attempts: 1,
                    result: Some(format!(
                        "nested workflow '{}' completed ({} steps)",
                        nested_name,
                        nested_result.completed_tasks.len()
                    )),
                    error: None,
                    from_cache: false,
                    nested: Some((nested_name, nested_result)),
                }
            } else {
                let failed = nested_result.failed_names().join(", ");
                StepOutcome {
                    step,
                    status: TaskStatus::Failed,
                    attempts: 1,
                    result: None,
                    error: Some(format!(
                        "nested workflow '{}' failed (steps: {})",
                        nested_name, failed
                    )),
                    from_cache: false,
                    nested: Some((nested_name, nested_result)),
                }
            }
        }
        Err(e) => StepOutcome {
            step,
            status: TaskStatus::Failed,
            attempts: 1,
            result: None,
            error: Some(format!("nested workflow '{}': {}", nested_name, e)),
            from_cache: false,
            nested: None,
        },
    }
}

/// Rehydrate a task's terminal state from a checkpoint
fn rehydrate(checkpoint: &Checkpoint, task: &mut AgentTask) {
    if !checkpoint.is_settled(&task.step_name) {
        return;
    }
    if checkpoint.completed_tasks.iter().any(|s| s == &task.step_name) {
        let result = checkpoint
            .results
            .get(&task.step_name)
            .cloned()
            .unwrap_or_default();
        task.succeed(result);
    } else if checkpoint.failed_tasks.iter().any(|s| s == &task.step_name) {
        task.fail("failed in a previous run".into());
    }
}
