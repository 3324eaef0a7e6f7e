//! Execution planning - Kahn layering of steps into parallel groups

use super::task::AgentTask;
use crate::config::{Step, WorkflowDefinition};
use std::collections::HashSet;
use thiserror::Error;

/// Errors during plan construction
#[derive(Debug, Error)]
pub enum PlanError {
    #[error("cyclic dependency involving steps: {}", steps.join(", "))]
    CyclicDependency { steps: Vec<String> },
}

/// A topological layer of the plan
///
/// Steps in the same group have no dependency on each other, so a
/// group with more than one step is parallel-eligible.
#[derive(Debug, Clone)]
pub struct Group {
    /// Position in the plan
    pub order: usize,

    /// Steps in this layer, in definition order
    pub steps: Vec<Step>,

    /// Whether the group may be dispatched concurrently
    pub parallel: bool,
}

impl Group {
    /// Build a group, deriving the parallel flag
    pub fn new(order: usize, steps: Vec<Step>) -> Self {
        let parallel = steps.len() > 1;
        Self {
            order,
            steps,
            parallel,
        }
    }

    /// Ad hoc single-step group for a spawned task
    pub fn spawned(order: usize, step: Step) -> Self {
        Self::new(order, vec![step])
    }
}

/// An ordered sequence of groups plus the pre-created task set
///
/// The group list stays mutable so the engine can splice spawned
/// single-step groups after the spawning group mid-run.
#[derive(Debug, Clone)]
pub struct ExecutionPlan {
    /// Groups in execution order
    pub groups: Vec<Group>,

    /// One pending task per step
    pub tasks: Vec<AgentTask>,
}

impl ExecutionPlan {
    /// Total number of planned steps
    pub fn step_count(&self) -> usize {
        self.groups.iter().map(|g| g.steps.len()).sum()
    }

    /// Insert an ad hoc group right after the given group index,
    /// renumbering the groups that follow
    pub fn splice_after(&mut self, index: usize, step: Step) {
        let at = (index + 1).min(self.groups.len());
        self.tasks.push(AgentTask::new(&step.name, &step.role));
        self.groups.insert(at, Group::spawned(at, step));
        for (order, group) in self.groups.iter_mut().enumerate() {
            group.order = order;
        }
    }
}

/// Build an execution plan from a workflow definition
///
/// Kahn's layering: repeatedly extract every step whose dependencies
/// are all already placed. Each extraction round becomes one group, so
/// independent steps land in the same group and can run in parallel.
/// Definition order is preserved within a group for determinism.
pub fn build_plan(workflow: &WorkflowDefinition) -> Result<ExecutionPlan, PlanError> {
    let mut placed: HashSet<&str> = HashSet::new();
    let mut remaining: Vec<&Step> = workflow.steps.iter().collect();
    let mut groups = Vec::new();

    while !remaining.is_empty() {
        let (ready, blocked): (Vec<&Step>, Vec<&Step>) = remaining
            .into_iter()
            .partition(|s| s.depends_on.iter().all(|d| placed.contains(d.as_str())));

        if ready.is_empty() {
            // No progress possible: whatever is left is in (or behind) a cycle
            return Err(PlanError::CyclicDependency {
                steps: blocked.iter().map(|s| s.name.clone()).collect(),
            });
        }

        for step in &ready {
            placed.insert(step.name.as_str());
        }
        groups.push(Group::new(
            groups.len(),
            ready.into_iter().cloned().collect(),
        ));
        remaining = blocked;
    }

    let tasks = workflow
        .steps
        .iter()
        .map(|s| AgentTask::new(&s.name, &s.role))
        .collect();

    Ok(ExecutionPlan { groups, tasks })
}
