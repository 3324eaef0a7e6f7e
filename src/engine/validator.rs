//! Preflight validation - static checks before any step executes

use crate::config::{WorkflowDefinition, WorkflowRegistry};
use std::collections::{HashMap, HashSet};

/// Outcome of a preflight check
///
/// Errors block execution; warnings are reported and the run proceeds.
#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Statically check a workflow before execution
///
/// Each check is independent so one broken reference does not hide
/// another. Cycle detection uses DFS and names a step in the cycle.
pub fn validate(
    workflow: &WorkflowDefinition,
    registry: &WorkflowRegistry,
    known_roles: &HashSet<String>,
) -> ValidationReport {
    let mut report = ValidationReport::default();

    let step_names: HashSet<&str> = workflow.steps.iter().map(|s| s.name.as_str()).collect();

    // Duplicate step names (also caught at file load, but workflows
    // can enter the registry without going through a file)
    let mut seen = HashSet::new();
    for step in &workflow.steps {
        if !seen.insert(step.name.as_str()) {
            report
                .errors
                .push(format!("duplicate step name '{}'", step.name));
        }
    }

    // Unknown dependency targets
    for step in &workflow.steps {
        for dep in &step.depends_on {
            if !step_names.contains(dep.as_str()) {
                report.errors.push(format!(
                    "step '{}' depends on unknown step '{}'",
                    step.name, dep
                ));
            }
        }
    }

    // Cycle detection
    if let Some(cycle_step) = find_cycle(workflow) {
        report.errors.push(format!(
            "circular dependency detected involving step '{}'",
            cycle_step
        ));
    }

    // Role references
    for step in &workflow.steps {
        if !known_roles.contains(&step.role) {
            report
                .errors
                .push(format!("step '{}' uses unknown role '{}'", step.name, step.role));
        }
        for spawn in &step.spawn_tasks {
            if !known_roles.contains(&spawn.role) {
                report.errors.push(format!(
                    "spawned step '{}' uses unknown role '{}'",
                    spawn.name, spawn.role
                ));
            }
        }
    }

    // Nested workflow references
    for step in &workflow.steps {
        if let Some(ref nested) = step.nested_workflow {
            if !registry.contains(nested) {
                report.errors.push(format!(
                    "step '{}' references unknown workflow '{}'",
                    step.name, nested
                ));
            }
        }
    }

    // Soft checks
    for step in &workflow.steps {
        if step.description.is_empty() {
            report
                .warnings
                .push(format!("step '{}' has no description", step.name));
        }
        if step.timeout_secs == Some(0) {
            report
                .warnings
                .push(format!("step '{}' has a zero timeout", step.name));
        }
    }

    report
}

/// DFS cycle detection, returning a step inside the cycle if any
fn find_cycle(workflow: &WorkflowDefinition) -> Option<String> {
    let deps: HashMap<&str, &Vec<String>> = workflow
        .steps
        .iter()
        .map(|s| (s.name.as_str(), &s.depends_on))
        .collect();

    fn visit<'a>(
        node: &'a str,
        deps: &HashMap<&'a str, &'a Vec<String>>,
        visited: &mut HashSet<&'a str>,
        in_progress: &mut HashSet<&'a str>,
    ) -> Option<String> {
        if visited.contains(node) {
            return None;
        }
        if in_progress.contains(node) {
            return Some(node.to_string());
        }

        in_progress.insert(node);
        if let Some(node_deps) = deps.get(node) {
            for dep in node_deps.iter() {
                // Unknown deps are reported separately
                if deps.contains_key(dep.as_str()) {
                    if let Some(cycle) = visit(dep, deps, visited, in_progress) {
                        return Some(cycle);
                    }
                }
            }
        }
        in_progress.remove(node);
        visited.insert(node);
        None
    }

    let mut visited = HashSet::new();
    let mut in_progress = HashSet::new();
    for step in &workflow.steps {
        if let Some(cycle) = visit(step.name.as_str(), &deps, &mut visited, &mut in_progress) {
            return Some(cycle);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Step;

    fn roles(names: &[&str]) -> HashSet<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn step(name: &str, role: &str, deps: &[&str]) -> Step {
        Step {
            name: name.into(),
            description: "does something".into(),
            role: role.into(),
            depends_on: deps.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_valid_workflow() {
        let wf = WorkflowDefinition {
            name: "ok".into(),
            steps: vec![step("a", "worker", &[]), step("b", "worker", &["a"])],
            ..Default::default()
        };

        let report = validate(&wf, &WorkflowRegistry::new(), &roles(&["worker"]));
        assert!(report.is_valid());
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn test_unknown_dependency_is_error() {
        let wf = WorkflowDefinition {
            name: "bad".into(),
            steps: vec![step("a", "worker", &["ghost"])],
            ..Default::default()
        };

        let report = validate(&wf, &WorkflowRegistry::new(), &roles(&["worker"]));
        assert!(!report.is_valid());
        assert!(report.errors.iter().any(|e| e.contains("ghost")));
    }

    #[test]
    fn test_cycle_is_error_naming_a_member() {
        let wf = WorkflowDefinition {
            name: "loop".into(),
            steps: vec![
                step("a", "worker", &["c"]),
                step("b", "worker", &["a"]),
                step("c", "worker", &["b"]),
            ],
            ..Default::default()
        };

        let report = validate(&wf, &WorkflowRegistry::new(), &roles(&["worker"]));
        assert!(!report.is_valid());
        let cycle_error = report
            .errors
            .iter()
            .find(|e| e.contains("circular"))
            .unwrap();
        assert!(["'a'", "'b'", "'c'"].iter().any(|n| cycle_error.contains(n)));
    }

    #[test]
    fn test_duplicate_step_names_are_error() {
        let wf = WorkflowDefinition {
            name: "dup".into(),
            steps: vec![step("a", "worker", &[]), step("a", "worker", &[])],
            ..Default::default()
        };

        let report = validate(&wf, &WorkflowRegistry::new(), &roles(&["worker"]));
        assert!(!report.is_valid());
        assert!(report.errors.iter().any(|e| e.contains("duplicate")));
    }

    #[test]
    fn test_unknown_role_is_error() {
        let wf = WorkflowDefinition {
            name: "bad".into(),
            steps: vec![step("a", "wizard", &[])],
            ..Default::default()
        };

        let report = validate(&wf, &WorkflowRegistry::new(), &roles(&["worker"]));
        assert!(report.errors.iter().any(|e| e.contains("wizard")));
    }

    #[test]
    fn test_unknown_nested_workflow_is_error() {
        let mut s = step("a", "worker", &[]);
        s.nested_workflow = Some("missing-flow".into());
        let wf = WorkflowDefinition {
            name: "bad".into(),
            steps: vec![s],
            ..Default::default()
        };

        let report = validate(&wf, &WorkflowRegistry::new(), &roles(&["worker"]));
        assert!(report.errors.iter().any(|e| e.contains("missing-flow")));
    }

    #[test]
    fn test_known_nested_workflow_passes() {
        let mut registry = WorkflowRegistry::new();
        registry.insert(WorkflowDefinition {
            name: "child".into(),
            ..Default::default()
        });

        let mut s = step("a", "worker", &[]);
        s.nested_workflow = Some("child".into());
        let wf = WorkflowDefinition {
            name: "parent".into(),
            steps: vec![s],
            ..Default::default()
        };

        let report = validate(&wf, &registry, &roles(&["worker"]));
        assert!(report.is_valid());
    }

    #[test]
    fn test_missing_description_is_warning_only() {
        let wf = WorkflowDefinition {
            name: "quiet".into(),
            steps: vec![Step {
                name: "a".into(),
                role: "worker".into(),
                ..Default::default()
            }],
            ..Default::default()
        };

        let report = validate(&wf, &WorkflowRegistry::new(), &roles(&["worker"]));
        assert!(report.is_valid());
        assert!(report.warnings.iter().any(|w| w.contains("description")));
    }

    #[test]
    fn test_independent_checks_all_reported() {
        let wf = WorkflowDefinition {
            name: "multi".into(),
            steps: vec![
                step("a", "ghost-role", &["nope"]),
                step("b", "worker", &["c"]),
                step("c", "worker", &["b"]),
            ],
            ..Default::default()
        };

        let report = validate(&wf, &WorkflowRegistry::new(), &roles(&["worker"]));
        assert!(report.errors.iter().any(|e| e.contains("nope")));
        assert!(report.errors.iter().any(|e| e.contains("ghost-role")));
        assert!(report.errors.iter().any(|e| e.contains("circular")));
    }
}
