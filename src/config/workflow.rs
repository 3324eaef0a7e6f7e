//! Workflow and step definitions

use serde::{Deserialize, Serialize};

/// Template for a dynamically spawned step
///
/// Spawned steps are synthesized after the spawning step completes and
/// are spliced into the plan depending on the spawning step.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SpawnSpec {
    /// Name of the spawned step (unique within the run)
    pub name: String,

    /// Human-readable description
    #[serde(default)]
    pub description: String,

    /// Role to execute the spawned step under
    pub role: String,
}

/// Definition of a single workflow step
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Step {
    /// Step name (unique within workflow)
    pub name: String,

    /// Human-readable description, also part of the cache fingerprint
    #[serde(default)]
    pub description: String,

    /// Role this step runs under
    pub role: String,

    /// Steps this step depends on
    #[serde(default)]
    pub depends_on: Vec<String>,

    /// Name of a workflow to run as the body of this step
    pub nested_workflow: Option<String>,

    /// Steps to spawn after this step completes
    #[serde(default)]
    pub spawn_tasks: Vec<SpawnSpec>,

    /// Per-step timeout in seconds (overrides the engine default)
    pub timeout_secs: Option<u64>,
}

impl Default for Step {
    fn default() -> Self {
        Self {
            name: String::new(),
            description: String::new(),
            role: "default".into(),
            depends_on: Vec::new(),
            nested_workflow: None,
            spawn_tasks: Vec::new(),
            timeout_secs: None,
        }
    }
}

impl Step {
    /// Build a step from a spawn spec, depending on the step that spawned it
    pub fn from_spawn(spec: &SpawnSpec, parent: &str) -> Self {
        Self {
            name: spec.name.clone(),
            description: spec.description.clone(),
            role: spec.role.clone(),
            depends_on: vec![parent.to_string()],
            nested_workflow: None,
            spawn_tasks: Vec::new(),
            timeout_secs: None,
        }
    }
}

/// Full workflow definition, immutable after load
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct WorkflowDefinition {
    /// Workflow name
    pub name: String,

    /// Human-readable description
    #[serde(default)]
    pub description: String,

    /// Steps in definition order
    #[serde(default)]
    pub steps: Vec<Step>,
}

impl WorkflowDefinition {
    /// Structural validation of the definition itself
    ///
    /// Cross-workflow checks (nested references, roles, cycles) live in
    /// the preflight validator; this only covers what a single
    /// definition can answer on its own.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        let mut seen_names = std::collections::HashSet::new();
        for step in &self.steps {
            if !seen_names.insert(&step.name) {
                errors.push(format!("duplicate step name: {}", step.name));
            }
        }

        let step_names: std::collections::HashSet<_> =
            self.steps.iter().map(|s| s.name.as_str()).collect();
        for step in &self.steps {
            for dep in &step.depends_on {
                if !step_names.contains(dep.as_str()) {
                    errors.push(format!(
                        "step '{}' depends on unknown step '{}'",
                        step.name, dep
                    ));
                }
            }
        }

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_from_toml() {
        let toml = r#"
            name = "analyze"
            description = "Analyze the repository"
            role = "analyzer"
            depends_on = ["fetch"]
        "#;
        let step: Step = toml::from_str(toml).unwrap();
        assert_eq!(step.name, "analyze");
        assert_eq!(step.role, "analyzer");
        assert_eq!(step.depends_on, vec!["fetch"]);
        assert!(step.nested_workflow.is_none());
    }

    #[test]
    fn test_workflow_from_toml() {
        let toml = r#"
            name = "review"
            description = "Review a change"

            [[steps]]
            name = "fetch"
            role = "worker"

            [[steps]]
            name = "analyze"
            role = "analyzer"
            depends_on = ["fetch"]

            [[steps.spawn_tasks]]
            name = "followup"
            role = "worker"
        "#;
        let workflow: WorkflowDefinition = toml::from_str(toml).unwrap();
        assert_eq!(workflow.name, "review");
        assert_eq!(workflow.steps.len(), 2);
        assert_eq!(workflow.steps[1].spawn_tasks.len(), 1);
    }

    #[test]
    fn test_validate_duplicate_names() {
        let workflow = WorkflowDefinition {
            name: "dup".into(),
            steps: vec![
                Step {
                    name: "a".into(),
                    ..Default::default()
                },
                Step {
                    name: "a".into(),
                    ..Default::default()
                },
            ],
            ..Default::default()
        };

        let errors = workflow.validate().unwrap_err();
        assert!(errors.iter().any(|e| e.contains("duplicate")));
    }

    #[test]
    fn test_validate_unknown_dependency() {
        let workflow = WorkflowDefinition {
            name: "bad".into(),
            steps: vec![Step {
                name: "a".into(),
                depends_on: vec!["missing".into()],
                ..Default::default()
            }],
            ..Default::default()
        };

        let errors = workflow.validate().unwrap_err();
        assert!(errors.iter().any(|e| e.contains("missing")));
    }

    #[test]
    fn test_step_from_spawn() {
        let spec = SpawnSpec {
            name: "child".into(),
            description: "spawned".into(),
            role: "worker".into(),
        };

        let step = Step::from_spawn(&spec, "parent");
        assert_eq!(step.name, "child");
        assert_eq!(step.depends_on, vec!["parent"]);
    }
}
