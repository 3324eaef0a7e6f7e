//! Deterministic step fingerprints for cache keying

use crate::config::Step;
use std::hash::{Hash, Hasher};

/// Compute the cache fingerprint for a step
///
/// The fingerprint covers the step's identity inputs: name,
/// description, role, and any run parameters that change what the
/// runner would produce. Dependency wiring is deliberately excluded;
/// moving a step around the graph does not invalidate its result.
pub fn fingerprint(step: &Step, run_params: &[(&str, &str)]) -> String {
    let mut hasher = std::collections::hash_map::DefaultHasher::new();

    step.name.hash(&mut hasher);
    step.description.hash(&mut hasher);
    step.role.hash(&mut hasher);
    for (key, value) in run_params {
        key.hash(&mut hasher);
        value.hash(&mut hasher);
    }

    format!("{:016x}", hasher.finish())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step(name: &str, description: &str, role: &str) -> Step {
        Step {
            name: name.into(),
            description: description.into(),
            role: role.into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_fingerprint_deterministic() {
        let a = step("build", "compile it", "worker");
        let b = step("build", "compile it", "worker");

        assert_eq!(fingerprint(&a, &[]), fingerprint(&b, &[]));
    }

    #[test]
    fn test_fingerprint_changes_with_inputs() {
        let base = step("build", "compile it", "worker");
        let renamed = step("build2", "compile it", "worker");
        let reworded = step("build", "compile it differently", "worker");
        let rerolled = step("build", "compile it", "analyzer");

        let fp = fingerprint(&base, &[]);
        assert_ne!(fp, fingerprint(&renamed, &[]));
        assert_ne!(fp, fingerprint(&reworded, &[]));
        assert_ne!(fp, fingerprint(&rerolled, &[]));
    }

    #[test]
    fn test_fingerprint_ignores_dependencies() {
        let mut a = step("build", "compile it", "worker");
        let mut b = step("build", "compile it", "worker");
        a.depends_on = vec!["fetch".into()];
        b.depends_on = vec![];

        assert_eq!(fingerprint(&a, &[]), fingerprint(&b, &[]));
    }

    #[test]
    fn test_fingerprint_run_params() {
        let s = step("build", "compile it", "worker");

        let plain = fingerprint(&s, &[]);
        let with_params = fingerprint(&s, &[("target", "release")]);
        assert_ne!(plain, with_params);

        let same_params = fingerprint(&s, &[("target", "release")]);
        assert_eq!(with_params, same_params);
    }
}
