//! Extension points for type and runtime-risk heuristics.
//!
//! Both detectors report nothing today. They sit in the logic pass so a
//! heuristic can be added here without touching the orchestrator or the
//! shape of its results. Runtime-risk messages are prefixed with
//! `Potential runtime error: ` by the orchestrator.

use crate::validator::detector::{DetectError, Detector, Subject};
use crate::validator::issue::Finding;

pub struct TypeConsistency;

impl Detector for TypeConsistency {
    fn name(&self) -> &'static str {
        "type-consistency"
    }

    fn detect(&self, _subject: &Subject<'_>) -> Result<Vec<Finding>, DetectError> {
        Ok(Vec::new())
    }
}

pub struct RuntimeRisks;

impl Detector for RuntimeRisks {
    fn name(&self) -> &'static str {
        "runtime-risks"
    }

    fn detect(&self, _subject: &Subject<'_>) -> Result<Vec<Finding>, DetectError> {
        Ok(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ValidatorConfig;
    use crate::tree::build_tree;

    #[test]
    fn report_nothing() {
        let source = "def f(x: int) -> str:\n    return 1 / 0\n";
        let tree = build_tree(source).unwrap();
        let config = ValidatorConfig::default();
        let subject = Subject::new(source, &tree, &config);
        assert!(TypeConsistency.detect(&subject).unwrap().is_empty());
        assert!(RuntimeRisks.detect(&subject).unwrap().is_empty());
    }
}
