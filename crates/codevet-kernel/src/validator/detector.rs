//! The detector interface and its failure-isolating runner.
//!
//! Every check in the syntax, logic and suggestion passes is a
//! [`Detector`]. The passes hold a list of them and hand each one the same
//! [`Subject`]; adding a check means adding a detector to a list, not
//! touching the orchestrator.
//!
//! A detector that fails (an `Err`, or a panic on some tree shape nobody
//! anticipated) contributes no findings. The failure is logged and the
//! pass carries on.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use codevet_types::DiagnosticContext;

use super::issue::Finding;
use crate::config::ValidatorConfig;
use crate::tree::Tree;

/// Detector-internal failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DetectError {
    #[error("pattern table failed to compile: {0}")]
    Pattern(String),
}

impl From<regex::Error> for DetectError {
    fn from(err: regex::Error) -> Self {
        DetectError::Pattern(err.to_string())
    }
}

/// What a detector looks at: the raw text, its tree and the configuration.
#[derive(Debug, Clone, Copy)]
pub struct Subject<'a> {
    pub source: &'a str,
    pub tree: &'a Tree,
    pub config: &'a ValidatorConfig,
}

impl<'a> Subject<'a> {
    pub fn new(source: &'a str, tree: &'a Tree, config: &'a ValidatorConfig) -> Self {
        Self {
            source,
            tree,
            config,
        }
    }

    /// 1-based line of a byte offset into the source.
    pub fn line_of(&self, offset: usize) -> usize {
        self.tree.line_of(offset)
    }

    /// Diagnostic context for `line`, using the configured window.
    pub fn context(&self, line: usize) -> DiagnosticContext {
        DiagnosticContext::from_source(self.source, line, None, self.config.context_lines)
    }
}

/// One independent heuristic check.
pub trait Detector: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Whether this detector runs under `config`.
    fn enabled(&self, _config: &ValidatorConfig) -> bool {
        true
    }

    fn detect(&self, subject: &Subject<'_>) -> Result<Vec<Finding>, DetectError>;
}

/// Run every enabled detector in order and concatenate their findings.
pub fn run_all(detectors: &[Box<dyn Detector>], subject: &Subject<'_>) -> Vec<Finding> {
    detectors
        .iter()
        .filter(|d| d.enabled(subject.config))
        .flat_map(|d| run_isolated(d.as_ref(), subject))
        .collect()
}

/// Run one detector, turning failures and panics into "no findings".
pub fn run_isolated(detector: &dyn Detector, subject: &Subject<'_>) -> Vec<Finding> {
    let name = detector.name();
    match panic::catch_unwind(AssertUnwindSafe(|| detector.detect(subject))) {
        Ok(Ok(findings)) => {
            tracing::debug!(detector = name, count = findings.len(), "detector finished");
            findings
        }
        Ok(Err(err)) => {
            tracing::warn!(detector = name, error = %err, "detector failed, dropping its findings");
            Vec::new()
        }
        Err(payload) => {
            tracing::warn!(
                detector = name,
                panic = panic_message(payload.as_ref()),
                "detector panicked, dropping its findings"
            );
            Vec::new()
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "non-string panic payload"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostic::Diagnostic;
    use crate::tree::build_tree;

    struct Fixed(&'static str);
    struct Failing;
    struct Panicking;
    struct StrictOnly;

    impl Detector for Fixed {
        fn name(&self) -> &'static str {
            "fixed"
        }
        fn detect(&self, _: &Subject<'_>) -> Result<Vec<Finding>, DetectError> {
            Ok(vec![Finding::warning(Diagnostic::new(self.0))])
        }
    }

    impl Detector for Failing {
        fn name(&self) -> &'static str {
            "failing"
        }
        fn detect(&self, _: &Subject<'_>) -> Result<Vec<Finding>, DetectError> {
            let pattern = String::from("(unclosed");
            regex::Regex::new(&pattern)?;
            Ok(Vec::new())
        }
    }

    impl Detector for Panicking {
        fn name(&self) -> &'static str {
            "panicking"
        }
        fn detect(&self, _: &Subject<'_>) -> Result<Vec<Finding>, DetectError> {
            panic!("index out of bounds")
        }
    }

    impl Detector for StrictOnly {
        fn name(&self) -> &'static str {
            "strict-only"
        }
        fn enabled(&self, config: &ValidatorConfig) -> bool {
            config.validation_level.is_strict()
        }
        fn detect(&self, _: &Subject<'_>) -> Result<Vec<Finding>, DetectError> {
            Ok(vec![Finding::warning(Diagnostic::new("strict"))])
        }
    }

    #[test]
    fn failures_and_panics_are_isolated() {
        let tree = build_tree("x = 1\n").unwrap();
        let config = ValidatorConfig::default();
        let subject = Subject::new("x = 1\n", &tree, &config);
        let detectors: Vec<Box<dyn Detector>> = vec![
            Box::new(Fixed("first")),
            Box::new(Failing),
            Box::new(Panicking),
            Box::new(Fixed("last")),
        ];
        let texts: Vec<_> = run_all(&detectors, &subject).iter().map(Finding::text).collect();
        assert_eq!(texts, ["first", "last"]);
    }

    #[test]
    fn disabled_detectors_are_skipped() {
        let tree = build_tree("x = 1\n").unwrap();
        let config = ValidatorConfig::default().with_level(codevet_types::ValidationLevel::Normal);
        let subject = Subject::new("x = 1\n", &tree, &config);
        let detectors: Vec<Box<dyn Detector>> = vec![Box::new(StrictOnly)];
        assert!(run_all(&detectors, &subject).is_empty());
    }

    #[test]
    fn regex_errors_convert() {
        let pattern = String::from("(");
        let err: DetectError = regex::Regex::new(&pattern).unwrap_err().into();
        assert!(matches!(err, DetectError::Pattern(_)));
    }
}
