//! Layered validation of candidate Python code.
//!
//! A [`Validator`] owns one configuration, one parse cache and one result
//! cache, and exposes three passes:
//!
//! - [`Validator::validate_syntax`]: parse, then indentation, names,
//!   imports, common issues, unsafe operations and a character rescan
//! - [`Validator::validate_logic`]: unreachable code, unused bindings,
//!   infinite loops, missing returns
//! - [`Validator::suggest_improvements`]: advisory style, performance,
//!   readability, best-practice and security hints
//!
//! Each pass is a list of [`Detector`]s. A detector that fails or panics
//! contributes nothing; the pass and the caller carry on.
//!
//! # Example
//!
//! ```
//! use codevet_kernel::{Validator, ValidatorConfig};
//!
//! let validator = Validator::new(ValidatorConfig::default())?;
//! let result = validator.validate_syntax("def f(x):\n    return x\n");
//! assert!(result.is_valid());
//! # Ok::<(), codevet_kernel::ConfigError>(())
//! ```

pub mod detector;
mod issue;
pub mod logic;
mod names;
pub mod suggest;
pub mod syntax;

pub use detector::{DetectError, Detector, Subject};
pub use issue::{Finding, Severity};

use codevet_types::{CheckKind, ValidationResult};
use serde::Serialize;

use crate::cache::{BoundedCache, CacheKey, CacheStats};
use crate::config::{ConfigError, ValidatorConfig};
use crate::diagnostic::Diagnostic;
use crate::tree::TreeBuilder;

/// Counters for both caches a [`Validator`] owns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ValidatorCacheStats {
    pub results: CacheStats,
    pub parses: CacheStats,
}

pub struct Validator {
    config: ValidatorConfig,
    trees: TreeBuilder,
    results: BoundedCache<CacheKey, ValidationResult>,
    syntax: Vec<Box<dyn Detector>>,
    logic: Vec<Box<dyn Detector>>,
    runtime: Vec<Box<dyn Detector>>,
    suggestions: Vec<Box<dyn Detector>>,
}

impl std::fmt::Debug for Validator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Validator")
            .field("config", &self.config)
            .field("syntax_detectors", &self.syntax.len())
            .field("logic_detectors", &(self.logic.len() + self.runtime.len()))
            .field("suggestion_detectors", &self.suggestions.len())
            .finish_non_exhaustive()
    }
}

impl Validator {
    /// Build a validator with the standard detectors.
    ///
    /// The configuration is checked first; it cannot change afterwards.
    pub fn new(config: ValidatorConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            trees: TreeBuilder::new(config.cache_capacity),
            results: BoundedCache::new(config.cache_capacity),
            syntax: syntax::detectors(),
            logic: logic::detectors(),
            runtime: logic::runtime_detectors(),
            suggestions: suggest::detectors(),
            config,
        })
    }

    /// Append a detector to the syntax pass.
    pub fn with_syntax_detector(mut self, detector: Box<dyn Detector>) -> Self {
        self.syntax.push(detector);
        self.results.clear();
        self
    }

    /// Append a detector to the logic pass. Its findings are warnings.
    pub fn with_logic_detector(mut self, detector: Box<dyn Detector>) -> Self {
        self.logic.push(detector);
        self.results.clear();
        self
    }

    /// Append a scanner to the suggestion pass.
    pub fn with_suggestion_detector(mut self, detector: Box<dyn Detector>) -> Self {
        self.suggestions.push(detector);
        self
    }

    pub fn config(&self) -> &ValidatorConfig {
        &self.config
    }

    /// Check that `code` parses and passes the structural and safety scans.
    pub fn validate_syntax(&self, code: &str) -> ValidationResult {
        self.results
            .get_or_insert_with(CacheKey::new(code, CheckKind::Syntax), || {
                self.run_syntax(code)
            })
    }

    fn run_syntax(&self, code: &str) -> ValidationResult {
        let _span = tracing::debug_span!("validate_syntax", bytes = code.len()).entered();
        let mut result = ValidationResult::new();

        if code.trim().is_empty() {
            result.add_error("Empty code provided", None);
            return result;
        }

        let outcome = self.trees.parse(code);
        let tree = match outcome.as_ref() {
            Ok(tree) => tree,
            Err(failure) => {
                tracing::debug!(%failure, "parse failed");
                syntax::failure_finding(code, failure, self.config.context_lines)
                    .record(&mut result);
                return result;
            }
        };

        let subject = Subject::new(code, tree, &self.config);
        for finding in detector::run_all(&self.syntax, &subject) {
            finding.record(&mut result);
        }
        tracing::debug!(
            errors = result.errors().len(),
            warnings = result.warnings().len(),
            "syntax pass finished"
        );
        result
    }

    /// Look for likely logic mistakes in code that parses.
    ///
    /// Everything reported here is a warning; only unparseable input makes
    /// the result invalid.
    pub fn validate_logic(&self, code: &str) -> ValidationResult {
        self.results
            .get_or_insert_with(CacheKey::new(code, CheckKind::Logic), || {
                self.run_logic(code)
            })
    }

    fn run_logic(&self, code: &str) -> ValidationResult {
        let _span = tracing::debug_span!("validate_logic", bytes = code.len()).entered();
        let mut result = ValidationResult::new();

        let outcome = self.trees.parse(code);
        let Ok(tree) = outcome.as_ref() else {
            let diag = Diagnostic::new("Cannot perform logic validation on syntactically invalid code")
                .with_suggestion("Fix syntax errors first")
                .with_suggestion("Run syntax validation to see specific errors");
            Finding::error(diag).record(&mut result);
            return result;
        };

        let subject = Subject::new(code, tree, &self.config);
        for finding in detector::run_all(&self.logic, &subject) {
            result.add_warning(finding.text());
        }
        for finding in detector::run_all(&self.runtime, &subject) {
            result.add_warning(format!("Potential runtime error: {}", finding.text()));
        }
        tracing::debug!(warnings = result.warnings().len(), "logic pass finished");
        result
    }

    /// Advisory improvements, de-duplicated in first-seen order.
    ///
    /// Not cached. Unparseable input yields a single instruction to fix the
    /// syntax first.
    pub fn suggest_improvements(&self, code: &str) -> Vec<String> {
        let outcome = self.trees.parse(code);
        let Ok(tree) = outcome.as_ref() else {
            return vec!["Fix syntax errors before requesting improvements".to_string()];
        };
        let subject = Subject::new(code, tree, &self.config);
        suggest::collect(&self.suggestions, &subject)
    }

    pub fn cache_stats(&self) -> ValidatorCacheStats {
        ValidatorCacheStats {
            results: self.results.stats(),
            parses: self.trees.stats(),
        }
    }

    /// Drop every cached parse and result.
    pub fn clear_cache(&self) {
        self.results.clear();
        self.trees.clear();
        tracing::debug!("caches cleared");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use codevet_types::ValidationLevel;

    fn validator() -> Validator {
        Validator::new(ValidatorConfig::default()).unwrap()
    }

    #[test]
    fn rejects_invalid_config() {
        let config = ValidatorConfig::default().with_indent_size(3);
        assert!(matches!(Validator::new(config), Err(ConfigError::IndentSize(3))));
    }

    #[test]
    fn empty_input() {
        for code in ["", "   \n\t\n"] {
            let result = validator().validate_syntax(code);
            assert!(!result.is_valid());
            assert_eq!(result.errors(), ["Empty code provided"]);
            assert!(result.warnings().is_empty());
            assert!(result.suggestions().is_empty());
        }
    }

    #[test]
    fn clean_function_is_valid() {
        let result = validator().validate_syntax("def add(a, b):\n    return a + b\n");
        assert!(result.is_valid(), "{:?}", result.errors());
        assert!(result.warnings().is_empty());
    }

    #[test]
    fn parse_failure_is_the_only_error() {
        let result = validator().validate_syntax("def f(:\n    eval(x)\n");
        assert_eq!(result.errors().len(), 1);
        assert!(result.errors()[0].starts_with("Syntax error: "));
        assert!(result.warnings().is_empty());
        assert_eq!(result.line_numbers(), [1]);
    }

    #[test]
    fn unsafe_call_is_an_error() {
        let result = validator().validate_syntax("text = input()\ndata = eval(text)\n");
        assert!(!result.is_valid());
        assert_eq!(result.errors().len(), 1);
        assert!(result.errors()[0].starts_with("Unsafe operation detected: eval("));
        assert_eq!(result.line_numbers(), [2]);
    }

    #[test]
    fn logic_on_broken_code() {
        let result = validator().validate_logic("def f(:\n");
        assert!(!result.is_valid());
        assert_eq!(result.errors().len(), 1);
        assert!(
            result.errors()[0]
                .starts_with("Cannot perform logic validation on syntactically invalid code")
        );
        assert!(result.errors()[0].contains("Fix syntax errors first"));
    }

    #[test]
    fn logic_findings_are_warnings() {
        let code = "def f(x, y):\n    return x\n    print(y)\n";
        let result = validator().validate_logic(code);
        assert!(result.is_valid());
        assert_eq!(
            result.warnings(),
            ["Unreachable code detected: statement after return in 'f' (line 3)"]
        );
    }

    #[test]
    fn unused_bindings_only_when_strict() {
        let code = "def f():\n    scratch = 1\n    return 2\n";
        let strict = validator().validate_logic(code);
        assert_eq!(strict.warnings(), ["Unused variable: scratch"]);

        let normal = Validator::new(ValidatorConfig::default().with_level(ValidationLevel::Normal))
            .unwrap()
            .validate_logic(code);
        assert!(normal.warnings().is_empty());
    }

    #[test]
    fn suggestions_on_broken_code() {
        assert_eq!(
            validator().suggest_improvements("def f(:\n"),
            ["Fix syntax errors before requesting improvements"]
        );
    }

    #[test]
    fn results_are_cached_per_kind() {
        let v = validator();
        let code = "x = 1\nprint(x)\n";
        let first = v.validate_syntax(code);
        let second = v.validate_syntax(code);
        assert_eq!(first, second);
        v.validate_logic(code);

        let stats = v.cache_stats();
        assert_eq!(stats.results.len, 2);
        assert_eq!(stats.results.hits, 1);
        assert_eq!(stats.parses.len, 1);
        assert_eq!(stats.parses.hits, 1);

        v.clear_cache();
        assert_eq!(v.cache_stats().results.len, 0);
        assert_eq!(v.validate_syntax(code), first);
    }

    struct Shouty;

    impl Detector for Shouty {
        fn name(&self) -> &'static str {
            "shouty"
        }

        fn detect(&self, _: &Subject<'_>) -> Result<Vec<Finding>, DetectError> {
            Ok(vec![Finding::warning(Diagnostic::new("Too loud"))])
        }
    }

    #[test]
    fn custom_detectors_join_their_pass() {
        let v = validator()
            .with_syntax_detector(Box::new(Shouty))
            .with_logic_detector(Box::new(Shouty))
            .with_suggestion_detector(Box::new(Shouty));
        let code = "x = 1\nprint(x)\n";
        assert_eq!(v.validate_syntax(code).warnings(), ["Too loud"]);
        assert_eq!(v.validate_logic(code).warnings(), ["Too loud"]);
        assert_eq!(v.suggest_improvements(code), ["Too loud"]);
    }

    #[test]
    fn debug_lists_detector_counts() {
        let v = validator().with_logic_detector(Box::new(Shouty));
        let logic = logic::detectors().len() + logic::runtime_detectors().len() + 1;
        let text = format!("{v:?}");
        assert!(text.starts_with("Validator {"), "{text}");
        assert!(text.contains(&format!("logic_detectors: {logic}")), "{text}");
    }
}
