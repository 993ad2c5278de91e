//! Text-pattern scans: common code smells (warnings) and unsafe
//! operations (errors).
//!
//! These run on the raw text, not the tree, so a pattern inside a string
//! or comment matches too. That is a known limitation of the heuristic.

use std::sync::LazyLock;

use regex::Regex;

use crate::config::ValidatorConfig;
use crate::diagnostic::Diagnostic;
use crate::validator::detector::{DetectError, Detector, Subject};
use crate::validator::issue::Finding;

const SMELLS: &[(&str, &str)] = &[
    (r"except\s*:", "Bare except clause - specify exception types"),
    (r"import\s+\*", "Wildcard imports - consider explicit imports"),
    (r"\bglobal\s+", "Global variable usage - consider refactoring"),
    (r"(?m)\bpass\s*$", "Empty code block - add implementation or remove"),
    (r"TODO|FIXME|XXX", "Unfinished code markers found"),
    (r"print\s*\(.*\)\s*#\s*debug", "Debug print statements found"),
];

const EVAL_HINTS: &[&str] = &[
    "Use ast.literal_eval() for safe evaluation",
    "Consider parsing data instead of evaluating code",
];
const EXEC_HINTS: &[&str] = &["Avoid dynamic code execution", "Use functions or classes instead"];
const WRITE_HINTS: &[&str] = &[
    "Validate file paths before writing",
    "Use context managers (with statement)",
];

const UNSAFE: &[(&str, &[&str])] = &[
    (r"\beval\s*\(", EVAL_HINTS),
    (r"\bexec\s*\(", EXEC_HINTS),
    (r"\b__import__\s*\(", &[]),
    (r"\bcompile\s*\(", &[]),
    (
        r#"\bopen\s*\([^)]*,\s*(?:mode\s*=\s*)?["'][wax]b?\+?["']"#,
        WRITE_HINTS,
    ),
    (r"\bos\.(?:system|popen|exec)", &[]),
    (r"\bsubprocess\.(?:run|call|Popen)", &[]),
    (r"\bshutil\.rmtree", &[]),
    (r"\bos\.remove", &[]),
];

static SMELL_TABLE: LazyLock<Result<Vec<(Regex, &'static str)>, regex::Error>> =
    LazyLock::new(|| {
        SMELLS
            .iter()
            .map(|(pattern, message)| Ok((Regex::new(pattern)?, *message)))
            .collect()
    });

static UNSAFE_TABLE: LazyLock<Result<Vec<(Regex, &'static [&'static str])>, regex::Error>> =
    LazyLock::new(|| {
        UNSAFE
            .iter()
            .map(|(pattern, hints)| Ok((Regex::new(pattern)?, *hints)))
            .collect()
    });

/// Style smells and overlong lines. Skipped under `lenient`.
pub struct CommonIssues;

impl Detector for CommonIssues {
    fn name(&self) -> &'static str {
        "common-issues"
    }

    fn enabled(&self, config: &ValidatorConfig) -> bool {
        config.validation_level.scans_common_issues()
    }

    fn detect(&self, subject: &Subject<'_>) -> Result<Vec<Finding>, DetectError> {
        let table = SMELL_TABLE.as_ref().map_err(|e| DetectError::from(e.clone()))?;
        let mut findings: Vec<Finding> = table
            .iter()
            .filter(|(regex, _)| regex.is_match(subject.source))
            .map(|(_, message)| Finding::warning(Diagnostic::new(*message)))
            .collect();

        let max = subject.config.max_line_length;
        for (idx, line) in subject.source.lines().enumerate() {
            if line.chars().count() > max {
                findings.push(Finding::warning(Diagnostic::new(format!(
                    "Line {} exceeds {} chars",
                    idx + 1,
                    max
                ))));
            }
        }

        Ok(findings)
    }
}

/// Dynamic evaluation, process spawning and destructive filesystem calls.
pub struct UnsafeOperations;

impl Detector for UnsafeOperations {
    fn name(&self) -> &'static str {
        "unsafe-operations"
    }

    fn enabled(&self, config: &ValidatorConfig) -> bool {
        !config.allow_unsafe_operations
    }

    fn detect(&self, subject: &Subject<'_>) -> Result<Vec<Finding>, DetectError> {
        let table = UNSAFE_TABLE.as_ref().map_err(|e| DetectError::from(e.clone()))?;
        let mut findings = Vec::new();
        for (regex, hints) in table {
            for found in regex.find_iter(subject.source) {
                let line = subject.line_of(found.start());
                let mut diag =
                    Diagnostic::new(format!("Unsafe operation detected: {}", found.as_str()))
                        .with_context(subject.context(line));
                for hint in *hints {
                    diag.add_suggestion(*hint);
                }
                findings.push(Finding::error(diag));
            }
        }
        Ok(findings)
    }
}
