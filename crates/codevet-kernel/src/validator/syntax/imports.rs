//! Import hygiene: duplicate and wildcard imports. Warnings only.

use std::collections::HashSet;

use crate::ast::{walk, StmtKind};
use crate::config::ValidatorConfig;
use crate::diagnostic::Diagnostic;
use crate::validator::detector::{DetectError, Detector, Subject};
use crate::validator::issue::Finding;

pub struct ImportHygiene;

impl Detector for ImportHygiene {
    fn name(&self) -> &'static str {
        "imports"
    }

    fn enabled(&self, config: &ValidatorConfig) -> bool {
        config.check_imports
    }

    fn detect(&self, subject: &Subject<'_>) -> Result<Vec<Finding>, DetectError> {
        let mut findings = Vec::new();
        let mut seen: HashSet<&str> = HashSet::new();

        // Duplicates only count at module level; the same import in two
        // functions is normal.
        for stmt in &subject.tree.module.body {
            match &stmt.kind {
                StmtKind::Import(aliases) => {
                    for alias in aliases {
                        if !seen.insert(alias.name.as_str()) {
                            findings.push(warning(format!("Duplicate import: {}", alias.name)));
                        }
                    }
                }
                StmtKind::ImportFrom {
                    module: Some(module),
                    level: 0,
                    ..
                } => {
                    if !seen.insert(module.as_str()) {
                        findings.push(warning(format!("Duplicate import from: {module}")));
                    }
                }
                _ => {}
            }
        }

        for stmt in walk::all_stmts(&subject.tree.module.body) {
            let StmtKind::ImportFrom { module, level, names } = &stmt.kind else {
                continue;
            };
            if names.iter().any(|alias| alias.name == "*") {
                let module = format!("{}{}", ".".repeat(*level), module.as_deref().unwrap_or(""));
                findings.push(warning(format!(
                    "Wildcard import from {module} - use explicit imports"
                )));
            }
        }

        Ok(findings)
    }
}

fn warning(message: String) -> Finding {
    Finding::warning(Diagnostic::new(message))
}
