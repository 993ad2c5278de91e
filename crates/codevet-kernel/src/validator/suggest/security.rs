//! Security hints. Advisory only; the blocking checks live in the syntax
//! pass's unsafe-operation scan.

use std::sync::LazyLock;

use regex::Regex;

use crate::validator::detector::{DetectError, Detector, Subject};
use crate::validator::issue::Finding;

static HARDCODED_PASSWORD: LazyLock<Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(r#"(?i)password\s*=\s*["'][^"']+["']"#));

pub struct SecurityHints;

impl Detector for SecurityHints {
    fn name(&self) -> &'static str {
        "security"
    }

    fn detect(&self, subject: &Subject<'_>) -> Result<Vec<Finding>, DetectError> {
        let password = HARDCODED_PASSWORD
            .as_ref()
            .map_err(|e| DetectError::from(e.clone()))?;
        let source = subject.source;
        let mut findings = Vec::new();

        if password.is_match(source) {
            findings.push(Finding::suggestion(
                "Avoid hardcoding passwords - use environment variables or config files",
            ));
        }
        if source.to_lowercase().contains("sql") && source.contains("%s") {
            findings.push(Finding::suggestion(
                "Use parameterized queries to prevent SQL injection",
            ));
        }
        if source.contains("../") || source.contains("..\\") {
            findings.push(Finding::suggestion(
                "Validate file paths to prevent directory traversal attacks",
            ));
        }

        Ok(findings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ValidatorConfig;
    use crate::tree::build_tree;

    fn check(source: &str) -> Vec<String> {
        let tree = build_tree(source).unwrap();
        let config = ValidatorConfig::default();
        let subject = Subject::new(source, &tree, &config);
        SecurityHints
            .detect(&subject)
            .unwrap()
            .iter()
            .map(Finding::text)
            .collect()
    }

    #[test]
    fn hardcoded_password() {
        assert_eq!(
            check("PASSWORD = 'hunter2'\n"),
            ["Avoid hardcoding passwords - use environment variables or config files"]
        );
        assert!(check("password = os.environ['PW']\n").is_empty());
    }

    #[test]
    fn sql_formatting() {
        let source = "sql = \"SELECT * FROM users WHERE id = %s\" % uid\n";
        assert_eq!(check(source), ["Use parameterized queries to prevent SQL injection"]);
    }

    #[test]
    fn path_traversal() {
        assert_eq!(
            check("path = base + '../secrets'\n"),
            ["Validate file paths to prevent directory traversal attacks"]
        );
    }
}
