//! Strictness tiers and check kinds.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// How much the validator should complain.
///
/// - `Strict` runs every optional check, including unused-binding detection.
/// - `Normal` runs the common-issue scan but skips unused bindings.
/// - `Lenient` skips the common-issue scan too.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ValidationLevel {
    #[default]
    Strict,
    Normal,
    Lenient,
}

impl ValidationLevel {
    /// True for the levels that run the text-pattern common-issue scan.
    pub fn scans_common_issues(self) -> bool {
        matches!(self, ValidationLevel::Strict | ValidationLevel::Normal)
    }

    /// True only for `Strict`.
    pub fn is_strict(self) -> bool {
        self == ValidationLevel::Strict
    }
}

impl fmt::Display for ValidationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationLevel::Strict => write!(f, "strict"),
            ValidationLevel::Normal => write!(f, "normal"),
            ValidationLevel::Lenient => write!(f, "lenient"),
        }
    }
}

/// Error returned when a string does not name a validation level.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown validation level '{0}' (expected strict, normal or lenient)")]
pub struct ParseLevelError(pub String);

impl FromStr for ValidationLevel {
    type Err = ParseLevelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "strict" => Ok(ValidationLevel::Strict),
            "normal" => Ok(ValidationLevel::Normal),
            "lenient" => Ok(ValidationLevel::Lenient),
            _ => Err(ParseLevelError(s.to_string())),
        }
    }
}

/// Which pass produced a cached result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckKind {
    Syntax,
    Logic,
}

impl fmt::Display for CheckKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckKind::Syntax => write!(f, "syntax"),
            CheckKind::Logic => write!(f, "logic"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_levels_case_insensitive() {
        assert_eq!("STRICT".parse::<ValidationLevel>(), Ok(ValidationLevel::Strict));
        assert_eq!(" normal ".parse::<ValidationLevel>(), Ok(ValidationLevel::Normal));
        assert_eq!("lenient".parse::<ValidationLevel>(), Ok(ValidationLevel::Lenient));
        assert!("paranoid".parse::<ValidationLevel>().is_err());
    }

    #[test]
    fn level_gates() {
        assert!(ValidationLevel::Strict.scans_common_issues());
        assert!(ValidationLevel::Normal.scans_common_issues());
        assert!(!ValidationLevel::Lenient.scans_common_issues());
        assert!(ValidationLevel::Strict.is_strict());
        assert!(!ValidationLevel::Normal.is_strict());
    }

    #[test]
    fn serde_uses_lowercase_names() {
        let json = serde_json::to_string(&ValidationLevel::Lenient).unwrap();
        assert_eq!(json, "\"lenient\"");
        let back: CheckKind = serde_json::from_str("\"logic\"").unwrap();
        assert_eq!(back, CheckKind::Logic);
    }
}
