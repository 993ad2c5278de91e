//! Validator configuration.
//!
//! A `ValidatorConfig` is fixed for the lifetime of a [`Validator`]; to
//! change strictness or tunables, build a new validator.
//!
//! [`Validator`]: crate::validator::Validator

use std::str::FromStr;

use codevet_types::{DiagnosticContext, ValidationLevel};
use serde::{Deserialize, Serialize};

use crate::cache::DEFAULT_CAPACITY;

/// Indent widths the indentation check accepts.
pub const ALLOWED_INDENT_SIZES: [usize; 3] = [2, 4, 8];

/// Bounds for `max_line_length`, inclusive.
pub const LINE_LENGTH_RANGE: (usize, usize) = (50, 120);

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("indent_size must be one of 2, 4 or 8 (got {0})")]
    IndentSize(usize),

    #[error("max_line_length must be between 50 and 120 (got {0})")]
    MaxLineLength(usize),

    #[error("cache_capacity must be at least 1")]
    CacheCapacity,

    #[error("invalid configuration JSON: {0}")]
    Json(String),
}

/// Everything a [`Validator`](crate::validator::Validator) needs to know.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidatorConfig {
    /// Which optional checks run.
    pub validation_level: ValidationLevel,
    /// Report duplicate and wildcard imports.
    pub check_imports: bool,
    /// Report names read before anything binds them.
    pub check_undefined_vars: bool,
    /// Skip the unsafe-operation scan entirely.
    pub allow_unsafe_operations: bool,
    /// Expected width of one indentation level.
    pub indent_size: usize,
    /// Lines longer than this draw a warning.
    pub max_line_length: usize,
    /// Entries per cache (parse cache and result cache each).
    pub cache_capacity: usize,
    /// Lines shown around an error in its diagnostic context.
    pub context_lines: usize,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            validation_level: ValidationLevel::Strict,
            check_imports: true,
            check_undefined_vars: true,
            allow_unsafe_operations: false,
            indent_size: 4,
            max_line_length: 88,
            cache_capacity: DEFAULT_CAPACITY,
            context_lines: DiagnosticContext::DEFAULT_WINDOW,
        }
    }
}

impl ValidatorConfig {
    /// Parse a (possibly partial) JSON object; missing fields take defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| ConfigError::Json(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check every tunable is within range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !ALLOWED_INDENT_SIZES.contains(&self.indent_size) {
            return Err(ConfigError::IndentSize(self.indent_size));
        }
        let (min, max) = LINE_LENGTH_RANGE;
        if !(min..=max).contains(&self.max_line_length) {
            return Err(ConfigError::MaxLineLength(self.max_line_length));
        }
        if self.cache_capacity == 0 {
            return Err(ConfigError::CacheCapacity);
        }
        Ok(())
    }

    /// Apply `CODEVET_*` environment variables on top of this config.
    ///
    /// Values that fail to parse are logged and ignored.
    pub fn apply_env_overrides(self) -> Self {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    fn apply_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(level) = env_value(&lookup, "CODEVET_VALIDATION_LEVEL") {
            self.validation_level = level;
        }
        if let Some(flag) = env_flag(&lookup, "CODEVET_VALIDATE_IMPORTS") {
            self.check_imports = flag;
        }
        if let Some(flag) = env_flag(&lookup, "CODEVET_CHECK_UNDEFINED_VARS") {
            self.check_undefined_vars = flag;
        }
        if let Some(flag) = env_flag(&lookup, "CODEVET_ALLOW_UNSAFE_OPERATIONS") {
            self.allow_unsafe_operations = flag;
        }
        if let Some(size) = env_value(&lookup, "CODEVET_INDENT_SIZE") {
            self.indent_size = size;
        }
        if let Some(len) = env_value(&lookup, "CODEVET_MAX_LINE_LENGTH") {
            self.max_line_length = len;
        }
        self
    }

    pub fn with_level(mut self, level: ValidationLevel) -> Self {
        self.validation_level = level;
        self
    }

    pub fn with_check_imports(mut self, check: bool) -> Self {
        self.check_imports = check;
        self
    }

    pub fn with_check_undefined_vars(mut self, check: bool) -> Self {
        self.check_undefined_vars = check;
        self
    }

    pub fn with_allow_unsafe(mut self, allow: bool) -> Self {
        self.allow_unsafe_operations = allow;
        self
    }

    pub fn with_indent_size(mut self, size: usize) -> Self {
        self.indent_size = size;
        self
    }

    pub fn with_max_line_length(mut self, len: usize) -> Self {
        self.max_line_length = len;
        self
    }

    pub fn with_cache_capacity(mut self, capacity: usize) -> Self {
        self.cache_capacity = capacity;
        self
    }

    pub fn with_context_lines(mut self, lines: usize) -> Self {
        self.context_lines = lines;
        self
    }
}

fn env_value<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(key, value = %raw, "ignoring unparsable override");
            None
        }
    }
}

fn env_flag(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<bool> {
    let raw = lookup(key)?;
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => {
            tracing::warn!(key, value = %raw, "ignoring unparsable override");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn overrides(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults() {
        let config = ValidatorConfig::default();
        assert_eq!(config.validation_level, ValidationLevel::Strict);
        assert!(config.check_imports);
        assert!(config.check_undefined_vars);
        assert!(!config.allow_unsafe_operations);
        assert_eq!(config.indent_size, 4);
        assert_eq!(config.max_line_length, 88);
        assert_eq!(config.cache_capacity, 100);
        assert_eq!(config.context_lines, 2);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_rejects_out_of_range() {
        let bad_indent = ValidatorConfig::default().with_indent_size(3);
        assert_eq!(bad_indent.validate(), Err(ConfigError::IndentSize(3)));

        let too_long = ValidatorConfig::default().with_max_line_length(200);
        assert_eq!(too_long.validate(), Err(ConfigError::MaxLineLength(200)));

        let too_short = ValidatorConfig::default().with_max_line_length(10);
        assert!(too_short.validate().is_err());

        let no_cache = ValidatorConfig::default().with_cache_capacity(0);
        assert_eq!(no_cache.validate(), Err(ConfigError::CacheCapacity));
    }

    #[test]
    fn from_json_fills_defaults() {
        let config =
            ValidatorConfig::from_json(r#"{"validation_level": "lenient", "indent_size": 2}"#)
                .unwrap();
        assert_eq!(config.validation_level, ValidationLevel::Lenient);
        assert_eq!(config.indent_size, 2);
        assert_eq!(config.max_line_length, 88);
    }

    #[test]
    fn from_json_validates() {
        assert!(matches!(
            ValidatorConfig::from_json(r#"{"indent_size": 5}"#),
            Err(ConfigError::IndentSize(5))
        ));
        assert!(matches!(
            ValidatorConfig::from_json("not json"),
            Err(ConfigError::Json(_))
        ));
    }

    #[test]
    fn env_overrides_apply() {
        let config = ValidatorConfig::default().apply_overrides(overrides(&[
            ("CODEVET_VALIDATION_LEVEL", "normal"),
            ("CODEVET_ALLOW_UNSAFE_OPERATIONS", "yes"),
            ("CODEVET_INDENT_SIZE", "2"),
            ("CODEVET_VALIDATE_IMPORTS", "0"),
        ]));
        assert_eq!(config.validation_level, ValidationLevel::Normal);
        assert!(config.allow_unsafe_operations);
        assert_eq!(config.indent_size, 2);
        assert!(!config.check_imports);
    }

    #[test]
    fn unparsable_overrides_are_ignored() {
        let config = ValidatorConfig::default().apply_overrides(overrides(&[
            ("CODEVET_VALIDATION_LEVEL", "paranoid"),
            ("CODEVET_MAX_LINE_LENGTH", "wide"),
            ("CODEVET_CHECK_UNDEFINED_VARS", "maybe"),
        ]));
        assert_eq!(config, ValidatorConfig::default());
    }
}
