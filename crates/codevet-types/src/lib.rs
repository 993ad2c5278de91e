// Allow unwrap in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]

//! codevet-types: pure data types shared between the validation kernel
//! and its callers.
//!
//! Nothing in here parses or analyses code. These are the records that
//! cross the boundary: the verdict of a validation pass, the positional
//! context attached to a diagnostic, and the strictness tiers.

mod context;
mod level;
mod result;

pub use context::DiagnosticContext;
pub use level::{CheckKind, ParseLevelError, ValidationLevel};
pub use result::ValidationResult;
