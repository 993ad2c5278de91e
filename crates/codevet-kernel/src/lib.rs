// Allow unwrap in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]

//! codevet-kernel: layered static validation for candidate Python code.
//!
//! This crate provides:
//!
//! - **Lexer**: Tokenizes Python source using logos, with a layout pass
//!   for indentation and logical lines
//! - **Parser**: Builds the AST from tokens using chumsky
//! - **AST**: A closed set of node types and a read-only visitor
//! - **Tree builder**: Parse-or-failure, memoized by content hash
//! - **Caches**: Bounded, lock-guarded, insertion-order eviction
//! - **Validator**: Syntax, logic and suggestion passes built from
//!   independent detectors
//!
//! Nothing here executes or compiles the code under inspection.

pub mod ast;
pub mod cache;
pub mod config;
pub mod diagnostic;
pub mod lexer;
pub mod parser;
pub mod span;
pub mod tree;
pub mod validator;

pub use cache::{CacheStats, DEFAULT_CAPACITY};
pub use config::{ConfigError, ValidatorConfig};
pub use diagnostic::Diagnostic;
pub use tree::{SyntaxFailure, TreeBuilder};
pub use validator::{Validator, ValidatorCacheStats};

pub use codevet_types::{CheckKind, DiagnosticContext, ValidationLevel, ValidationResult};
