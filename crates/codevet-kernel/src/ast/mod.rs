//! Abstract Syntax Tree types for candidate Python code.
//!
//! This module provides:
//! - AST type definitions (`types` module, re-exported at this level)
//! - A read-only visitor with default traversal (`walk` module)

mod types;
pub mod walk;

pub use types::*;
