// Allow unwrap in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]

//! AST types for the tracing language.
//!
//! This crate contains the node model consumed and produced by the compiler
//! passes: probe descriptions, clauses, statements and expressions, plus
//! source spans and traversal helpers.

pub mod ast;
pub mod foundation;

// Re-export commonly used types
pub use ast::*;
pub use foundation::{ProbeDesc, ProbeDescError, Span, ENTRY, RETURN};
