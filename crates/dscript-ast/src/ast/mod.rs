//! AST node definitions.
//!
//! - [`expr`] - expressions and operators
//! - [`clause`] - statements, probe clauses and programs
//! - [`walk`] - read-only traversal helpers
//! - `display` - source-form printing (`Display` impls)

pub mod clause;
mod display;
pub mod expr;
pub mod walk;

pub use clause::{Clause, Program, Stmt};
pub use expr::{BinaryOp, Expr, ExprKind, UnaryOp};
