// Allow unwrap in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]

//! # Experimental Clause Desugaring
//!
//! Compiles super-clauses that use the experimental constructs into the flat
//! clauses the execution engine runs natively:
//!
//! - `if (c) { ... } else { ... }` - guarded basic blocks over `this->` conditions
//! - `while<N> (c) { ... }` - the loop test and body unrolled `N` times
//! - `entry-><field>`, `entry->args[N]` in return clauses - values captured
//!   at the matching entry probe
//! - `callers["f,g"]` - per-thread count of the named functions on the stack
//!
//! ## Pipeline Position
//!
//! ```text
//! Parse → Desugar experimental clauses → Identifier resolution → Codegen
//!         ^^^^^^^^^^^^^^^^^^^^^^^^^^^^
//! ```
//!
//! ## Architecture
//!
//! ```text
//! rewrite    - replaces entry->/callers[] forms, records required state
//!     ↓
//! control    - splits the body at if/while into guarded sub-clauses
//!     ↓
//! correlate  - capture/priming/release and callers increment/decrement clauses
//!     ↓
//! session    - ID sequences, error handler, final clause order
//! ```
//!
//! ## Usage
//!
//! ```
//! use dscript_ast::{Clause, Expr, ProbeDesc, Span, Stmt};
//! use dscript_xd::{Session, XdConfig};
//!
//! let span = Span::default();
//! let clause = Clause::new(
//!     vec![ProbeDesc::parse("BEGIN").unwrap()],
//!     None,
//!     vec![Stmt::If {
//!         cond: Expr::ident("ready", span),
//!         then_body: vec![Stmt::expr(Expr::call("exit", vec![Expr::int(0, span)], span))],
//!         else_body: vec![],
//!         span,
//!     }],
//!     span,
//! );
//!
//! let mut session = Session::new(XdConfig::experimental()).unwrap();
//! let sub_clauses = session.expand(clause).unwrap();
//! // error handler, clear error, condition, guarded body
//! assert_eq!(sub_clauses.len(), 4);
//! ```

pub mod builders;
pub mod config;
pub mod control;
pub mod correlate;
pub mod error;
pub mod rewrite;
pub mod session;
pub mod slots;

pub use config::{XdConfig, DEFAULT_ERROR_PROBE, SCRIPT_EXTENSION};
pub use error::{Result, XdError};
pub use rewrite::{CallersCounter, CaptureRequirement, Requirements, Rewriter};
pub use session::Session;
pub use slots::{CaptureGroupId, CondId, CounterId, EntryVar, IdAllocator, Slot};
