//! Errors raised while desugaring experimental clauses.
//!
//! # Error Categories
//!
//! - **Internal errors**: [`XdError::UnknownNode`], a node kind the pass
//!   cannot handle reached the traversal (a compiler defect, not a user error)
//! - **Probe errors**: [`XdError::InvalidProbe`]
//! - **Usage errors**: [`XdError::ExperimentalDisabled`]
//! - **Configuration errors**: [`XdError::InvalidConfig`]
//!
//! Any error aborts compilation of the enclosing program. Malformed uses of
//! `entry->args[...]` or `callers[...]` are not errors here; they are left
//! unrewritten for identifier resolution to diagnose.

use dscript_ast::{ProbeDescError, Span};
use thiserror::Error;

/// Result type alias for the desugaring pass.
pub type Result<T> = std::result::Result<T, XdError>;

/// Errors that abort desugaring of a program.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum XdError {
    /// The traversal reached a node kind it has no rule for.
    #[error("internal compiler error: unexpected {kind} node at {span}")]
    UnknownNode {
        /// Short description of the node kind
        kind: &'static str,
        /// Location of the node
        span: Span,
    },

    /// A probe description synthesized by the pass does not parse.
    ///
    /// Raised for `callers["..."]` tokens and for the configured error probe.
    #[error("invalid probe description '{text}' at {span}: {source}")]
    InvalidProbe {
        /// Text handed to the probe parser
        text: String,
        /// Location of the construct that produced it
        span: Span,
        /// Parser failure
        source: ProbeDescError,
    },

    /// `if`/`while` used while experimental features are disabled.
    #[error("if and while statements require experimental features to be enabled (at {span})")]
    ExperimentalDisabled {
        /// Location of the first offending statement
        span: Span,
    },

    /// Configuration failed validation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl XdError {
    /// Whether this error indicates a defect in the compiler itself.
    pub fn is_internal(&self) -> bool {
        matches!(self, XdError::UnknownNode { .. })
    }
}
