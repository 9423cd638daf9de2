//! Foundation types shared by the AST and the compiler passes.

pub mod probe;
pub mod span;

pub use probe::{ProbeDesc, ProbeDescError, ENTRY, RETURN};
pub use span::Span;
