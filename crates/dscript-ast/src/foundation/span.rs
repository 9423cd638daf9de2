//! Source locations.
//!
//! Spans are carried by every expression, statement and clause so that
//! nodes synthesized by later passes can point back at the source
//! construct they were derived from. Synthesized nodes reuse the span of
//! that construct; there is no "no location" value.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Byte range in one source file, with the line it starts on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    /// Index of the source file within the compilation
    pub file_id: u16,
    pub start: u32,
    /// Exclusive
    pub end: u32,
    /// 1-based; 0 for spans built without a source (tests, defaults)
    pub start_line: u16,
}

impl Span {
    pub fn new(file_id: u16, start: u32, end: u32, start_line: u16) -> Self {
        Self {
            file_id,
            start,
            end,
            start_line,
        }
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "file {} line {} [{}..{})",
            self.file_id, self.start_line, self.start, self.end
        )
    }
}
