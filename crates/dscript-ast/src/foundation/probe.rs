//! Probe descriptions.
//!
//! A probe description names a set of tracing points by the four-tuple
//! `provider:module:function:name`. Any component may be empty, which matches
//! every value for that component. Textual descriptions with fewer than four
//! components are filled from the right, so `spa_sync:entry` means function
//! `spa_sync`, probe name `entry`, any module of any provider.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Probe name of the function-entry variant of a paired probe.
pub const ENTRY: &str = "entry";

/// Probe name of the function-return variant of a paired probe.
pub const RETURN: &str = "return";

/// Errors from parsing a textual probe description.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProbeDescError {
    /// More than four `:`-separated components.
    #[error("probe description '{text}' has {count} components, at most 4 are allowed")]
    TooManyComponents {
        /// The offending description
        text: String,
        /// Number of components found
        count: usize,
    },
}

/// A `provider:module:function:name` probe description.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProbeDesc {
    pub provider: String,
    pub module: String,
    pub function: String,
    pub name: String,
}

impl ProbeDesc {
    pub fn new(
        provider: impl Into<String>,
        module: impl Into<String>,
        function: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            provider: provider.into(),
            module: module.into(),
            function: function.into(),
            name: name.into(),
        }
    }

    /// Parse a textual probe description, filling components from the right.
    ///
    /// # Examples
    ///
    /// ```
    /// use dscript_ast::ProbeDesc;
    ///
    /// let desc = ProbeDesc::parse("fbt:zfs:spa_sync:entry").unwrap();
    /// assert_eq!(desc.module, "zfs");
    ///
    /// let short = ProbeDesc::parse("spa_sync:return").unwrap();
    /// assert_eq!(short.function, "spa_sync");
    /// assert_eq!(short.provider, "");
    /// assert!(short.is_return());
    /// ```
    pub fn parse(text: &str) -> Result<Self, ProbeDescError> {
        let parts: Vec<&str> = text.split(':').collect();
        if parts.len() > 4 {
            return Err(ProbeDescError::TooManyComponents {
                text: text.to_string(),
                count: parts.len(),
            });
        }

        let mut fields = [""; 4];
        let offset = 4 - parts.len();
        for (i, part) in parts.into_iter().enumerate() {
            fields[offset + i] = part;
        }

        Ok(Self::new(fields[0], fields[1], fields[2], fields[3]))
    }

    /// Whether this is the return variant of a paired entry/return probe.
    pub fn is_return(&self) -> bool {
        self.name == RETURN
    }

    /// Whether this is the entry variant of a paired entry/return probe.
    pub fn is_entry(&self) -> bool {
        self.name == ENTRY
    }

    /// The same provider/module/function with a different probe name.
    pub fn with_name(&self, name: impl Into<String>) -> Self {
        Self {
            provider: self.provider.clone(),
            module: self.module.clone(),
            function: self.function.clone(),
            name: name.into(),
        }
    }
}

impl fmt::Display for ProbeDesc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}:{}",
            self.provider, self.module, self.function, self.name
        )
    }
}
