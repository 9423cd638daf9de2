//! Desugaring configuration.

use std::path::Path;

use dscript_ast::ProbeDesc;
use serde::{Deserialize, Serialize};

use crate::error::{Result, XdError};

/// File extension that turns experimental features on for a script.
pub const SCRIPT_EXTENSION: &str = "xd";

/// Probe that fires when an action faults at trace time.
pub const DEFAULT_ERROR_PROBE: &str = "dtrace:::ERROR";

/// Options controlling the experimental-clause pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct XdConfig {
    /// Desugar `if`/`while`/`entry->`/`callers[]`.
    ///
    /// When off, programs pass through unchanged and structured statements
    /// are rejected.
    pub experimental: bool,

    /// Log every generated sub-clause in source form at `debug` level.
    pub dump_subclauses: bool,

    /// Probe the global error-handler clause fires on.
    pub error_probe: String,
}

impl Default for XdConfig {
    fn default() -> Self {
        Self {
            experimental: false,
            dump_subclauses: false,
            error_probe: DEFAULT_ERROR_PROBE.to_string(),
        }
    }
}

impl XdConfig {
    /// Default configuration with experimental features enabled.
    pub fn experimental() -> Self {
        Self {
            experimental: true,
            ..Self::default()
        }
    }

    /// Enable experimental features if `path` names a `.xd` script.
    ///
    /// Never turns the option off once set.
    pub fn with_script(mut self, path: &Path) -> Self {
        if path
            .extension()
            .map_or(false, |ext| ext == SCRIPT_EXTENSION)
        {
            self.experimental = true;
        }
        self
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<()> {
        self.error_probe_desc().map(|_| ())
    }

    /// Parsed form of [`XdConfig::error_probe`].
    pub fn error_probe_desc(&self) -> Result<ProbeDesc> {
        if self.error_probe.trim().is_empty() {
            return Err(XdError::InvalidConfig(
                "error_probe must not be empty".to_string(),
            ));
        }
        ProbeDesc::parse(&self.error_probe).map_err(|e| {
            XdError::InvalidConfig(format!("error_probe '{}': {}", self.error_probe, e))
        })
    }
}
