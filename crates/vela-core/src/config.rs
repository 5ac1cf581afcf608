//! Checker options.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid checker options: {0}")]
    Parse(#[from] ron::error::SpannedError),
}

/// Knobs of the checking pass, written in RON:
///
/// ```ron
/// (strict: true, legacy_positional_named: false)
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckerOptions {
    /// Bind surplus positional arguments to named parameters in declaration
    /// order.
    pub legacy_positional_named: bool,
    /// Give untyped locals the (inferred) type of their initializer.
    pub infer_local_types: bool,
    /// Report every type diagnostic as an error.
    pub strict: bool,
    /// Report missing members on receivers whose type was only inferred.
    pub report_inferred_member_misses: bool,
}

impl Default for CheckerOptions {
    fn default() -> Self {
        CheckerOptions {
            legacy_positional_named: true,
            infer_local_types: true,
            strict: false,
            report_inferred_member_misses: false,
        }
    }
}

impl CheckerOptions {
    pub fn from_ron(text: &str) -> Result<Self, ConfigError> {
        Ok(ron::from_str(text)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_ron(&text)
    }

    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }
}
