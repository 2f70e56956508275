//! Which failures are worth diagnosing at all.
//!
//! The keyword list is configuration, not part of the parsing/evaluation
//! core: it can be loaded from YAML and replaced wholesale.

use std::fmt::Display;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::host::FailureClassifier;

const DEFAULT_SENTINELS: [&str; 9] = [
    "matmul",
    "THTensorMath",
    "tensor",
    "tensors",
    "dimension",
    "not aligned",
    "size mismatch",
    "shape",
    "shapes",
];

#[derive(Debug, Error)]
pub enum PolicyError {
    #[error("Reading policy file {}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Parsing policy: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Substring allowlist over failure messages.
///
/// ```yaml
/// sentinels:
///   - shape
///   - size mismatch
/// ```
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Policy {
    #[serde(default = "default_sentinels")]
    pub sentinels: Vec<String>,
}

fn default_sentinels() -> Vec<String> {
    DEFAULT_SENTINELS.iter().map(|s| s.to_string()).collect()
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            sentinels: default_sentinels(),
        }
    }
}

impl Policy {
    pub fn from_yaml(raw: &str) -> Result<Self, PolicyError> {
        Ok(serde_yaml::from_str(raw)?)
    }

    pub fn load(path: &Path) -> Result<Self, PolicyError> {
        let raw = fs::read_to_string(path).map_err(|source| PolicyError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&raw)
    }

    pub fn is_interesting(&self, message: &str) -> bool {
        self.sentinels
            .iter()
            .any(|sentinel| message.contains(sentinel.as_str()))
    }
}

/// Message-based classification for hosts whose failures are untyped.
impl<E: Display + ?Sized> FailureClassifier<E> for Policy {
    fn is_shape_failure(&self, error: &E) -> bool {
        self.is_interesting(&error.to_string())
    }
}
