//! JSON payload fixtures.
//!
//! Fixtures are JSON files under a payload directory. A scenario loads one,
//! applies `path -> value` modifications from its data table, and publishes
//! the result.

mod modify;

use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, error};

pub use modify::{apply_modifications, coerce_value, set_path};

#[derive(Debug, thiserror::Error)]
pub enum FixtureError {
    #[error("Error loading JSON payload {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("JSON payload {path} is not valid JSON: {source}")]
    InvalidJson {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Document is not valid JSON: {0}")]
    InvalidDocument(#[from] serde_json::Error),
    #[error("Invalid JSON path: {path} ({reason})")]
    InvalidPath { path: String, reason: String },
    #[error("Path not found: {0}")]
    PathNotFound(String),
}

/// Resolves and reads fixtures relative to a payload directory.
#[derive(Debug, Clone)]
pub struct FixtureLoader {
    payload_dir: PathBuf,
}

impl FixtureLoader {
    pub fn new(payload_dir: impl Into<PathBuf>) -> Self {
        Self {
            payload_dir: payload_dir.into(),
        }
    }

    pub fn payload_dir(&self) -> &Path {
        &self.payload_dir
    }

    /// Absolute names are used as given; everything else lives under the
    /// payload directory.
    pub fn resolve(&self, name: &str) -> PathBuf {
        let candidate = Path::new(name);
        if candidate.is_absolute() {
            candidate.to_path_buf()
        } else {
            self.payload_dir.join(candidate)
        }
    }

    /// Read a fixture and check that it parses as JSON. Returns the raw text.
    pub fn load(&self, name: &str) -> Result<String, FixtureError> {
        let path = self.resolve(name);
        let content = fs::read_to_string(&path).map_err(|source| {
            error!("Error loading JSON file {}: {}", path.display(), source);
            FixtureError::Io {
                path: path.clone(),
                source,
            }
        })?;

        if let Err(source) = serde_json::from_str::<Value>(&content) {
            error!("Error loading JSON file {}: {}", path.display(), source);
            return Err(FixtureError::InvalidJson { path, source });
        }

        debug!("Loaded JSON template {}", path.display());
        Ok(content)
    }

    /// Load a fixture and apply `path -> value` modifications in order.
    pub fn render<I, P, V>(&self, name: &str, modifications: I) -> Result<String, FixtureError>
    where
        I: IntoIterator<Item = (P, V)>,
        P: AsRef<str>,
        V: AsRef<str>,
    {
        let template = self.load(name)?;
        apply_modifications(&template, modifications)
    }
}
