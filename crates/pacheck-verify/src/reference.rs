//! Reference population deltas per model and optimization mode.
//!
//! Tables are usually loaded from TOML:
//!
//! ```toml
//! [baseline."katuni4ka/tiny-random-llama"]
//! ScaledDotProductAttention = -2
//! PagedAttentionExtension = 2
//!
//! [optimizations."katuni4ka/tiny-random-llama"]
//! ScaledDotProductAttention = -2
//! PagedAttentionExtension = 2
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use pacheck_core::FeatureFlags;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::delta::Delta;

/// Which reference table applies to a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptimizationMode {
    Baseline,
    /// Block indices, score outputs and cache rotation all enabled.
    Optimizations,
}

impl OptimizationMode {
    pub fn from_flags(flags: &FeatureFlags) -> Self {
        if flags.use_cache_eviction() {
            OptimizationMode::Optimizations
        } else {
            OptimizationMode::Baseline
        }
    }
}

impl fmt::Display for OptimizationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptimizationMode::Baseline => write!(f, "baseline"),
            OptimizationMode::Optimizations => write!(f, "optimizations"),
        }
    }
}

/// Supplies expected deltas.
pub trait ReferenceSource: fmt::Debug + Send + Sync {
    fn expected(&self, model: &str, mode: OptimizationMode) -> Option<&Delta>;
}

/// Errors loading reference tables.
#[derive(Debug, Error)]
pub enum ReferenceError {
    #[error("failed to read reference tables {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid reference tables {origin}: {source}")]
    Parse {
        origin: String,
        #[source]
        source: toml::de::Error,
    },
}

/// The baseline and optimizations tables.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReferenceTables {
    #[serde(default)]
    baseline: BTreeMap<String, Delta>,
    #[serde(default)]
    optimizations: BTreeMap<String, Delta>,
}

impl ReferenceTables {
    pub fn from_toml_str(text: &str) -> Result<Self, ReferenceError> {
        toml::from_str(text).map_err(|source| ReferenceError::Parse {
            origin: "<inline>".to_string(),
            source,
        })
    }

    pub fn load(path: &Path) -> Result<Self, ReferenceError> {
        let text = std::fs::read_to_string(path).map_err(|source| ReferenceError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&text).map_err(|source| ReferenceError::Parse {
            origin: path.display().to_string(),
            source,
        })
    }

    pub fn insert(&mut self, mode: OptimizationMode, model: impl Into<String>, delta: Delta) {
        self.table_mut(mode).insert(model.into(), delta);
    }

    pub fn table(&self, mode: OptimizationMode) -> &BTreeMap<String, Delta> {
        match mode {
            OptimizationMode::Baseline => &self.baseline,
            OptimizationMode::Optimizations => &self.optimizations,
        }
    }

    fn table_mut(&mut self, mode: OptimizationMode) -> &mut BTreeMap<String, Delta> {
        match mode {
            OptimizationMode::Baseline => &mut self.baseline,
            OptimizationMode::Optimizations => &mut self.optimizations,
        }
    }

    /// Models with an entry in `mode`.
    pub fn models(&self, mode: OptimizationMode) -> impl Iterator<Item = &str> {
        self.table(mode).keys().map(String::as_str)
    }
}

impl ReferenceSource for ReferenceTables {
    fn expected(&self, model: &str, mode: OptimizationMode) -> Option<&Delta> {
        self.table(mode).get(model)
    }
}
