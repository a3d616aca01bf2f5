//! Sources of fresh graphs for a case.

use std::fmt;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use pacheck_core::Graph;
use pacheck_transform::DecoderSpec;
use thiserror::Error;
use tracing::debug;

use crate::case::ModelCase;

/// Errors obtaining a graph.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("no graph for '{model}' at {path}")]
    NotFound { model: String, path: PathBuf },

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid graph in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("cannot build graph for '{model}': {message}")]
    Build { model: String, message: String },
}

impl ProviderError {
    /// Failures that may not recur on another attempt.
    pub fn is_transient(&self) -> bool {
        match self {
            ProviderError::Io { source, .. } => matches!(
                source.kind(),
                ErrorKind::Interrupted
                    | ErrorKind::TimedOut
                    | ErrorKind::ConnectionReset
                    | ErrorKind::ConnectionAborted
                    | ErrorKind::WouldBlock
                    | ErrorKind::UnexpectedEof
            ),
            ProviderError::NotFound { .. }
            | ProviderError::Parse { .. }
            | ProviderError::Build { .. } => false,
        }
    }
}

/// Produces an untransformed graph for a case. Every call returns a new
/// graph; retries depend on it.
pub trait GraphProvider: fmt::Debug + Send + Sync {
    fn provide(&self, case: &ModelCase) -> Result<Graph, ProviderError>;
}

/// Reads serialized graphs from `<root>/<text|vlm>/<model>.json`, with `/`
/// in the model name replaced by `__`.
#[derive(Debug, Clone)]
pub struct FileGraphProvider {
    root: PathBuf,
}

impl FileGraphProvider {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, case: &ModelCase) -> PathBuf {
        let stem = case.model_id().replace('/', "__");
        self.root
            .join(case.kind.dir_name())
            .join(format!("{stem}.json"))
    }
}

impl GraphProvider for FileGraphProvider {
    fn provide(&self, case: &ModelCase) -> Result<Graph, ProviderError> {
        load_graph(&self.path_for(case), case.model_id())
    }
}

/// Read the serialized graph of `model` from `path`.
pub fn load_graph(path: &Path, model: &str) -> Result<Graph, ProviderError> {
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(ProviderError::NotFound {
                model: model.to_string(),
                path: path.to_path_buf(),
            })
        }
        Err(source) => {
            return Err(ProviderError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    let graph: Graph = serde_json::from_str(&text).map_err(|source| ProviderError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(path = %path.display(), nodes = graph.node_count(), "loaded graph");
    Ok(graph)
}

/// Builds the same synthetic stateful decoder for every case.
#[derive(Debug, Clone)]
pub struct SyntheticGraphProvider {
    spec: DecoderSpec,
}

impl SyntheticGraphProvider {
    pub fn new(spec: DecoderSpec) -> Self {
        Self { spec }
    }
}

impl GraphProvider for SyntheticGraphProvider {
    fn provide(&self, case: &ModelCase) -> Result<Graph, ProviderError> {
        self.spec.build().map_err(|e| ProviderError::Build {
            model: case.model_id().to_string(),
            message: e.to_string(),
        })
    }
}
