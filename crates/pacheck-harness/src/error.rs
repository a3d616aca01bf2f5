//! Harness errors.

use std::path::PathBuf;

use pacheck_verify::VerifyError;
use thiserror::Error;

use crate::provider::ProviderError;

#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("{origin}:{line}: {message}")]
    ModelList {
        origin: String,
        line: usize,
        message: String,
    },

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Verify(#[from] VerifyError),
}

impl HarnessError {
    /// Whether the failure may go away when the case is rerun.
    pub fn is_transient(&self) -> bool {
        match self {
            HarnessError::Provider(e) => e.is_transient(),
            HarnessError::Verify(e) => e.is_retryable(),
            HarnessError::ModelList { .. } | HarnessError::Io { .. } => false,
        }
    }
}
