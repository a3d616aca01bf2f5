//! Verification failures.

use pacheck_core::{GraphError, PortDirection};
use pacheck_transform::TransformError;
use thiserror::Error;

use crate::delta::DeltaMismatch;
use crate::reference::OptimizationMode;

/// Terminal outcome of a failed verification run.
#[derive(Debug, Error)]
pub enum VerifyError {
    #[error("no {mode} reference entry for model '{model}'")]
    UnknownModelKind { model: String, mode: OptimizationMode },

    #[error("transformation failed: {0}")]
    TransformationFailed(TransformError),

    #[error("compile check failed: {0}")]
    CompilationFailed(TransformError),

    #[error("population delta for '{model}' differs from the reference: {}", join(.mismatches))]
    StructuralMismatch {
        model: String,
        mismatches: Vec<DeltaMismatch>,
    },

    #[error("cache input '{port}' has shape {shape}; {}", describe_dimension(.dimension))]
    DynamicShapeViolation {
        port: String,
        /// Offending dimension index, `None` when the shape has fewer than two
        /// dimensions.
        dimension: Option<usize>,
        shape: String,
    },

    #[error(
        "The number of {key} {direction}s doesn't correspond to the expected value. \
         Expected {expected}, received {observed}"
    )]
    PatternCardinalityViolation {
        key: String,
        direction: PortDirection,
        expected: i64,
        observed: usize,
    },

    #[error("graph error: {0}")]
    Graph(#[from] GraphError),
}

impl VerifyError {
    /// Whether rerunning from a fresh graph could change the outcome. Every
    /// verification failure is deterministic.
    pub fn is_retryable(&self) -> bool {
        false
    }

    /// Short machine-readable kind.
    pub fn kind(&self) -> &'static str {
        match self {
            VerifyError::UnknownModelKind { .. } => "unknown_model_kind",
            VerifyError::TransformationFailed(_) => "transformation_failed",
            VerifyError::CompilationFailed(_) => "compilation_failed",
            VerifyError::StructuralMismatch { .. } => "structural_mismatch",
            VerifyError::DynamicShapeViolation { .. } => "dynamic_shape_violation",
            VerifyError::PatternCardinalityViolation { .. } => "pattern_cardinality_violation",
            VerifyError::Graph(_) => "graph",
        }
    }
}

fn join(mismatches: &[DeltaMismatch]) -> String {
    mismatches
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

fn describe_dimension(dimension: &Option<usize>) -> String {
    match dimension {
        Some(i) => format!("dimension {i} is dynamic"),
        None => "expected at least two static trailing dimensions".to_string(),
    }
}
