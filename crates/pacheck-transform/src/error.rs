//! Transformation and compilation errors.

use pacheck_core::GraphError;
use thiserror::Error;

use crate::transform::Device;

/// Errors raised by the external graph operations.
#[derive(Debug, Error)]
pub enum TransformError {
    #[error("{pass} rejected the graph: {message}")]
    TransformationFailed { pass: String, message: String },

    #[error("compilation for {device} failed: {message}")]
    CompilationFailed { device: Device, message: String },

    #[error("unsupported device '{name}'. Choose: CPU, GPU, NPU")]
    UnsupportedDevice { name: String },

    #[error("graph error: {0}")]
    Graph(#[from] GraphError),
}
