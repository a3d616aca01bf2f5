//! Transform and compile-check traits.

use std::fmt;
use std::str::FromStr;

use pacheck_core::{FeatureFlags, Graph};
use serde::{Deserialize, Serialize};

use crate::error::TransformError;

/// Statistics from applying a graph transform pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransformStats {
    /// Number of rewritten sites.
    pub sites: usize,
    pub nodes_added: usize,
    pub nodes_removed: usize,
    pub edges_added: usize,
    pub edges_removed: usize,
}

/// A whole-graph transformation pass that mutates the graph in place.
///
/// Object-safe so passes can be stored in `Box<dyn GraphTransform>`.
pub trait GraphTransform: fmt::Debug + Send + Sync {
    /// Human-readable name of this transform.
    fn name(&self) -> &str;

    /// Apply the transform, returning statistics.
    fn apply(
        &self,
        graph: &mut Graph,
        flags: &FeatureFlags,
    ) -> Result<TransformStats, TransformError>;
}

/// Compilation used purely as a well-formedness oracle; the compiled artifact
/// is discarded.
pub trait CompileCheck: fmt::Debug + Send + Sync {
    fn compile(&self, graph: &Graph, device: Device) -> Result<(), TransformError>;
}

/// A compilation target device.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Device {
    #[default]
    Cpu,
    Gpu,
    Npu,
}

impl FromStr for Device {
    type Err = TransformError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "CPU" => Ok(Device::Cpu),
            "GPU" => Ok(Device::Gpu),
            "NPU" => Ok(Device::Npu),
            _ => Err(TransformError::UnsupportedDevice { name: s.to_string() }),
        }
    }
}

impl TryFrom<String> for Device {
    type Error = TransformError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Device> for String {
    fn from(device: Device) -> Self {
        device.to_string()
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Device::Cpu => write!(f, "CPU"),
            Device::Gpu => write!(f, "GPU"),
            Device::Npu => write!(f, "NPU"),
        }
    }
}

/// A no-op transform for testing.
#[derive(Debug)]
pub struct IdentityTransform;

impl GraphTransform for IdentityTransform {
    fn name(&self) -> &str {
        "identity"
    }

    fn apply(
        &self,
        _graph: &mut Graph,
        _flags: &FeatureFlags,
    ) -> Result<TransformStats, TransformError> {
        Ok(TransformStats::default())
    }
}
