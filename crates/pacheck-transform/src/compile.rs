//! Structural compile check.
//!
//! Stands in for a device compiler: it accepts a graph only when the graph
//! is something a plugin could lower, and discards everything else it
//! learns.

use pacheck_core::graph::node::types;
use pacheck_core::{Graph, PortDirection};
use tracing::debug;

use crate::error::TransformError;
use crate::transform::{CompileCheck, Device};

/// Inputs a paged-attention node cannot run without (query, key, value).
const PAGED_ATTENTION_MIN_INPUTS: usize = 3;

/// Compile check that validates graph structure for a set of devices.
#[derive(Debug, Clone)]
pub struct StructuralCompiler {
    devices: Vec<Device>,
}

impl Default for StructuralCompiler {
    fn default() -> Self {
        Self {
            devices: vec![Device::Cpu, Device::Gpu, Device::Npu],
        }
    }
}

impl StructuralCompiler {
    /// A compiler accepting only the given devices.
    pub fn for_devices(devices: impl IntoIterator<Item = Device>) -> Self {
        Self {
            devices: devices.into_iter().collect(),
        }
    }

    pub fn supports(&self, device: Device) -> bool {
        self.devices.contains(&device)
    }
}

impl CompileCheck for StructuralCompiler {
    fn compile(&self, graph: &Graph, device: Device) -> Result<(), TransformError> {
        let fail = |message: String| TransformError::CompilationFailed { device, message };

        if !self.supports(device) {
            return Err(fail("device is not enabled for this compiler".to_string()));
        }

        if let Err(errors) = graph.validate() {
            let joined = errors
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("; ");
            return Err(fail(format!("invalid graph: {joined}")));
        }

        for (position, port) in graph.inputs().iter().enumerate() {
            if port.names.is_empty() {
                return Err(fail(format!("model input #{position} has no name")));
            }
        }

        for (direction, expected) in [
            (PortDirection::Input, types::PARAMETER),
            (PortDirection::Output, types::RESULT),
        ] {
            for port in graph.ports(direction) {
                let Some(id) = port.node else { continue };
                let node_type = graph.get_node(&id).map(|n| n.node_type.as_str());
                if node_type != Some(expected) {
                    return Err(fail(format!(
                        "{direction} port '{}' is bound to a {} node, expected {expected}",
                        port.display_name(),
                        node_type.unwrap_or("missing"),
                    )));
                }
            }
        }

        for node in graph
            .nodes()
            .filter(|n| n.node_type.is(types::PAGED_ATTENTION_EXTENSION))
        {
            let inputs = graph.incoming_edges(&node.id).len();
            if inputs < PAGED_ATTENTION_MIN_INPUTS {
                return Err(fail(format!(
                    "'{}' has {inputs} inputs, needs at least {PAGED_ATTENTION_MIN_INPUTS}",
                    node.name
                )));
            }
        }

        debug!(%device, nodes = graph.node_count(), "structural compile passed");
        Ok(())
    }
}
