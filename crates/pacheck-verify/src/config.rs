//! Verification run configuration.

use std::collections::BTreeSet;

use pacheck_core::graph::node::types;
use pacheck_transform::Device;
use serde::{Deserialize, Serialize};

/// Settings for a [`crate::TransformationVerifier`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct VerifyConfig {
    /// Node types counted by the population snapshots.
    pub node_types: BTreeSet<String>,
    /// Node type whose delta gives the number of transformed sites.
    pub extension_node_type: String,
    /// Device handed to the compile check.
    pub device: Device,
}

impl Default for VerifyConfig {
    fn default() -> Self {
        Self {
            node_types: [
                types::SCALED_DOT_PRODUCT_ATTENTION,
                types::PAGED_ATTENTION_EXTENSION,
                types::PARAMETER,
                types::READ_VALUE,
                types::ASSIGN,
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            extension_node_type: types::PAGED_ATTENTION_EXTENSION.to_string(),
            device: Device::Cpu,
        }
    }
}

impl VerifyConfig {
    pub fn with_device(mut self, device: Device) -> Self {
        self.device = device;
        self
    }
}
