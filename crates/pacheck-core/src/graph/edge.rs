//! Edge types representing data dependencies between nodes.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::node::NodeId;

/// Globally unique edge identifier.
pub type EdgeId = Uuid;

/// A port reference: (node ID, port index).
pub type PortRef = (NodeId, usize);

/// A data dependency from a source node's output port to a target node's
/// input port.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    /// Unique edge identifier.
    pub id: EdgeId,
    /// Output port of the producing node.
    pub source: PortRef,
    /// Input port of the consuming node.
    pub target: PortRef,
}

impl Edge {
    /// Create a new edge with a random UUID.
    pub fn new(source: PortRef, target: PortRef) -> Self {
        Self {
            id: Uuid::new_v4(),
            source,
            target,
        }
    }
}
