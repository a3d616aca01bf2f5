//! Core graph data structures: nodes, edges, model ports, and the graph
//! container.
//!
//! An inference graph is a directed acyclic graph of typed operations. Its
//! boundary is described by two ordered port lists: the model inputs and the
//! model outputs.

pub mod edge;
pub mod node;
pub mod port;
pub mod shape;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use self::edge::{Edge, EdgeId};
use self::node::{Node, NodeId};
use self::port::{Port, PortDirection};

/// Errors that can occur during graph construction or validation.
#[derive(Debug, Error)]
pub enum GraphError {
    #[error("node not found: {0}")]
    NodeNotFound(NodeId),

    #[error("dangling edge: source node {src} or target node {dst} not in graph")]
    DanglingEdge { src: NodeId, dst: NodeId },

    #[error("duplicate node id: {0}")]
    DuplicateNode(NodeId),

    #[error("duplicate edge id: {0}")]
    DuplicateEdge(EdgeId),

    #[error("cycle detected involving node {0}")]
    CycleDetected(NodeId),

    #[error("{direction} port '{port}' is bound to missing node {node}")]
    DanglingPort {
        direction: PortDirection,
        port: String,
        node: NodeId,
    },
}

/// The graph container for one inference model.
///
/// Stores nodes and edges with lookup by ID, plus the ordered model inputs
/// and outputs. Provides topological ordering and validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "GraphRepr", into = "GraphRepr")]
pub struct Graph {
    nodes: HashMap<NodeId, Node>,
    edges: HashMap<EdgeId, Edge>,
    inputs: Vec<Port>,
    outputs: Vec<Port>,

    /// Index: node -> outgoing edges (edges where this node is the source)
    outgoing: HashMap<NodeId, Vec<EdgeId>>,
    /// Index: node -> incoming edges (edges where this node is the target)
    incoming: HashMap<NodeId, Vec<EdgeId>>,
}

/// On-disk form of a graph: flat lists, indexes rebuilt on load.
#[derive(Serialize, Deserialize)]
struct GraphRepr {
    #[serde(default)]
    nodes: Vec<Node>,
    #[serde(default)]
    edges: Vec<Edge>,
    #[serde(default)]
    inputs: Vec<Port>,
    #[serde(default)]
    outputs: Vec<Port>,
}

impl TryFrom<GraphRepr> for Graph {
    type Error = GraphError;

    fn try_from(repr: GraphRepr) -> Result<Self, Self::Error> {
        let mut graph = Graph::new();
        for node in repr.nodes {
            graph.add_node(node)?;
        }
        for edge in repr.edges {
            graph.add_edge(edge)?;
        }
        graph.inputs = repr.inputs;
        graph.outputs = repr.outputs;
        Ok(graph)
    }
}

impl From<Graph> for GraphRepr {
    fn from(graph: Graph) -> Self {
        let mut nodes: Vec<Node> = graph.nodes.into_values().collect();
        nodes.sort_by_key(|n| n.id);
        let mut edges: Vec<Edge> = graph.edges.into_values().collect();
        edges.sort_by_key(|e| e.id);
        Self {
            nodes,
            edges,
            inputs: graph.inputs,
            outputs: graph.outputs,
        }
    }
}

impl Graph {
    /// Create a new empty graph.
    pub fn new() -> Self {
        Self {
            nodes: HashMap::new(),
            edges: HashMap::new(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            outgoing: HashMap::new(),
            incoming: HashMap::new(),
        }
    }

    /// Insert a node into the graph.
    pub fn add_node(&mut self, node: Node) -> Result<NodeId, GraphError> {
        let id = node.id;
        if self.nodes.contains_key(&id) {
            return Err(GraphError::DuplicateNode(id));
        }
        self.outgoing.entry(id).or_default();
        self.incoming.entry(id).or_default();
        self.nodes.insert(id, node);
        Ok(id)
    }

    /// Insert an edge into the graph. Both source and target nodes must exist.
    pub fn add_edge(&mut self, edge: Edge) -> Result<EdgeId, GraphError> {
        let id = edge.id;
        if self.edges.contains_key(&id) {
            return Err(GraphError::DuplicateEdge(id));
        }
        let source_node = edge.source.0;
        let target_node = edge.target.0;
        if !self.nodes.contains_key(&source_node) || !self.nodes.contains_key(&target_node) {
            return Err(GraphError::DanglingEdge {
                src: source_node,
                dst: target_node,
            });
        }
        self.outgoing.entry(source_node).or_default().push(id);
        self.incoming.entry(target_node).or_default().push(id);
        self.edges.insert(id, edge);
        Ok(id)
    }

    /// Connect `source` output port to `target` input port with a fresh edge.
    pub fn connect(
        &mut self,
        source: NodeId,
        source_port: usize,
        target: NodeId,
        target_port: usize,
    ) -> Result<EdgeId, GraphError> {
        self.add_edge(Edge::new((source, source_port), (target, target_port)))
    }

    /// Append a model input port.
    pub fn add_input(&mut self, port: Port) {
        self.inputs.push(port);
    }

    /// Append a model output port.
    pub fn add_output(&mut self, port: Port) {
        self.outputs.push(port);
    }

    /// Model inputs, in order.
    pub fn inputs(&self) -> &[Port] {
        &self.inputs
    }

    /// Model outputs, in order.
    pub fn outputs(&self) -> &[Port] {
        &self.outputs
    }

    /// Ports of the given direction.
    pub fn ports(&self, direction: PortDirection) -> &[Port] {
        match direction {
            PortDirection::Input => &self.inputs,
            PortDirection::Output => &self.outputs,
        }
    }

    /// Look up a node by ID.
    pub fn get_node(&self, id: &NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    /// Look up a node by ID (mutable).
    pub fn get_node_mut(&mut self, id: &NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id)
    }

    /// Get all outgoing edges from a node.
    pub fn outgoing_edges(&self, node_id: &NodeId) -> &[EdgeId] {
        self.outgoing
            .get(node_id)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// Get all incoming edges to a node.
    pub fn incoming_edges(&self, node_id: &NodeId) -> &[EdgeId] {
        self.incoming
            .get(node_id)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// Producers feeding a node, as `(target_port, source_node, source_port)`
    /// sorted by target port.
    pub fn producers(&self, node_id: &NodeId) -> Vec<(usize, NodeId, usize)> {
        let mut producers: Vec<_> = self
            .incoming_edges(node_id)
            .iter()
            .filter_map(|eid| self.edges.get(eid))
            .map(|e| (e.target.1, e.source.0, e.source.1))
            .collect();
        producers.sort();
        producers
    }

    /// Consumers of a node's outputs, as `(source_port, target_node, target_port)`.
    pub fn consumers(&self, node_id: &NodeId) -> Vec<(usize, NodeId, usize)> {
        let mut consumers: Vec<_> = self
            .outgoing_edges(node_id)
            .iter()
            .filter_map(|eid| self.edges.get(eid))
            .map(|e| (e.source.1, e.target.0, e.target.1))
            .collect();
        consumers.sort();
        consumers
    }

    /// Remove a node, all its connected edges, and any model port bound to it.
    pub fn remove_node(&mut self, id: NodeId) -> Result<Node, GraphError> {
        if !self.nodes.contains_key(&id) {
            return Err(GraphError::NodeNotFound(id));
        }

        let out_edges: Vec<EdgeId> = self.outgoing.get(&id).cloned().unwrap_or_default();
        let in_edges: Vec<EdgeId> = self.incoming.get(&id).cloned().unwrap_or_default();

        for eid in out_edges {
            if let Some(edge) = self.edges.remove(&eid) {
                if let Some(list) = self.incoming.get_mut(&edge.target.0) {
                    list.retain(|&e| e != eid);
                }
            }
        }
        for eid in in_edges {
            if let Some(edge) = self.edges.remove(&eid) {
                if let Some(list) = self.outgoing.get_mut(&edge.source.0) {
                    list.retain(|&e| e != eid);
                }
            }
        }

        self.outgoing.remove(&id);
        self.incoming.remove(&id);
        self.inputs.retain(|p| p.node != Some(id));
        self.outputs.retain(|p| p.node != Some(id));

        self.nodes.remove(&id).ok_or(GraphError::NodeNotFound(id))
    }

    /// Return the total number of nodes.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Return the total number of edges.
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Iterate over all nodes (unordered).
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// Compute a topological ordering of the nodes.
    ///
    /// Returns node IDs such that for every edge (u, v), u appears before v.
    /// Ties are broken by node ID so the order is stable for a given graph.
    pub fn topological_sort(&self) -> Result<Vec<NodeId>, GraphError> {
        let mut in_degree: HashMap<NodeId, usize> = HashMap::new();
        for id in self.nodes.keys() {
            in_degree.insert(*id, 0);
        }
        for edge in self.edges.values() {
            *in_degree.entry(edge.target.0).or_default() += 1;
        }

        let mut queue: Vec<NodeId> = in_degree
            .iter()
            .filter(|(_, &deg)| deg == 0)
            .map(|(id, _)| *id)
            .collect();
        queue.sort_by(|a, b| b.cmp(a));

        let mut result = Vec::with_capacity(self.nodes.len());
        while let Some(node_id) = queue.pop() {
            result.push(node_id);
            for edge_id in self.outgoing_edges(&node_id) {
                if let Some(edge) = self.edges.get(edge_id) {
                    let target = edge.target.0;
                    if let Some(deg) = in_degree.get_mut(&target) {
                        if *deg > 0 {
                            *deg -= 1;
                            if *deg == 0 {
                                queue.push(target);
                            }
                        }
                    }
                }
            }
            queue.sort_by(|a, b| b.cmp(a));
        }

        if result.len() != self.nodes.len() {
            let mut stuck: Vec<NodeId> = in_degree
                .iter()
                .filter(|(_, &deg)| deg > 0)
                .map(|(id, _)| *id)
                .collect();
            stuck.sort();
            if let Some(&cycle_node) = stuck.first() {
                return Err(GraphError::CycleDetected(cycle_node));
            }
        }

        Ok(result)
    }

    /// Nodes in stable topological order.
    pub fn ordered_nodes(&self) -> Result<Vec<&Node>, GraphError> {
        Ok(self
            .topological_sort()?
            .iter()
            .filter_map(|id| self.nodes.get(id))
            .collect())
    }

    /// Count nodes of the given operation type.
    pub fn count_of_type(&self, node_type: &str) -> usize {
        self.nodes
            .values()
            .filter(|n| n.node_type.is(node_type))
            .count()
    }

    /// Validate structural well-formedness.
    ///
    /// Checks:
    /// - No dangling edges (source and target nodes exist)
    /// - Ports bound to a node refer to a node in the graph
    /// - The graph is acyclic
    pub fn validate(&self) -> Result<(), Vec<GraphError>> {
        let mut errors = Vec::new();

        for edge in self.edges.values() {
            if !self.nodes.contains_key(&edge.source.0) || !self.nodes.contains_key(&edge.target.0)
            {
                errors.push(GraphError::DanglingEdge {
                    src: edge.source.0,
                    dst: edge.target.0,
                });
            }
        }

        for direction in [PortDirection::Input, PortDirection::Output] {
            for port in self.ports(direction) {
                if let Some(node) = port.node {
                    if !self.nodes.contains_key(&node) {
                        errors.push(GraphError::DanglingPort {
                            direction,
                            port: port.display_name().to_string(),
                            node,
                        });
                    }
                }
            }
        }

        if let Err(e) = self.topological_sort() {
            errors.push(e);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

impl Default for Graph {
    fn default() -> Self {
        Self::new()
    }
}
