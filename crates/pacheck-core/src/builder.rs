//! Graph construction API for building inference graphs programmatically.
//!
//! # Example
//!
//! ```rust
//! use pacheck_core::builder::GraphBuilder;
//! use pacheck_core::graph::node::types;
//! use pacheck_core::graph::shape::Shape;
//!
//! let mut builder = GraphBuilder::new();
//! let ids = builder.add_parameter("input_ids", Shape::dynamic(2));
//! let embed = builder.add_node(types::MATMUL, "embed");
//! builder.connect(ids, 0, embed, 0).unwrap();
//! builder.add_result("logits", embed, 0).unwrap();
//!
//! let graph = builder.build().unwrap();
//! assert_eq!(graph.node_count(), 3);
//! assert_eq!(graph.inputs().len(), 1);
//! ```

use std::collections::HashMap;

use crate::graph::node::{types, Node, NodeId, NodeType};
use crate::graph::port::Port;
use crate::graph::shape::Shape;
use crate::graph::{Graph, GraphError};

/// A builder for constructing inference graphs.
///
/// Provides convenience methods for model parameters and results, tracks
/// nodes by friendly name, and validates the graph on [`GraphBuilder::build`].
pub struct GraphBuilder {
    graph: Graph,
    /// Named nodes for easier reference during construction.
    names: HashMap<String, NodeId>,
}

impl GraphBuilder {
    /// Create a new empty graph builder.
    pub fn new() -> Self {
        Self {
            graph: Graph::new(),
            names: HashMap::new(),
        }
    }

    /// Add a fully formed node. Its id must be fresh.
    pub fn insert(&mut self, node: Node) -> Result<NodeId, GraphError> {
        let name = node.name.clone();
        let id = self.graph.add_node(node)?;
        if !name.is_empty() {
            self.names.insert(name, id);
        }
        Ok(id)
    }

    /// Add a node with the given type and optional name.
    pub fn add_node(&mut self, node_type: impl Into<NodeType>, name: &str) -> NodeId {
        let node = Node::new(node_type).named(name);
        let id = node.id;
        // Fresh v4 ids do not collide, so the duplicate check cannot fire.
        let _ = self.insert(node);
        id
    }

    /// Add a `Parameter` node and the model input port bound to it.
    pub fn add_parameter(&mut self, name: &str, shape: Shape) -> NodeId {
        let id = self.add_node(types::PARAMETER, name);
        self.graph.add_input(Port::new(name, shape).bound_to(id));
        id
    }

    /// Add a `Result` node fed by `producer`, and the model output port
    /// bound to it.
    pub fn add_result(
        &mut self,
        name: &str,
        producer: NodeId,
        producer_port: usize,
    ) -> Result<NodeId, GraphError> {
        if self.graph.get_node(&producer).is_none() {
            return Err(GraphError::NodeNotFound(producer));
        }
        let id = self.add_node(types::RESULT, name);
        self.graph.connect(producer, producer_port, id, 0)?;
        self.graph
            .add_output(Port::new(name, Shape::default()).bound_to(id));
        Ok(id)
    }

    /// Connect an output port of one node to an input port of another.
    pub fn connect(
        &mut self,
        from_node: NodeId,
        from_port: usize,
        to_node: NodeId,
        to_port: usize,
    ) -> Result<(), GraphError> {
        self.graph.connect(from_node, from_port, to_node, to_port)?;
        Ok(())
    }

    /// Look up a node by the name given at construction.
    pub fn lookup(&self, name: &str) -> Option<NodeId> {
        self.names.get(name).copied()
    }

    /// Access the graph under construction.
    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    /// Return the graph without validating it.
    pub fn into_graph(self) -> Graph {
        self.graph
    }

    /// Validate and return the graph.
    pub fn build(self) -> Result<Graph, Vec<GraphError>> {
        self.graph.validate()?;
        Ok(self.graph)
    }
}

impl Default for GraphBuilder {
    fn default() -> Self {
        Self::new()
    }
}
