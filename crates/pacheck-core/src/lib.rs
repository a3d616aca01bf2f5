//! Core data structures for paged-attention transformation checks.
//!
//! An inference model is represented as a [`graph::Graph`]: typed nodes
//! connected by edges, plus the model's named input and output ports.
//! [`flags::FeatureFlags`] describes which optional paged-attention features a
//! transformation is asked to expose.

pub mod builder;
pub mod flags;
pub mod graph;

pub use builder::GraphBuilder;
pub use flags::{Feature, FeatureFlags};
pub use graph::edge::{Edge, EdgeId, PortRef};
pub use graph::node::{Node, NodeId, NodeType};
pub use graph::port::{Port, PortDirection};
pub use graph::shape::{Dimension, Shape};
pub use graph::{Graph, GraphError};
