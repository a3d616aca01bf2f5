//! Node types and the Node struct.
//!
//! A node represents one operation in an inference graph. Only its type tag
//! matters to population checks; the name and attributes are carried for
//! transformations and diagnostics.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Globally unique node identifier.
pub type NodeId = Uuid;

/// Well-known operation type names.
pub mod types {
    pub const PARAMETER: &str = "Parameter";
    pub const RESULT: &str = "Result";
    pub const CONSTANT: &str = "Constant";
    pub const MATMUL: &str = "MatMul";
    pub const CONCAT: &str = "Concat";
    pub const READ_VALUE: &str = "ReadValue";
    pub const ASSIGN: &str = "Assign";
    pub const SCALED_DOT_PRODUCT_ATTENTION: &str = "ScaledDotProductAttention";
    pub const PAGED_ATTENTION_EXTENSION: &str = "PagedAttentionExtension";
}

/// The operation type of a node, e.g. `ScaledDotProductAttention`.
///
/// The vocabulary is open: graphs read from disk may carry any operation
/// name, so the type is a string tag rather than a closed enum.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeType(String);

impl NodeType {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is(&self, name: &str) -> bool {
        self.0 == name
    }
}

impl From<&str> for NodeType {
    fn from(name: &str) -> Self {
        Self(name.to_string())
    }
}

impl From<String> for NodeType {
    fn from(name: String) -> Self {
        Self(name)
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A node in the inference graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    /// Globally unique identifier.
    pub id: NodeId,
    /// Operation type.
    #[serde(rename = "type")]
    pub node_type: NodeType,
    /// Friendly name, not required to be unique.
    #[serde(default)]
    pub name: String,
    /// Free-form operation attributes (head counts, sizes, ...).
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, String>,
}

impl Node {
    /// Create a new node with a random UUID.
    pub fn new(node_type: impl Into<NodeType>) -> Self {
        Self {
            id: Uuid::new_v4(),
            node_type: node_type.into(),
            name: String::new(),
            attributes: BTreeMap::new(),
        }
    }

    /// Set the friendly name.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Attach an attribute.
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.attributes.insert(key.into(), value.to_string());
        self
    }

    /// Parse a numeric attribute, if present and well-formed.
    pub fn attribute_u64(&self, key: &str) -> Option<u64> {
        self.attributes.get(key).and_then(|v| v.parse().ok())
    }
}
