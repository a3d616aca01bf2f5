//! Model input and output ports.
//!
//! A port is one of the model's boundary tensors. It carries a set of names
//! (aliases) and a partially known shape, and optionally refers to the
//! `Parameter` or `Result` node that backs it.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::node::NodeId;
use super::shape::Shape;

/// Direction of a model port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PortDirection {
    /// Data flows into the model.
    Input,
    /// Data flows out of the model.
    Output,
}

impl fmt::Display for PortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PortDirection::Input => write!(f, "input"),
            PortDirection::Output => write!(f, "output"),
        }
    }
}

/// A named, shaped model port.
///
/// Names form a set: order is irrelevant and a port may have zero, one, or
/// several aliases. Names are not guaranteed unique across ports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Port {
    /// All names this port is known by.
    #[serde(default)]
    pub names: BTreeSet<String>,
    /// Partially known tensor shape.
    #[serde(default)]
    pub shape: Shape,
    /// Backing `Parameter`/`Result` node, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node: Option<NodeId>,
}

impl Port {
    /// Create a port with a single name.
    pub fn new(name: impl Into<String>, shape: Shape) -> Self {
        Self {
            names: BTreeSet::from([name.into()]),
            shape,
            node: None,
        }
    }

    /// Create a port with any number of names.
    pub fn with_names<I, S>(names: I, shape: Shape) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
            shape,
            node: None,
        }
    }

    /// Attach the backing node.
    pub fn bound_to(mut self, node: NodeId) -> Self {
        self.node = Some(node);
        self
    }

    /// Add an alias.
    pub fn add_name(&mut self, name: impl Into<String>) {
        self.names.insert(name.into());
    }

    /// The lexicographically first name, used in diagnostics.
    pub fn display_name(&self) -> &str {
        self.names.iter().next().map(String::as_str).unwrap_or("<unnamed>")
    }

    pub fn has_name(&self, name: &str) -> bool {
        self.names.contains(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_name_port() {
        let port = Port::new("key_cache.0", Shape::dynamic(4));
        assert_eq!(port.names.len(), 1);
        assert!(port.has_name("key_cache.0"));
        assert_eq!(port.display_name(), "key_cache.0");
        assert!(port.node.is_none());
    }

    #[test]
    fn aliases_are_a_set() {
        let mut port = Port::with_names(["b", "a", "b"], Shape::scalar());
        assert_eq!(port.names.len(), 2);
        port.add_name("a");
        assert_eq!(port.names.len(), 2);
        assert_eq!(port.display_name(), "a");
    }

    #[test]
    fn unnamed_port_display() {
        let port = Port::with_names(Vec::<String>::new(), Shape::scalar());
        assert_eq!(port.display_name(), "<unnamed>");
    }

    #[test]
    fn direction_display() {
        assert_eq!(PortDirection::Input.to_string(), "input");
        assert_eq!(PortDirection::Output.to_string(), "output");
    }
}
