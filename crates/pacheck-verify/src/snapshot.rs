//! Node population snapshots.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use pacheck_core::{Graph, GraphError};
use serde::{Deserialize, Serialize};

/// Number of nodes per node type. Types with no nodes are absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeTypeCount(BTreeMap<String, u64>);

impl NodeTypeCount {
    /// Count for `node_type`, zero when absent.
    pub fn get(&self, node_type: &str) -> u64 {
        self.0.get(node_type).copied().unwrap_or(0)
    }

    pub fn contains(&self, node_type: &str) -> bool {
        self.0.contains_key(node_type)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn types(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Total number of counted nodes.
    pub fn total(&self) -> u64 {
        self.0.values().sum()
    }

    fn bump(&mut self, node_type: &str) {
        *self.0.entry(node_type.to_string()).or_default() += 1;
    }
}

impl<S: Into<String>> FromIterator<(S, u64)> for NodeTypeCount {
    fn from_iter<I: IntoIterator<Item = (S, u64)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

impl fmt::Display for NodeTypeCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.iter().map(|(t, n)| format!("{t}={n}")).collect();
        write!(f, "{{{}}}", parts.join(", "))
    }
}

/// Count the nodes of `graph` whose type is in `interesting`, walking the
/// graph in topological order.
pub fn snapshot(
    graph: &Graph,
    interesting: &BTreeSet<String>,
) -> Result<NodeTypeCount, GraphError> {
    let mut counts = NodeTypeCount::default();
    for node in graph.ordered_nodes()? {
        if interesting.contains(node.node_type.as_str()) {
            counts.bump(node.node_type.as_str());
        }
    }
    Ok(counts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pacheck_core::graph::node::types;
    use pacheck_core::{GraphBuilder, Shape};

    fn interesting() -> BTreeSet<String> {
        [types::PARAMETER, types::READ_VALUE]
            .into_iter()
            .map(String::from)
            .collect()
    }

    #[test]
    fn counts_only_interesting_types() {
        let mut b = GraphBuilder::new();
        let a = b.add_parameter("a", Shape::scalar());
        b.add_parameter("b", Shape::scalar());
        let rv = b.add_node(types::READ_VALUE, "state");
        let mm = b.add_node(types::MATMUL, "mm");
        b.connect(a, 0, mm, 0).unwrap();
        b.connect(rv, 0, mm, 1).unwrap();
        let g = b.build().unwrap();

        let counts = snapshot(&g, &interesting()).unwrap();
        assert_eq!(counts.get(types::PARAMETER), 2);
        assert_eq!(counts.get(types::READ_VALUE), 1);
        assert_eq!(counts.get(types::MATMUL), 0);
        assert!(!counts.contains(types::MATMUL));
        assert_eq!(counts.total(), 3);
    }

    #[test]
    fn absent_types_are_not_keys() {
        let counts = snapshot(&Graph::new(), &interesting()).unwrap();
        assert!(counts.is_empty());
        assert_eq!(counts.to_string(), "{}");
    }

    #[test]
    fn cycle_is_reported() {
        let mut b = GraphBuilder::new();
        let x = b.add_node(types::PARAMETER, "x");
        let y = b.add_node(types::PARAMETER, "y");
        b.connect(x, 0, y, 0).unwrap();
        b.connect(y, 0, x, 0).unwrap();
        let g = b.into_graph();
        assert!(matches!(
            snapshot(&g, &interesting()),
            Err(GraphError::CycleDetected(_))
        ));
    }
}
