//! Static trailing dimensions on key/value cache inputs.

use pacheck_core::{Graph, Port};
use tracing::debug;

use crate::error::VerifyError;

/// Substrings marking a model input as a key or value cache.
pub const CACHE_NAME_MARKERS: [&str; 2] = ["key_cache.", "value_cache."];

/// The first of the port's names that marks it as a cache input.
pub fn cache_name(port: &Port) -> Option<&str> {
    port.names
        .iter()
        .map(String::as_str)
        .find(|name| CACHE_NAME_MARKERS.iter().any(|m| name.contains(m)))
}

/// Require the last two dimensions of every cache input to be static.
/// Returns the names of the checked ports.
pub fn check_cache_ports(graph: &Graph) -> Result<Vec<String>, VerifyError> {
    let mut checked = Vec::new();
    for port in graph.inputs() {
        if let Some(name) = cache_name(port) {
            check_port(port, name)?;
            checked.push(name.to_string());
        }
    }
    debug!(ports = checked.len(), "cache input shapes are static");
    Ok(checked)
}

fn check_port(port: &Port, name: &str) -> Result<(), VerifyError> {
    let shape = &port.shape;
    let violation = |dimension| VerifyError::DynamicShapeViolation {
        port: name.to_string(),
        dimension,
        shape: shape.to_string(),
    };
    let rank = shape.rank();
    if rank < 2 {
        return Err(violation(None));
    }
    for index in [rank - 1, rank - 2] {
        if !shape.get(index).is_some_and(|d| d.is_static()) {
            return Err(violation(Some(index)));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pacheck_core::Dimension::{Dynamic, Static};
    use pacheck_core::Shape;

    fn graph_with(port: Port) -> Graph {
        let mut g = Graph::new();
        g.add_input(port);
        g
    }

    #[test]
    fn static_trailing_dimensions_pass() {
        let mut g = graph_with(Port::new(
            "key_cache.0",
            Shape::new(vec![Dynamic, Dynamic, Static(16), Static(64)]),
        ));
        g.add_input(Port::new("input_ids", Shape::dynamic(2)));
        let checked = check_cache_ports(&g).unwrap();
        assert_eq!(checked, ["key_cache.0"]);
    }

    #[test]
    fn last_dimension_checked_first() {
        let g = graph_with(Port::new("value_cache.3", Shape::dynamic(4)));
        match check_cache_ports(&g).unwrap_err() {
            VerifyError::DynamicShapeViolation { port, dimension, .. } => {
                assert_eq!(port, "value_cache.3");
                assert_eq!(dimension, Some(3));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn second_to_last_dimension_checked() {
        let g = graph_with(Port::new(
            "key_cache.1",
            Shape::new(vec![Dynamic, Static(4), Dynamic, Static(64)]),
        ));
        assert!(matches!(
            check_cache_ports(&g),
            Err(VerifyError::DynamicShapeViolation { dimension: Some(2), .. })
        ));
    }

    #[test]
    fn low_rank_cache_is_a_violation() {
        let g = graph_with(Port::new("key_cache.0", Shape::fixed(&[16])));
        assert!(matches!(
            check_cache_ports(&g),
            Err(VerifyError::DynamicShapeViolation { dimension: None, .. })
        ));
    }

    #[test]
    fn alias_marks_cache_port() {
        let port = Port::with_names(["past.0", "model.key_cache.0"], Shape::dynamic(4));
        assert_eq!(cache_name(&Port::new("key_cache", Shape::dynamic(4))), None);
        assert_eq!(cache_name(&port), Some("model.key_cache.0"));
        match check_cache_ports(&graph_with(port)).unwrap_err() {
            VerifyError::DynamicShapeViolation { port, .. } => {
                assert_eq!(port, "model.key_cache.0");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
