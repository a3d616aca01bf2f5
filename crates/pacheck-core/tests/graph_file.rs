//! Integration tests for graph files on disk.

use pacheck_core::graph::node::types;
use pacheck_core::{Dimension, Graph, GraphBuilder, Shape};

fn small_decoder() -> Graph {
    let mut b = GraphBuilder::new();
    let ids = b.add_parameter("input_ids", Shape::dynamic(2));
    let past = b.add_node(types::READ_VALUE, "past_key_values.0.key");
    let sdpa = b.add_node(types::SCALED_DOT_PRODUCT_ATTENTION, "sdpa.0");
    let assign = b.add_node(types::ASSIGN, "assign.0");
    b.connect(ids, 0, sdpa, 0).unwrap();
    b.connect(past, 0, sdpa, 1).unwrap();
    b.connect(past, 0, assign, 0).unwrap();
    b.add_result("logits", sdpa, 0).unwrap();
    b.build().unwrap()
}

#[test]
fn graph_survives_a_file_round_trip() {
    let graph = small_decoder();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("decoder.json");
    std::fs::write(&path, serde_json::to_vec_pretty(&graph).unwrap()).unwrap();

    let bytes = std::fs::read(&path).unwrap();
    let loaded: Graph = serde_json::from_slice(&bytes).unwrap();

    assert_eq!(loaded.node_count(), graph.node_count());
    assert_eq!(loaded.edge_count(), graph.edge_count());
    assert_eq!(loaded.inputs(), graph.inputs());
    assert_eq!(loaded.outputs(), graph.outputs());
    assert_eq!(
        loaded.topological_sort().unwrap(),
        graph.topological_sort().unwrap()
    );
}

#[test]
fn hand_written_graph_parses() {
    let json = r#"{
        "nodes": [
            { "id": "00000000-0000-0000-0000-000000000001", "type": "Parameter", "name": "key_cache.0" },
            { "id": "00000000-0000-0000-0000-000000000002", "type": "PagedAttentionExtension" }
        ],
        "edges": [
            {
                "id": "00000000-0000-0000-0000-0000000000e1",
                "source": ["00000000-0000-0000-0000-000000000001", 0],
                "target": ["00000000-0000-0000-0000-000000000002", 3]
            }
        ],
        "inputs": [
            { "names": ["key_cache.0"], "shape": [null, 4, 16, 64],
              "node": "00000000-0000-0000-0000-000000000001" }
        ]
    }"#;
    let graph: Graph = serde_json::from_str(json).unwrap();
    assert_eq!(graph.node_count(), 2);
    assert_eq!(graph.count_of_type(types::PAGED_ATTENTION_EXTENSION), 1);
    let port = &graph.inputs()[0];
    assert_eq!(port.shape.get(0), Some(Dimension::Dynamic));
    assert_eq!(port.shape.get(3), Some(Dimension::Static(64)));
    assert!(graph.outputs().is_empty());
    assert!(graph.validate().is_ok());
}
