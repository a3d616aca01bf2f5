//! Synthetic stateful decoder graphs.
//!
//! Each layer keeps its key/value history in `ReadValue`/`Assign` state
//! around a `ScaledDotProductAttention` node, which is the shape of graph the
//! paged-attention rewrite expects.

use pacheck_core::graph::node::types;
use pacheck_core::{Graph, GraphBuilder, GraphError, Node, Shape};
use serde::{Deserialize, Serialize};

/// Attribute carrying the number of key/value heads of an attention node.
pub const ATTR_NUM_KV_HEADS: &str = "num_kv_heads";
/// Attribute carrying the per-head size of an attention node.
pub const ATTR_HEAD_SIZE: &str = "head_size";

/// Parameters of a synthetic decoder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecoderSpec {
    /// Number of attention layers (transformed sites).
    pub layers: usize,
    /// Key/value head count; `None` leaves the attribute off the nodes.
    pub num_kv_heads: Option<u64>,
    /// Head size; `None` leaves the attribute off the nodes.
    pub head_size: Option<u64>,
}

impl DecoderSpec {
    pub fn new(layers: usize) -> Self {
        Self {
            layers,
            num_kv_heads: Some(4),
            head_size: Some(64),
        }
    }

    /// Drop the head metadata, so rewritten cache inputs cannot be given a
    /// static shape.
    pub fn without_head_metadata(mut self) -> Self {
        self.num_kv_heads = None;
        self.head_size = None;
        self
    }

    /// Build the graph.
    pub fn build(&self) -> Result<Graph, GraphError> {
        let mut b = GraphBuilder::new();

        let input_ids = b.add_parameter("input_ids", Shape::dynamic(2));
        let attention_mask = b.add_parameter("attention_mask", Shape::dynamic(2));
        b.add_parameter("position_ids", Shape::dynamic(2));
        b.add_parameter("beam_idx", Shape::dynamic(1));

        let mut hidden = b.add_node(types::MATMUL, "embed_tokens");
        b.connect(input_ids, 0, hidden, 0)?;

        for layer in 0..self.layers {
            let q = b.add_node(types::MATMUL, &format!("layers.{layer}.q_proj"));
            let k = b.add_node(types::MATMUL, &format!("layers.{layer}.k_proj"));
            let v = b.add_node(types::MATMUL, &format!("layers.{layer}.v_proj"));
            for proj in [q, k, v] {
                b.connect(hidden, 0, proj, 0)?;
            }

            let key = self.cache_state(&mut b, layer, "key", k)?;
            let value = self.cache_state(&mut b, layer, "value", v)?;

            let mut sdpa = Node::new(types::SCALED_DOT_PRODUCT_ATTENTION)
                .named(format!("layers.{layer}.self_attn"));
            if let Some(heads) = self.num_kv_heads {
                sdpa = sdpa.with_attribute(ATTR_NUM_KV_HEADS, heads);
            }
            if let Some(size) = self.head_size {
                sdpa = sdpa.with_attribute(ATTR_HEAD_SIZE, size);
            }
            let sdpa = b.insert(sdpa)?;
            b.connect(q, 0, sdpa, 0)?;
            b.connect(key, 0, sdpa, 1)?;
            b.connect(value, 0, sdpa, 2)?;
            b.connect(attention_mask, 0, sdpa, 3)?;

            let o = b.add_node(types::MATMUL, &format!("layers.{layer}.o_proj"));
            b.connect(sdpa, 0, o, 0)?;
            hidden = o;
        }

        let lm_head = b.add_node(types::MATMUL, "lm_head");
        b.connect(hidden, 0, lm_head, 0)?;
        b.add_result("logits", lm_head, 0)?;

        Ok(b.into_graph())
    }

    /// `ReadValue -> Concat(past, new) -> Assign`, returning the Concat.
    fn cache_state(
        &self,
        b: &mut GraphBuilder,
        layer: usize,
        which: &str,
        projection: pacheck_core::NodeId,
    ) -> Result<pacheck_core::NodeId, GraphError> {
        let var = format!("past_key_values.{layer}.{which}");
        let past = b.add_node(types::READ_VALUE, &var);
        let concat = b.add_node(types::CONCAT, &format!("{var}.concat"));
        b.connect(past, 0, concat, 0)?;
        b.connect(projection, 0, concat, 1)?;
        let assign = b.add_node(types::ASSIGN, &format!("{var}.assign"));
        b.connect(concat, 0, assign, 0)?;
        Ok(concat)
    }
}
