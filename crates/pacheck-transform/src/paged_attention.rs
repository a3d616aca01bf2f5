//! In-memory `ScaledDotProductAttention` to `PagedAttentionExtension` rewrite.
//!
//! Every attention site reading its key/value history from
//! `ReadValue`/`Concat`/`Assign` state is replaced by one paged-attention
//! node fed from explicit cache inputs. Feature flags add optional inputs and
//! outputs around each site.
//!
//! Paged-attention input layout:
//!
//! ```text
//!  0 query               7 block_indices          14 rotated_block_indices
//!  1 key                 8 block_indices_begins   15 rotation_deltas
//!  2 value              12 max_context_len        16 rotation_trig_lut
//!  3 key_cache          13 score_aggregation_win  17 xattention_threshold
//!  4 value_cache                                  18 xattention_block_size
//!  5 past_lens                                    19 xattention_stride
//!  6 subsequence_begins
//! ```

use std::collections::HashMap;

use pacheck_core::graph::node::types;
use pacheck_core::{Dimension, FeatureFlags, Graph, Node, NodeId, Port, Shape};
use tracing::{debug, info};

use crate::error::TransformError;
use crate::synthetic::{ATTR_HEAD_SIZE, ATTR_NUM_KV_HEADS};
use crate::transform::{GraphTransform, TransformStats};

const PASS_NAME: &str = "sdpa_to_paged_attention";

const IN_KEY_CACHE: usize = 3;
const IN_VALUE_CACHE: usize = 4;
const IN_PAST_LENS: usize = 5;
const IN_SUBSEQUENCE_BEGINS: usize = 6;
const IN_BLOCK_INDICES: usize = 7;
const IN_BLOCK_INDICES_BEGINS: usize = 8;
const IN_MAX_CONTEXT_LEN: usize = 12;
const IN_SCORE_AGGREGATION_WINDOW: usize = 13;
const IN_ROTATED_BLOCK_INDICES: usize = 14;
const IN_ROTATION_DELTAS: usize = 15;
const IN_ROTATION_TRIG_LUT: usize = 16;
const IN_XATTENTION_THRESHOLD: usize = 17;
const IN_XATTENTION_BLOCK_SIZE: usize = 18;
const IN_XATTENTION_STRIDE: usize = 19;

/// Output port of the paged-attention node carrying attention scores.
const OUT_SCORES: usize = 1;

/// Rewrites stateful scaled-dot-product attention into paged attention.
#[derive(Debug, Clone)]
pub struct SdpaToPagedAttention {
    /// Tokens per cache block; the third cache dimension.
    pub block_size: u64,
}

impl Default for SdpaToPagedAttention {
    fn default() -> Self {
        Self { block_size: 16 }
    }
}

impl SdpaToPagedAttention {
    pub fn new(block_size: u64) -> Self {
        Self { block_size }
    }

    fn cache_shape(&self, heads: Option<u64>, head_size: Option<u64>) -> Shape {
        Shape::new(vec![
            Dimension::Dynamic,
            heads.into(),
            Dimension::Static(self.block_size),
            head_size.into(),
        ])
    }

    fn fail(message: impl Into<String>) -> TransformError {
        TransformError::TransformationFailed {
            pass: PASS_NAME.to_string(),
            message: message.into(),
        }
    }
}

impl GraphTransform for SdpaToPagedAttention {
    fn name(&self) -> &str {
        PASS_NAME
    }

    fn apply(
        &self,
        graph: &mut Graph,
        flags: &FeatureFlags,
    ) -> Result<TransformStats, TransformError> {
        let sites: Vec<NodeId> = graph
            .ordered_nodes()?
            .into_iter()
            .filter(|n| n.node_type.is(types::SCALED_DOT_PRODUCT_ATTENTION))
            .map(|n| n.id)
            .collect();

        // Reject malformed sites before touching the graph.
        for site in &sites {
            let ports: Vec<usize> = graph.producers(site).iter().map(|p| p.0).collect();
            for required in 0..3 {
                if !ports.contains(&required) {
                    let name = graph.get_node(site).map(|n| n.name.clone()).unwrap_or_default();
                    return Err(Self::fail(format!(
                        "attention node '{name}' has no producer on input {required}"
                    )));
                }
            }
        }

        let nodes_before = graph.node_count();
        let edges_before = graph.edge_count();
        let mut rewriter = Rewriter {
            graph,
            flags,
            shared: HashMap::new(),
            nodes_added: 0,
            nodes_removed: 0,
            edges_added: 0,
        };
        for (index, site) in sites.iter().enumerate() {
            rewriter.rewrite_site(self, *site, index)?;
        }
        let Rewriter {
            graph,
            nodes_added,
            nodes_removed,
            edges_added,
            ..
        } = rewriter;

        let stats = TransformStats {
            sites: sites.len(),
            nodes_added,
            nodes_removed,
            edges_added,
            edges_removed: (edges_before + edges_added).saturating_sub(graph.edge_count()),
        };
        debug_assert_eq!(nodes_before + nodes_added - nodes_removed, graph.node_count());
        info!(
            sites = stats.sites,
            nodes_added = stats.nodes_added,
            nodes_removed = stats.nodes_removed,
            "paged attention rewrite applied"
        );
        Ok(stats)
    }
}

/// Per-application rewrite state.
struct Rewriter<'a> {
    graph: &'a mut Graph,
    flags: &'a FeatureFlags,
    /// Inputs shared by every site, created on first use.
    shared: HashMap<&'static str, NodeId>,
    nodes_added: usize,
    nodes_removed: usize,
    edges_added: usize,
}

impl Rewriter<'_> {
    fn rewrite_site(
        &mut self,
        pass: &SdpaToPagedAttention,
        sdpa: NodeId,
        index: usize,
    ) -> Result<(), TransformError> {
        let producers = self.graph.producers(&sdpa);
        let consumers = self.graph.consumers(&sdpa);
        let source = |port: usize| {
            producers
                .iter()
                .find(|p| p.0 == port)
                .map(|p| (p.1, p.2))
                .ok_or_else(|| SdpaToPagedAttention::fail(format!("missing input {port}")))
        };
        let query = source(0)?;
        let key = self.detach_state(source(1)?)?;
        let value = self.detach_state(source(2)?)?;

        let original = self.remove(sdpa)?;
        let heads = original.attribute_u64(ATTR_NUM_KV_HEADS);
        let head_size = original.attribute_u64(ATTR_HEAD_SIZE);
        debug!(site = index, name = %original.name, ?heads, ?head_size, "rewriting attention site");

        let mut paged = Node::new(types::PAGED_ATTENTION_EXTENSION)
            .named(format!("PagedAttentionExtension.{index}"));
        paged.attributes = original.attributes;
        let pa = self.graph.add_node(paged)?;
        self.nodes_added += 1;

        self.connect(query, pa, 0)?;
        self.connect(key, pa, 1)?;
        self.connect(value, pa, 2)?;
        for (port, target, target_port) in consumers {
            if port == 0 {
                self.connect((pa, 0), target, target_port)?;
            }
        }

        let cache_shape = pass.cache_shape(heads, head_size);
        let key_cache = self.parameter(&format!("key_cache.{index}"), cache_shape.clone())?;
        self.connect((key_cache, 0), pa, IN_KEY_CACHE)?;
        let value_cache = self.parameter(&format!("value_cache.{index}"), cache_shape)?;
        self.connect((value_cache, 0), pa, IN_VALUE_CACHE)?;

        self.shared_input("past_lens", Shape::dynamic(1), pa, IN_PAST_LENS)?;
        self.shared_input("subsequence_begins", Shape::dynamic(1), pa, IN_SUBSEQUENCE_BEGINS)?;
        self.shared_input("block_indices_begins", Shape::dynamic(1), pa, IN_BLOCK_INDICES_BEGINS)?;
        self.shared_input("max_context_len", Shape::scalar(), pa, IN_MAX_CONTEXT_LEN)?;

        if self.flags.use_block_indices {
            self.site_input("block_indices", index, Shape::dynamic(1), pa, IN_BLOCK_INDICES)?;
        } else {
            self.shared_input("block_indices", Shape::dynamic(1), pa, IN_BLOCK_INDICES)?;
        }

        if self.flags.allow_score_aggregation {
            self.shared_input(
                "score_aggregation_window",
                Shape::dynamic(1),
                pa,
                IN_SCORE_AGGREGATION_WINDOW,
            )?;
        }

        if self.flags.allow_cache_rotation {
            self.site_input(
                "rotated_block_indices",
                index,
                Shape::dynamic(1),
                pa,
                IN_ROTATED_BLOCK_INDICES,
            )?;
            self.site_input("rotation_deltas", index, Shape::dynamic(2), pa, IN_ROTATION_DELTAS)?;
            self.shared_input("rotation_trig_lut", Shape::dynamic(2), pa, IN_ROTATION_TRIG_LUT)?;
        }

        if self.flags.allow_xattention {
            self.site_input(
                "xattention_threshold",
                index,
                Shape::dynamic(1),
                pa,
                IN_XATTENTION_THRESHOLD,
            )?;
            self.shared_input(
                "xattention_block_size",
                Shape::scalar(),
                pa,
                IN_XATTENTION_BLOCK_SIZE,
            )?;
            self.shared_input("xattention_stride", Shape::scalar(), pa, IN_XATTENTION_STRIDE)?;
        }

        if self.flags.use_score_outputs {
            let name = format!("scores.{index}");
            let result = self.graph.add_node(Node::new(types::RESULT).named(name.clone()))?;
            self.nodes_added += 1;
            self.connect((pa, OUT_SCORES), result, 0)?;
            self.graph
                .add_output(Port::new(name, Shape::dynamic(1)).bound_to(result));
        }

        Ok(())
    }

    /// If `source` is a `Concat` of a `ReadValue` history and a fresh
    /// projection, remove the state nodes and return the projection.
    fn detach_state(&mut self, source: (NodeId, usize)) -> Result<(NodeId, usize), TransformError> {
        let (concat, _) = source;
        let is_concat = self
            .graph
            .get_node(&concat)
            .is_some_and(|n| n.node_type.is(types::CONCAT));
        if !is_concat {
            return Ok(source);
        }

        let inputs = self.graph.producers(&concat);
        let (state, fresh): (Vec<_>, Vec<_>) = inputs.into_iter().partition(|(_, node, _)| {
            self.graph
                .get_node(node)
                .is_some_and(|n| n.node_type.is(types::READ_VALUE))
        });
        if state.is_empty() {
            return Ok(source);
        }
        let (_, projection, projection_port) = fresh.first().copied().ok_or_else(|| {
            SdpaToPagedAttention::fail("key/value concat has no input besides its cache state")
        })?;

        let assigns: Vec<NodeId> = self
            .graph
            .consumers(&concat)
            .into_iter()
            .map(|(_, target, _)| target)
            .filter(|t| {
                self.graph
                    .get_node(t)
                    .is_some_and(|n| n.node_type.is(types::ASSIGN))
            })
            .collect();
        for assign in assigns {
            self.remove(assign)?;
        }
        for (_, read_value, _) in state {
            self.remove(read_value)?;
        }
        self.remove(concat)?;

        Ok((projection, projection_port))
    }

    fn remove(&mut self, id: NodeId) -> Result<Node, TransformError> {
        let node = self.graph.remove_node(id)?;
        self.nodes_removed += 1;
        Ok(node)
    }

    fn connect(
        &mut self,
        source: (NodeId, usize),
        target: NodeId,
        port: usize,
    ) -> Result<(), TransformError> {
        self.graph.connect(source.0, source.1, target, port)?;
        self.edges_added += 1;
        Ok(())
    }

    fn parameter(&mut self, name: &str, shape: Shape) -> Result<NodeId, TransformError> {
        let id = self
            .graph
            .add_node(Node::new(types::PARAMETER).named(name))?;
        self.graph.add_input(Port::new(name, shape).bound_to(id));
        self.nodes_added += 1;
        Ok(id)
    }

    fn site_input(
        &mut self,
        kind: &str,
        index: usize,
        shape: Shape,
        pa: NodeId,
        port: usize,
    ) -> Result<(), TransformError> {
        let id = self.parameter(&format!("{kind}.{index}"), shape)?;
        self.connect((id, 0), pa, port)
    }

    fn shared_input(
        &mut self,
        name: &'static str,
        shape: Shape,
        pa: NodeId,
        port: usize,
    ) -> Result<(), TransformError> {
        let id = match self.shared.get(name) {
            Some(id) => *id,
            None => {
                let id = self.parameter(name, shape)?;
                self.shared.insert(name, id);
                id
            }
        };
        self.connect((id, 0), pa, port)
    }
}
