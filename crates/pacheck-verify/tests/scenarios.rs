//! End-to-end verification runs against hand-built graphs and synthetic
//! reference tables.

use std::io::Write;

use pacheck_core::graph::node::types;
use pacheck_core::{Dimension, Feature, FeatureFlags, Graph, GraphBuilder, Port, Shape};
use pacheck_transform::{GraphTransform, TransformError, TransformStats};
use pacheck_verify::{
    Delta, OptimizationMode, ReferenceTables, TransformationVerifier, VerifyConfig, VerifyError,
};

const ATTENTION: &str = "Attention";

/// Retypes every `Attention` node as `PagedAttentionExtension` and publishes
/// the ports the enabled flags call for. Per-site ports are published
/// `per_site_copies` times per site.
#[derive(Debug)]
struct RetypeAttention {
    per_site_copies: usize,
}

impl RetypeAttention {
    fn faithful() -> Self {
        Self { per_site_copies: 1 }
    }
}

impl GraphTransform for RetypeAttention {
    fn name(&self) -> &str {
        "retype_attention"
    }

    fn apply(
        &self,
        graph: &mut Graph,
        flags: &FeatureFlags,
    ) -> Result<TransformStats, TransformError> {
        let sites: Vec<_> = graph
            .nodes()
            .filter(|n| n.node_type.is(ATTENTION))
            .map(|n| n.id)
            .collect();
        for id in &sites {
            if let Some(node) = graph.get_node_mut(id) {
                node.node_type = types::PAGED_ATTENTION_EXTENSION.into();
            }
        }

        let cache = Shape::new(vec![
            Dimension::Dynamic,
            Dimension::Static(2),
            Dimension::Static(16),
            Dimension::Static(8),
        ]);
        let mut inputs = Vec::new();
        let mut outputs = Vec::new();
        for i in 0..sites.len() * self.per_site_copies {
            inputs.push(Port::new(format!("key_cache.{i}"), cache.clone()));
            inputs.push(Port::new(format!("value_cache.{i}"), cache.clone()));
            if flags.use_block_indices {
                inputs.push(Port::new(format!("block_indices.{i}"), Shape::dynamic(1)));
            }
            if flags.use_score_outputs {
                outputs.push(Port::new(format!("scores.{i}"), Shape::dynamic(1)));
            }
            if flags.allow_cache_rotation {
                inputs.push(Port::new(format!("rotated_block_indices.{i}"), Shape::dynamic(1)));
                inputs.push(Port::new(format!("rotation_deltas.{i}"), Shape::dynamic(2)));
            }
            if flags.allow_xattention {
                inputs.push(Port::new(format!("xattention_threshold.{i}"), Shape::dynamic(1)));
            }
        }
        if flags.allow_score_aggregation {
            inputs.push(Port::new("score_aggregation_window", Shape::dynamic(1)));
        }
        if flags.allow_cache_rotation {
            inputs.push(Port::new("rotation_trig_lut", Shape::dynamic(2)));
        }
        if flags.allow_xattention {
            inputs.push(Port::new("xattention_block_size", Shape::scalar()));
            inputs.push(Port::new("xattention_stride", Shape::scalar()));
        }
        inputs.into_iter().for_each(|p| graph.add_input(p));
        outputs.into_iter().for_each(|p| graph.add_output(p));

        Ok(TransformStats {
            sites: sites.len(),
            ..TransformStats::default()
        })
    }
}

/// `q`, `k`, `v` projections feeding `sites` attention nodes.
fn attention_graph(sites: usize) -> Graph {
    let mut b = GraphBuilder::new();
    let q = b.add_node(types::MATMUL, "q");
    let k = b.add_node(types::MATMUL, "k");
    let v = b.add_node(types::MATMUL, "v");
    for i in 0..sites {
        let attn = b.add_node(ATTENTION, &format!("attn.{i}"));
        for (port, src) in [q, k, v].into_iter().enumerate() {
            b.connect(src, 0, attn, port).unwrap();
        }
    }
    b.build().unwrap()
}

fn config() -> VerifyConfig {
    let mut config = VerifyConfig::default();
    config.node_types.insert(ATTENTION.to_string());
    config
}

fn tables(sites: i64) -> ReferenceTables {
    let delta = Delta::from_iter([(ATTENTION, -sites), (types::PAGED_ATTENTION_EXTENSION, sites)]);
    let mut t = ReferenceTables::default();
    t.insert(OptimizationMode::Baseline, "M", delta.clone());
    t.insert(OptimizationMode::Optimizations, "M", delta);
    t
}

fn verifier(sites: i64, transform: RetypeAttention) -> TransformationVerifier {
    TransformationVerifier::new(tables(sites))
        .with_config(config())
        .with_transform(transform)
}

#[test]
fn baseline_without_flags_runs_no_pattern_checks() {
    let mut g = attention_graph(1);
    let report = verifier(1, RetypeAttention::faithful())
        .verify("M", &mut g, &FeatureFlags::none())
        .unwrap();
    assert_eq!(report.delta.get(ATTENTION), -1);
    assert_eq!(report.delta.get(types::PAGED_ATTENTION_EXTENSION), 1);
    assert_eq!(report.mode, OptimizationMode::Baseline);
    assert!(report.patterns.is_empty());
}

#[test]
fn all_flags_one_site_matches_nine_patterns_once() {
    let mut g = attention_graph(1);
    let report = verifier(1, RetypeAttention::faithful())
        .verify("M", &mut g, &FeatureFlags::all())
        .unwrap();
    assert_eq!(report.mode, OptimizationMode::Optimizations);
    assert_eq!(report.patterns.len(), 9);
    assert!(report.patterns.iter().all(|c| c.observed == 1));
}

#[test]
fn per_site_count_follows_extension_delta() {
    let mut g = attention_graph(2);
    // sites are retyped but no per-site ports are published
    let transform = RetypeAttention { per_site_copies: 0 };
    let err = verifier(2, transform)
        .verify("M", &mut g, &FeatureFlags::none().with(Feature::ScoreOutputs, true))
        .unwrap_err();
    match err {
        VerifyError::PatternCardinalityViolation { key, expected, observed, .. } => {
            assert_eq!(key, "scores");
            assert_eq!(expected, 2);
            assert_eq!(observed, 0);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn per_site_inputs_are_checked_before_outputs() {
    let mut g = attention_graph(1);
    let transform = RetypeAttention { per_site_copies: 0 };
    let flags = FeatureFlags::none()
        .with(Feature::ScoreOutputs, true)
        .with(Feature::CacheRotation, true);
    let err = verifier(1, transform).verify("M", &mut g, &flags).unwrap_err();
    match err {
        VerifyError::PatternCardinalityViolation { key, .. } => {
            assert_eq!(key, "rotated_block_indices");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn two_sites_one_scores_port_is_rejected() {
    // Transform two sites but publish a single scores output.
    #[derive(Debug)]
    struct SingleScores;
    impl GraphTransform for SingleScores {
        fn name(&self) -> &str {
            "single_scores"
        }
        fn apply(
            &self,
            graph: &mut Graph,
            flags: &FeatureFlags,
        ) -> Result<TransformStats, TransformError> {
            let stats = RetypeAttention { per_site_copies: 0 }.apply(graph, flags)?;
            graph.add_output(Port::new("scores.0", Shape::dynamic(1)));
            Ok(stats)
        }
    }

    let mut g = attention_graph(2);
    let verifier = TransformationVerifier::new(tables(2))
        .with_config(config())
        .with_transform(SingleScores);
    let flags = FeatureFlags::none().with(Feature::ScoreOutputs, true);
    let err = verifier.verify("M", &mut g, &flags).unwrap_err();
    assert_eq!(
        err.to_string(),
        "The number of scores outputs doesn't correspond to the expected value. \
         Expected 2, received 1"
    );
}

#[test]
fn duplicated_singleton_is_rejected() {
    #[derive(Debug)]
    struct DoubleLut;
    impl GraphTransform for DoubleLut {
        fn name(&self) -> &str {
            "double_lut"
        }
        fn apply(
            &self,
            graph: &mut Graph,
            flags: &FeatureFlags,
        ) -> Result<TransformStats, TransformError> {
            let stats = RetypeAttention::faithful().apply(graph, flags)?;
            graph.add_input(Port::with_names(
                ["rotation_trig_lut_copy", "layer.rotation_trig_lut"],
                Shape::dynamic(2),
            ));
            Ok(stats)
        }
    }

    let mut g = attention_graph(1);
    let verifier = TransformationVerifier::new(tables(1))
        .with_config(config())
        .with_transform(DoubleLut);
    let err = verifier.verify("M", &mut g, &FeatureFlags::all()).unwrap_err();
    assert!(matches!(
        err,
        VerifyError::PatternCardinalityViolation { expected: 1, observed: 3, .. }
    ));
}

#[test]
fn wrong_reference_is_a_structural_mismatch() {
    let mut g = attention_graph(2);
    let err = verifier(1, RetypeAttention::faithful())
        .verify("M", &mut g, &FeatureFlags::none())
        .unwrap_err();
    assert!(matches!(
        err,
        VerifyError::StructuralMismatch { ref mismatches, .. } if mismatches.len() == 2
    ));
}

#[test]
fn failing_transform_is_fatal() {
    #[derive(Debug)]
    struct Refuse;
    impl GraphTransform for Refuse {
        fn name(&self) -> &str {
            "refuse"
        }
        fn apply(&self, _: &mut Graph, _: &FeatureFlags) -> Result<TransformStats, TransformError> {
            Err(TransformError::TransformationFailed {
                pass: "refuse".into(),
                message: "unsupported pattern".into(),
            })
        }
    }

    let mut g = attention_graph(1);
    let err = TransformationVerifier::new(tables(1))
        .with_transform(Refuse)
        .verify("M", &mut g, &FeatureFlags::none())
        .unwrap_err();
    assert_eq!(err.kind(), "transformation_failed");
    assert!(err.to_string().contains("unsupported pattern"));
}

#[test]
fn tables_from_toml_file_drive_a_run() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        "[baseline.M]\nAttention = -1\nPagedAttentionExtension = 1\n\n[optimizations.M]\nAttention = -1\nPagedAttentionExtension = 1"
    )
    .unwrap();
    let tables = ReferenceTables::load(file.path()).unwrap();

    let mut g = attention_graph(1);
    let report = TransformationVerifier::new(tables)
        .with_config(config())
        .with_transform(RetypeAttention::faithful())
        .verify("M", &mut g, &FeatureFlags::all())
        .unwrap();
    assert_eq!(report.sites, 1);
    assert_eq!(report.cache_ports, ["key_cache.0", "value_cache.0"]);
}
