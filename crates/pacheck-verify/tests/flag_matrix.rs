//! Every combination of the five feature flags through the real
//! paged-attention rewrite of a synthetic decoder.

use pacheck_core::graph::node::types;
use pacheck_core::{Feature, FeatureFlags, PortDirection};
use pacheck_transform::DecoderSpec;
use pacheck_verify::{
    mandatory_patterns, Cardinality, Delta, OptimizationMode, ReferenceTables,
    TransformationVerifier,
};

const LAYERS: i64 = 2;

fn flags_for(mask: u32) -> FeatureFlags {
    Feature::ALL
        .into_iter()
        .enumerate()
        .fold(FeatureFlags::none(), |flags, (bit, feature)| {
            flags.with(feature, mask & (1 << bit) != 0)
        })
}

/// Parameters the rewrite adds for `layers` sites under `flags`.
fn parameter_growth(layers: i64, flags: &FeatureFlags) -> i64 {
    // two caches per site, then past_lens, subsequence_begins,
    // block_indices_begins, max_context_len and a shared block_indices
    let mut added = 2 * layers + 5;
    if flags.use_block_indices {
        added += layers - 1;
    }
    if flags.allow_score_aggregation {
        added += 1;
    }
    if flags.allow_cache_rotation {
        added += 2 * layers + 1;
    }
    if flags.allow_xattention {
        added += layers + 2;
    }
    added
}

fn expected_delta(layers: i64, flags: &FeatureFlags) -> Delta {
    Delta::from_iter([
        (types::SCALED_DOT_PRODUCT_ATTENTION, -layers),
        (types::PAGED_ATTENTION_EXTENSION, layers),
        (types::READ_VALUE, -2 * layers),
        (types::ASSIGN, -2 * layers),
        (types::PARAMETER, parameter_growth(layers, flags)),
    ])
}

/// The right delta under the mode `flags` select, and a wrong one under the
/// other mode, so a run passes only when the mode is chosen correctly.
fn tables_for(flags: &FeatureFlags) -> ReferenceTables {
    let mode = OptimizationMode::from_flags(flags);
    let other = match mode {
        OptimizationMode::Baseline => OptimizationMode::Optimizations,
        OptimizationMode::Optimizations => OptimizationMode::Baseline,
    };
    let mut wrong = expected_delta(LAYERS, flags);
    wrong.insert(types::PARAMETER, 0);

    let mut tables = ReferenceTables::default();
    tables.insert(mode, "decoder", expected_delta(LAYERS, flags));
    tables.insert(other, "decoder", wrong);
    tables
}

#[test]
fn every_flag_combination_verifies() {
    for mask in 0..32 {
        let flags = flags_for(mask);
        let verifier = TransformationVerifier::new(tables_for(&flags));
        let mut graph = DecoderSpec::new(LAYERS as usize).build().unwrap();
        let report = verifier
            .verify("decoder", &mut graph, &flags)
            .unwrap_or_else(|e| panic!("flags {flags}: {e}"));

        let eviction = flags.use_block_indices
            && flags.use_score_outputs
            && flags.allow_cache_rotation;
        let mode = if eviction {
            OptimizationMode::Optimizations
        } else {
            OptimizationMode::Baseline
        };
        assert_eq!(report.mode, mode, "flags {flags}");

        assert!(report.sites >= 0, "flags {flags}");
        assert_eq!(report.sites, LAYERS, "flags {flags}");
        assert_eq!(report.cache_ports.len(), 2 * LAYERS as usize, "flags {flags}");

        assert_eq!(
            report.patterns.len(),
            mandatory_patterns(&flags).len(),
            "flags {flags}"
        );
        for check in &report.patterns {
            let expected = match check.cardinality {
                Cardinality::PerSite => LAYERS as usize,
                Cardinality::Singleton => 1,
            };
            assert_eq!(check.observed, expected, "flags {flags}: {}", check.matcher);
        }
    }
}

#[test]
fn partial_flags_use_baseline_table_but_keep_their_checks() {
    // eviction needs rotation too, so this stays on the baseline table
    let flags = FeatureFlags::none()
        .with(Feature::BlockIndices, true)
        .with(Feature::ScoreOutputs, true)
        .with(Feature::ScoreAggregation, true);
    let verifier = TransformationVerifier::new(tables_for(&flags));
    let mut graph = DecoderSpec::new(LAYERS as usize).build().unwrap();
    let report = verifier.verify("decoder", &mut graph, &flags).unwrap();

    assert_eq!(report.mode, OptimizationMode::Baseline);
    let keys: Vec<String> = report.patterns.iter().map(|c| c.matcher.to_string()).collect();
    assert_eq!(
        keys,
        ["*score_aggregation_window*", "block_indices.<index>", "scores.<index>"]
    );
    assert_eq!(report.patterns[2].direction, PortDirection::Output);
}

#[test]
fn enabling_a_feature_only_adds_its_own_checks() {
    for mask in 0..32 {
        let flags = flags_for(mask);
        let base = mandatory_patterns(&flags);
        for feature in Feature::ALL {
            if flags.is_enabled(feature) {
                continue;
            }
            let grown = mandatory_patterns(&flags.with(feature, true));
            assert!(grown.len() > base.len(), "{feature} on top of {flags}");
            assert!(base.iter().all(|p| grown.contains(p)), "{feature} on top of {flags}");
        }
    }
}
