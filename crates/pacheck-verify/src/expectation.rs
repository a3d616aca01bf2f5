//! What a transformation must produce for a model and a set of flags.
//!
//! Port checks come from [`FEATURE_RULES`], one row per feature. The
//! reference delta comes from a [`ReferenceSource`], choosing the
//! optimizations table when cache eviction is in effect.

use pacheck_core::{Feature, FeatureFlags};
use tracing::debug;

use crate::delta::Delta;
use crate::error::VerifyError;
use crate::pattern::PortPattern;
use crate::reference::{OptimizationMode, ReferenceSource};

/// Port checks owed by one enabled feature.
#[derive(Debug)]
pub struct FeatureRule {
    pub feature: Feature,
    pub patterns: &'static [PortPattern],
}

pub const FEATURE_RULES: &[FeatureRule] = &[
    FeatureRule {
        feature: Feature::BlockIndices,
        patterns: &[PortPattern::per_site_input("block_indices")],
    },
    FeatureRule {
        feature: Feature::ScoreOutputs,
        patterns: &[PortPattern::per_site_output("scores")],
    },
    FeatureRule {
        feature: Feature::ScoreAggregation,
        patterns: &[PortPattern::shared_input("score_aggregation_window")],
    },
    FeatureRule {
        feature: Feature::CacheRotation,
        patterns: &[
            PortPattern::per_site_input("rotated_block_indices"),
            PortPattern::per_site_input("rotation_deltas"),
            PortPattern::shared_input("rotation_trig_lut"),
        ],
    },
    FeatureRule {
        feature: Feature::XAttention,
        patterns: &[
            PortPattern::per_site_input("xattention_threshold"),
            PortPattern::exact_input("xattention_block_size"),
            PortPattern::exact_input("xattention_stride"),
        ],
    },
];

/// Port checks for the enabled features, in rule-table order.
pub fn mandatory_patterns(flags: &FeatureFlags) -> Vec<PortPattern> {
    FEATURE_RULES
        .iter()
        .filter(|rule| flags.is_enabled(rule.feature))
        .flat_map(|rule| rule.patterns.iter().copied())
        .collect()
}

/// Everything a run is checked against.
#[derive(Debug, Clone)]
pub struct Expectation {
    pub mode: OptimizationMode,
    pub delta: Delta,
    pub patterns: Vec<PortPattern>,
}

/// Resolves [`Expectation`]s against a reference source.
#[derive(Debug, Clone, Copy)]
pub struct ExpectationResolver<'a> {
    source: &'a dyn ReferenceSource,
}

impl<'a> ExpectationResolver<'a> {
    pub fn new(source: &'a dyn ReferenceSource) -> Self {
        Self { source }
    }

    pub fn resolve(&self, model: &str, flags: &FeatureFlags) -> Result<Expectation, VerifyError> {
        let mode = OptimizationMode::from_flags(flags);
        let delta = self
            .source
            .expected(model, mode)
            .cloned()
            .ok_or_else(|| VerifyError::UnknownModelKind {
                model: model.to_string(),
                mode,
            })?;
        let patterns = mandatory_patterns(flags);
        debug!(model, %mode, patterns = patterns.len(), "resolved expectation");
        Ok(Expectation {
            mode,
            delta,
            patterns,
        })
    }
}
