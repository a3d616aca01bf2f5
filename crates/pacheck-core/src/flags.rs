//! Optional paged-attention features a transformation may be asked to expose.

use std::fmt;

use serde::{Deserialize, Serialize};

/// One optional feature of the paged-attention rewrite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    /// Per-site `block_indices.N` inputs instead of one shared input.
    BlockIndices,
    /// Per-site `scores.N` outputs.
    ScoreOutputs,
    /// A shared `score_aggregation_window` input.
    ScoreAggregation,
    /// Cache rotation metadata inputs.
    CacheRotation,
    /// Thresholded sparse attention parameters.
    XAttention,
}

impl Feature {
    pub const ALL: [Feature; 5] = [
        Feature::BlockIndices,
        Feature::ScoreOutputs,
        Feature::ScoreAggregation,
        Feature::CacheRotation,
        Feature::XAttention,
    ];
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Feature::BlockIndices => "use_block_indices",
            Feature::ScoreOutputs => "use_score_outputs",
            Feature::ScoreAggregation => "allow_score_aggregation",
            Feature::CacheRotation => "allow_cache_rotation",
            Feature::XAttention => "allow_xattention",
        };
        f.write_str(name)
    }
}

/// Independent feature switches passed to the transformation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureFlags {
    pub use_block_indices: bool,
    pub use_score_outputs: bool,
    pub allow_score_aggregation: bool,
    pub allow_cache_rotation: bool,
    pub allow_xattention: bool,
}

impl FeatureFlags {
    /// Every feature disabled.
    pub fn none() -> Self {
        Self::default()
    }

    /// Every feature enabled.
    pub fn all() -> Self {
        Self {
            use_block_indices: true,
            use_score_outputs: true,
            allow_score_aggregation: true,
            allow_cache_rotation: true,
            allow_xattention: true,
        }
    }

    /// The "use optimizations" switch: all features on, or all off.
    pub fn from_optimizations(enabled: bool) -> Self {
        if enabled {
            Self::all()
        } else {
            Self::none()
        }
    }

    pub fn is_enabled(&self, feature: Feature) -> bool {
        match feature {
            Feature::BlockIndices => self.use_block_indices,
            Feature::ScoreOutputs => self.use_score_outputs,
            Feature::ScoreAggregation => self.allow_score_aggregation,
            Feature::CacheRotation => self.allow_cache_rotation,
            Feature::XAttention => self.allow_xattention,
        }
    }

    /// Return a copy with one feature switched.
    pub fn with(mut self, feature: Feature, enabled: bool) -> Self {
        match feature {
            Feature::BlockIndices => self.use_block_indices = enabled,
            Feature::ScoreOutputs => self.use_score_outputs = enabled,
            Feature::ScoreAggregation => self.allow_score_aggregation = enabled,
            Feature::CacheRotation => self.allow_cache_rotation = enabled,
            Feature::XAttention => self.allow_xattention = enabled,
        }
        self
    }

    /// Enabled features, in declaration order.
    pub fn enabled(&self) -> impl Iterator<Item = Feature> + '_ {
        Feature::ALL.into_iter().filter(|f| self.is_enabled(*f))
    }

    /// Cache eviction needs block indices, score outputs and cache rotation
    /// together; it selects the optimizations reference table.
    pub fn use_cache_eviction(&self) -> bool {
        self.use_block_indices && self.use_score_outputs && self.allow_cache_rotation
    }
}

impl fmt::Display for FeatureFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let enabled: Vec<String> = self.enabled().map(|f| f.to_string()).collect();
        if enabled.is_empty() {
            write!(f, "(none)")
        } else {
            write!(f, "{}", enabled.join(", "))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_eviction_requires_three_features() {
        assert!(FeatureFlags::all().use_cache_eviction());
        assert!(!FeatureFlags::none().use_cache_eviction());

        let partial = FeatureFlags::none()
            .with(Feature::BlockIndices, true)
            .with(Feature::ScoreOutputs, true);
        assert!(!partial.use_cache_eviction());
        assert!(partial
            .with(Feature::CacheRotation, true)
            .use_cache_eviction());

        // Aggregation and xattention do not take part.
        let without_extras = FeatureFlags::all()
            .with(Feature::ScoreAggregation, false)
            .with(Feature::XAttention, false);
        assert!(without_extras.use_cache_eviction());
    }

    #[test]
    fn optimizations_switch_expands_to_all_or_none() {
        assert_eq!(FeatureFlags::from_optimizations(true), FeatureFlags::all());
        assert_eq!(FeatureFlags::from_optimizations(false), FeatureFlags::none());
        assert_eq!(FeatureFlags::all().enabled().count(), 5);
        assert_eq!(FeatureFlags::none().enabled().count(), 0);
    }

    #[test]
    fn with_round_trips_every_feature() {
        for feature in Feature::ALL {
            let on = FeatureFlags::none().with(feature, true);
            assert!(on.is_enabled(feature));
            assert_eq!(on.enabled().collect::<Vec<_>>(), vec![feature]);
            assert!(!on.with(feature, false).is_enabled(feature));
        }
    }

    #[test]
    fn display_lists_enabled() {
        assert_eq!(FeatureFlags::none().to_string(), "(none)");
        let flags = FeatureFlags::none().with(Feature::XAttention, true);
        assert_eq!(flags.to_string(), "allow_xattention");
    }

    #[test]
    fn deserialize_missing_fields_default_off() {
        let flags: FeatureFlags =
            serde_json::from_str(r#"{"use_score_outputs": true}"#).unwrap();
        assert!(flags.use_score_outputs);
        assert!(!flags.use_block_indices);
    }
}
