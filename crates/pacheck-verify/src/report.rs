//! Summary of a successful verification run.

use std::fmt;
use std::time::Duration;

use pacheck_core::{FeatureFlags, PortDirection};
use pacheck_transform::TransformStats;
use serde::Serialize;

use crate::delta::Delta;
use crate::pattern::{Cardinality, NameMatcher};
use crate::reference::OptimizationMode;
use crate::snapshot::NodeTypeCount;

/// One satisfied port-pattern check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PatternCheck {
    pub matcher: NameMatcher,
    pub direction: PortDirection,
    pub cardinality: Cardinality,
    pub expected: i64,
    pub observed: usize,
}

/// Everything observed during a passing run.
#[derive(Debug, Clone, Serialize)]
pub struct VerificationReport {
    pub model: String,
    pub flags: FeatureFlags,
    pub mode: OptimizationMode,
    pub before: NodeTypeCount,
    pub after: NodeTypeCount,
    pub delta: Delta,
    /// Transformed sites, taken from the extension node type's delta.
    pub sites: i64,
    pub transform: TransformStats,
    pub patterns: Vec<PatternCheck>,
    pub cache_ports: Vec<String>,
    #[serde(serialize_with = "as_millis")]
    pub elapsed: Duration,
}

fn as_millis<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(d.as_millis() as u64)
}

impl VerificationReport {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

impl fmt::Display for VerificationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Verification Report: {} ({}) ===", self.model, self.mode)?;
        writeln!(f, "Flags:  {}", self.flags)?;
        writeln!(f, "Before: {}", self.before)?;
        writeln!(f, "After:  {}", self.after)?;
        writeln!(f, "Delta:  {}", self.delta)?;
        writeln!(
            f,
            "Sites: {} | Nodes +{} -{} | Edges +{} -{}",
            self.sites,
            self.transform.nodes_added,
            self.transform.nodes_removed,
            self.transform.edges_added,
            self.transform.edges_removed,
        )?;
        if !self.cache_ports.is_empty() {
            writeln!(f, "Cache inputs with static trailing dims: {}", self.cache_ports.len())?;
        }
        for check in &self.patterns {
            writeln!(
                f,
                "  [ok] {} {} ({}): {}",
                check.direction, check.matcher, check.cardinality, check.observed
            )?;
        }
        write!(f, "Passed in {} ms", self.elapsed.as_millis())
    }
}
