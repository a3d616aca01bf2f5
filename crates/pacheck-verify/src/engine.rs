//! Verification orchestrator.
//!
//! One run is a straight pipeline with no retries: snapshot, transform and
//! compile, snapshot, delta, reference comparison, cache shape check,
//! singleton and per-site port counts. The first failing step ends the run.

use std::time::Instant;

use pacheck_core::{FeatureFlags, Graph, PortDirection};
use pacheck_transform::{CompileCheck, GraphTransform, SdpaToPagedAttention, StructuralCompiler};
use tracing::{debug, info, warn};

use crate::cache_shape::check_cache_ports;
use crate::config::VerifyConfig;
use crate::delta::compute_delta;
use crate::error::VerifyError;
use crate::expectation::ExpectationResolver;
use crate::pattern::{count_matches, Cardinality, PortPattern};
use crate::reference::ReferenceSource;
use crate::report::{PatternCheck, VerificationReport};
use crate::snapshot::snapshot;

/// Checks one transformation of one graph against its references.
#[derive(Debug)]
pub struct TransformationVerifier {
    config: VerifyConfig,
    references: Box<dyn ReferenceSource>,
    transform: Box<dyn GraphTransform>,
    compiler: Box<dyn CompileCheck>,
}

impl TransformationVerifier {
    /// A verifier running the in-memory paged-attention rewrite and the
    /// structural compile check.
    pub fn new(references: impl ReferenceSource + 'static) -> Self {
        Self {
            config: VerifyConfig::default(),
            references: Box::new(references),
            transform: Box::new(SdpaToPagedAttention::default()),
            compiler: Box::new(StructuralCompiler::default()),
        }
    }

    pub fn with_config(mut self, config: VerifyConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_transform(mut self, transform: impl GraphTransform + 'static) -> Self {
        self.transform = Box::new(transform);
        self
    }

    pub fn with_compiler(mut self, compiler: impl CompileCheck + 'static) -> Self {
        self.compiler = Box::new(compiler);
        self
    }

    pub fn config(&self) -> &VerifyConfig {
        &self.config
    }

    /// Transform `graph` in place and verify the result.
    pub fn verify(
        &self,
        model: &str,
        graph: &mut Graph,
        flags: &FeatureFlags,
    ) -> Result<VerificationReport, VerifyError> {
        let started = Instant::now();
        let interesting = &self.config.node_types;

        let before = snapshot(graph, interesting)?;
        debug!(model, before = %before, "population before transformation");

        let stats = self
            .transform
            .apply(graph, flags)
            .map_err(VerifyError::TransformationFailed)?;
        self.compiler
            .compile(graph, self.config.device)
            .map_err(VerifyError::CompilationFailed)?;

        let after = snapshot(graph, interesting)?;
        let delta = compute_delta(&before, &after);
        debug!(model, after = %after, delta = %delta, "population after transformation");

        let expectation = ExpectationResolver::new(self.references.as_ref()).resolve(model, flags)?;
        let mismatches = delta.mismatches(&expectation.delta);
        if !mismatches.is_empty() {
            warn!(model, mismatches = mismatches.len(), "population delta differs");
            return Err(VerifyError::StructuralMismatch {
                model: model.to_string(),
                mismatches,
            });
        }

        let cache_ports = check_cache_ports(graph)?;

        let sites = delta.get(&self.config.extension_node_type);
        let (singletons, mut per_site): (Vec<PortPattern>, Vec<PortPattern>) = expectation
            .patterns
            .iter()
            .copied()
            .partition(|p| p.cardinality == Cardinality::Singleton);
        // inputs before outputs, rule-table order within each
        per_site.sort_by_key(|p| p.direction == PortDirection::Output);
        let mut patterns = Vec::with_capacity(expectation.patterns.len());
        for pattern in singletons.iter().chain(per_site.iter()) {
            let expected = match pattern.cardinality {
                Cardinality::Singleton => 1,
                Cardinality::PerSite => sites,
            };
            patterns.push(check_pattern(graph, pattern, expected)?);
        }

        let report = VerificationReport {
            model: model.to_string(),
            flags: *flags,
            mode: expectation.mode,
            before,
            after,
            delta,
            sites,
            transform: stats,
            patterns,
            cache_ports,
            elapsed: started.elapsed(),
        };
        info!(
            model,
            mode = %report.mode,
            sites,
            checks = report.patterns.len(),
            "transformation verified"
        );
        Ok(report)
    }
}

fn check_pattern(
    graph: &Graph,
    pattern: &PortPattern,
    expected: i64,
) -> Result<PatternCheck, VerifyError> {
    let observed = count_matches(graph.ports(pattern.direction), &pattern.matcher);
    debug!(pattern = %pattern.matcher, observed, expected, "port pattern count");
    if observed as i64 != expected {
        return Err(VerifyError::PatternCardinalityViolation {
            key: pattern.key().to_string(),
            direction: pattern.direction,
            expected,
            observed,
        });
    }
    Ok(PatternCheck {
        matcher: pattern.matcher,
        direction: pattern.direction,
        cardinality: pattern.cardinality,
        expected,
        observed,
    })
}
