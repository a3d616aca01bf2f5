//! Running cases and case matrices.

use std::fmt;

use pacheck_verify::{TransformationVerifier, VerificationReport};
use tracing::{info, warn};

use crate::case::ModelCase;
use crate::error::HarnessError;
use crate::model_list::Mark;
use crate::provider::GraphProvider;
use crate::retry::{with_retry, RetryPolicy};

/// Result of one case.
#[derive(Debug)]
pub enum CaseOutcome {
    Passed(Box<VerificationReport>),
    Failed(HarnessError),
    /// Marked `skip`; not run.
    Skipped(String),
    /// Marked `xfail`; not run.
    ExpectedFailure(String),
}

impl CaseOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            CaseOutcome::Passed(_) => "PASSED",
            CaseOutcome::Failed(_) => "FAILED",
            CaseOutcome::Skipped(_) => "SKIPPED",
            CaseOutcome::ExpectedFailure(_) => "XFAIL",
        }
    }
}

#[derive(Debug)]
pub struct CaseResult {
    pub case_id: String,
    pub outcome: CaseOutcome,
}

impl fmt::Display for CaseResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.outcome.label(), self.case_id)?;
        match &self.outcome {
            CaseOutcome::Passed(_) => Ok(()),
            CaseOutcome::Failed(e) => write!(f, ": {e}"),
            CaseOutcome::Skipped(reason) | CaseOutcome::ExpectedFailure(reason) => {
                write!(f, " ({reason})")
            }
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MatrixSummary {
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub xfailed: usize,
}

impl MatrixSummary {
    pub fn total(&self) -> usize {
        self.passed + self.failed + self.skipped + self.xfailed
    }
}

impl fmt::Display for MatrixSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} passed, {} failed, {} skipped, {} xfailed",
            self.passed, self.failed, self.skipped, self.xfailed
        )
    }
}

#[derive(Debug)]
pub struct MatrixRun {
    pub results: Vec<CaseResult>,
    pub summary: MatrixSummary,
}

/// Runs cases through a provider and a verifier.
#[derive(Debug)]
pub struct Runner<'a> {
    verifier: &'a TransformationVerifier,
    provider: &'a dyn GraphProvider,
    retry: RetryPolicy,
}

impl<'a> Runner<'a> {
    pub fn new(verifier: &'a TransformationVerifier, provider: &'a dyn GraphProvider) -> Self {
        Self {
            verifier,
            provider,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Run one case. Each attempt fetches a fresh graph.
    pub fn run_case(&self, case: &ModelCase) -> CaseOutcome {
        let reason = || case.entry.reason.clone().unwrap_or_default();
        match case.entry.mark {
            Some(Mark::Skip) => return CaseOutcome::Skipped(reason()),
            Some(Mark::Xfail) => return CaseOutcome::ExpectedFailure(reason()),
            None => {}
        }

        let flags = case.flags();
        let result = with_retry(&self.retry, |attempt| {
            if attempt > 1 {
                info!(case = %case.case_id(), attempt, "rerunning case");
            }
            let mut graph = self.provider.provide(case)?;
            Ok(self.verifier.verify(case.model_id(), &mut graph, &flags)?)
        });
        match result {
            Ok(report) => CaseOutcome::Passed(Box::new(report)),
            Err(e) => {
                warn!(case = %case.case_id(), error = %e, "case failed");
                CaseOutcome::Failed(e)
            }
        }
    }

    pub fn run_matrix(&self, cases: &[ModelCase]) -> MatrixRun {
        let mut summary = MatrixSummary::default();
        let results: Vec<CaseResult> = cases
            .iter()
            .map(|case| {
                let outcome = self.run_case(case);
                match &outcome {
                    CaseOutcome::Passed(_) => summary.passed += 1,
                    CaseOutcome::Failed(_) => summary.failed += 1,
                    CaseOutcome::Skipped(_) => summary.skipped += 1,
                    CaseOutcome::ExpectedFailure(_) => summary.xfailed += 1,
                }
                CaseResult {
                    case_id: case.case_id(),
                    outcome,
                }
            })
            .collect();
        info!(%summary, "matrix finished");
        MatrixRun { results, summary }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::case::ModelKind;
    use crate::model_list::ModelEntry;
    use crate::provider::{ProviderError, SyntheticGraphProvider};
    use pacheck_core::Graph;
    use pacheck_transform::DecoderSpec;
    use pacheck_verify::{Delta, OptimizationMode, ReferenceTables, VerifyError};
    use std::sync::atomic::{AtomicU32, Ordering};

    fn tables() -> ReferenceTables {
        let mut t = ReferenceTables::default();
        for (mode, params) in [
            (OptimizationMode::Baseline, 7),
            (OptimizationMode::Optimizations, 14),
        ] {
            t.insert(
                mode,
                "tiny",
                Delta::from_iter([
                    ("ScaledDotProductAttention", -1),
                    ("PagedAttentionExtension", 1),
                    ("ReadValue", -2),
                    ("Assign", -2),
                    ("Parameter", params),
                ]),
            );
        }
        t
    }

    fn case(name: &str, opt: bool) -> ModelCase {
        ModelCase::new(ModelKind::Text, ModelEntry::new(name, ""), opt)
    }

    #[test]
    fn both_variants_pass() {
        let verifier = TransformationVerifier::new(tables());
        let provider = SyntheticGraphProvider::new(DecoderSpec::new(1));
        let runner = Runner::new(&verifier, &provider);
        for opt in [false, true] {
            match runner.run_case(&case("tiny", opt)) {
                CaseOutcome::Passed(report) => assert_eq!(report.sites, 1),
                other => panic!("unexpected outcome: {other:?}"),
            }
        }
    }

    #[test]
    fn marks_short_circuit() {
        let verifier = TransformationVerifier::new(ReferenceTables::default());
        let provider = SyntheticGraphProvider::new(DecoderSpec::new(1));
        let runner = Runner::new(&verifier, &provider);

        let mut skipped = case("tiny", false);
        skipped.entry = skipped.entry.marked(Mark::Skip, "slow");
        assert!(matches!(runner.run_case(&skipped), CaseOutcome::Skipped(r) if r == "slow"));

        let mut xfail = case("tiny", false);
        xfail.entry = xfail.entry.marked(Mark::Xfail, "known issue");
        assert!(matches!(runner.run_case(&xfail), CaseOutcome::ExpectedFailure(_)));
    }

    /// Fails transiently a fixed number of times before handing out graphs.
    #[derive(Debug)]
    struct Flaky {
        failures: u32,
        calls: AtomicU32,
    }

    impl GraphProvider for Flaky {
        fn provide(&self, _: &ModelCase) -> Result<Graph, ProviderError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures {
                return Err(ProviderError::Io {
                    path: "remote".into(),
                    source: std::io::Error::from(std::io::ErrorKind::ConnectionReset),
                });
            }
            Ok(DecoderSpec::new(1).build().unwrap())
        }
    }

    #[test]
    fn transient_provider_failures_are_retried() {
        let verifier = TransformationVerifier::new(tables());
        let provider = Flaky {
            failures: 2,
            calls: AtomicU32::new(0),
        };
        let runner = Runner::new(&verifier, &provider).with_retry_policy(RetryPolicy {
            attempts: 3,
            delay_ms: 0,
        });
        assert!(matches!(runner.run_case(&case("tiny", true)), CaseOutcome::Passed(_)));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn verification_failures_are_not_retried() {
        let verifier = TransformationVerifier::new(tables());
        let provider = Flaky {
            failures: 0,
            calls: AtomicU32::new(0),
        };
        let runner = Runner::new(&verifier, &provider);
        match runner.run_case(&case("unknown", false)) {
            CaseOutcome::Failed(HarnessError::Verify(VerifyError::UnknownModelKind { .. })) => {}
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn matrix_summary() {
        let verifier = TransformationVerifier::new(tables());
        let provider = SyntheticGraphProvider::new(DecoderSpec::new(1));
        let runner = Runner::new(&verifier, &provider);
        let mut skipped = case("tiny", true);
        skipped.entry = skipped.entry.marked(Mark::Skip, "later");
        let cases = [case("tiny", false), case("other", false), skipped];

        let run = runner.run_matrix(&cases);
        assert_eq!(
            run.summary,
            MatrixSummary {
                passed: 1,
                failed: 1,
                skipped: 1,
                xfailed: 0
            }
        );
        assert_eq!(run.summary.total(), 3);
        assert_eq!(run.results[0].to_string(), "PASSED text-tiny[no_opt]");
        assert!(run.results[1].to_string().starts_with("FAILED text-other[no_opt]: "));
        assert_eq!(run.results[2].to_string(), "SKIPPED text-tiny[with_opt] (later)");
    }
}
