//! Harness around the verifier: model lists, case identifiers, graph
//! providers, and a retry policy that restarts a whole case from a fresh
//! graph when loading fails transiently.

pub mod case;
pub mod error;
pub mod model_list;
pub mod provider;
pub mod retry;
pub mod runner;

pub use case::{precommit_cases, ModelCase, ModelKind};
pub use error::HarnessError;
pub use model_list::{load_model_list, parse_model_list, Mark, ModelEntry};
pub use provider::{
    load_graph, FileGraphProvider, GraphProvider, ProviderError, SyntheticGraphProvider,
};
pub use retry::{with_retry, RetryPolicy};
pub use runner::{CaseOutcome, CaseResult, MatrixRun, MatrixSummary, Runner};
