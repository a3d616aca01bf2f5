//! Verification of paged-attention graph transformations.
//!
//! A run snapshots the node-type population of a graph, lets an external
//! [`GraphTransform`](pacheck_transform::GraphTransform) rewrite the graph in
//! place, snapshots again and compares the population [`Delta`] with a
//! reference keyed by model and optimization mode. It then checks the cache
//! inputs for static trailing dimensions and counts the named ports each
//! enabled feature must expose.
//!
//! ```rust
//! use pacheck_core::FeatureFlags;
//! use pacheck_transform::DecoderSpec;
//! use pacheck_verify::{Delta, OptimizationMode, ReferenceTables, TransformationVerifier};
//!
//! let mut tables = ReferenceTables::default();
//! tables.insert(
//!     OptimizationMode::Baseline,
//!     "tiny-decoder",
//!     Delta::from_iter([
//!         ("ScaledDotProductAttention", -1),
//!         ("PagedAttentionExtension", 1),
//!         ("Parameter", 7),
//!         ("ReadValue", -2),
//!         ("Assign", -2),
//!     ]),
//! );
//!
//! let verifier = TransformationVerifier::new(tables);
//! let mut graph = DecoderSpec::new(1).build().unwrap();
//! let report = verifier
//!     .verify("tiny-decoder", &mut graph, &FeatureFlags::none())
//!     .unwrap();
//! assert_eq!(report.sites, 1);
//! ```

pub mod cache_shape;
pub mod config;
pub mod delta;
pub mod engine;
pub mod error;
pub mod expectation;
pub mod pattern;
pub mod reference;
pub mod report;
pub mod snapshot;

pub use config::VerifyConfig;
pub use delta::{compute_delta, Delta, DeltaMismatch};
pub use engine::TransformationVerifier;
pub use error::VerifyError;
pub use expectation::{mandatory_patterns, Expectation, ExpectationResolver, FEATURE_RULES};
pub use pattern::{count_matches, Cardinality, NameMatcher, PortPattern};
pub use reference::{OptimizationMode, ReferenceError, ReferenceSource, ReferenceTables};
pub use report::{PatternCheck, VerificationReport};
pub use snapshot::{snapshot, NodeTypeCount};
