//! Graph transformation and compile-check seams for paged-attention checks.
//!
//! The verifier treats the rewrite and the compiler as opaque collaborators
//! behind [`GraphTransform`] and [`CompileCheck`]. This crate defines those
//! seams and ships in-memory implementations of both: the
//! [`SdpaToPagedAttention`] rewrite and the [`StructuralCompiler`]
//! well-formedness oracle. [`synthetic`] builds stateful decoder graphs for
//! them to work on.

pub mod compile;
pub mod error;
pub mod paged_attention;
pub mod synthetic;
pub mod transform;

pub use compile::StructuralCompiler;
pub use error::TransformError;
pub use paged_attention::SdpaToPagedAttention;
pub use synthetic::DecoderSpec;
pub use transform::{CompileCheck, Device, GraphTransform, IdentityTransform, TransformStats};
