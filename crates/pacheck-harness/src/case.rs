//! Test cases: a listed model, its kind and the optimization switch.

use std::fmt;
use std::str::FromStr;

use pacheck_core::FeatureFlags;
use serde::{Deserialize, Serialize};

use crate::model_list::ModelEntry;

/// Which part of an exported model carries the language graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    /// Text-only causal language model.
    Text,
    /// Vision-and-text model; the language sub-model is checked.
    VisionText,
}

impl ModelKind {
    pub fn id_prefix(&self) -> &'static str {
        match self {
            ModelKind::Text => "text-",
            ModelKind::VisionText => "vlm-",
        }
    }

    /// Directory name used for stored graphs of this kind.
    pub fn dir_name(&self) -> &'static str {
        match self {
            ModelKind::Text => "text",
            ModelKind::VisionText => "vlm",
        }
    }
}

impl FromStr for ModelKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" => Ok(ModelKind::Text),
            "vlm" | "vision" | "vision_text" => Ok(ModelKind::VisionText),
            other => Err(format!("unknown model kind '{other}'. Choose: text, vlm")),
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir_name())
    }
}

/// One parametrization of the precommit matrix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelCase {
    pub kind: ModelKind,
    pub entry: ModelEntry,
    pub use_optimizations: bool,
}

impl ModelCase {
    pub fn new(kind: ModelKind, entry: ModelEntry, use_optimizations: bool) -> Self {
        Self {
            kind,
            entry,
            use_optimizations,
        }
    }

    /// Model identity used to look up references.
    pub fn model_id(&self) -> &str {
        &self.entry.name
    }

    pub fn flags(&self) -> FeatureFlags {
        FeatureFlags::from_optimizations(self.use_optimizations)
    }

    /// e.g. `text-katuni4ka/tiny-random-llama[with_opt]`.
    pub fn case_id(&self) -> String {
        let variant = if self.use_optimizations {
            "with_opt"
        } else {
            "no_opt"
        };
        format!("{}{}[{variant}]", self.kind.id_prefix(), self.entry.name)
    }
}

/// Every text model, then every vision model, each without and with
/// optimizations.
pub fn precommit_cases(text: &[ModelEntry], vision: &[ModelEntry]) -> Vec<ModelCase> {
    let listed = text
        .iter()
        .map(|e| (ModelKind::Text, e))
        .chain(vision.iter().map(|e| (ModelKind::VisionText, e)));
    listed
        .flat_map(|(kind, entry)| {
            [false, true]
                .into_iter()
                .map(move |opt| ModelCase::new(kind, entry.clone(), opt))
        })
        .collect()
}
