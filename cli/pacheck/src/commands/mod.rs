//! CLI command implementations.

pub mod cases;
pub mod run;
pub mod synth;
pub mod verify;

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::ValueEnum;
use pacheck_harness::{load_model_list, precommit_cases, ModelCase};
use pacheck_verify::ReferenceTables;

use crate::manifest::PacheckManifest;

/// Output format of verification reports.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    #[default]
    Human,
    Json,
}

/// Load reference tables from an explicit path or the manifest.
pub fn load_references(
    project_dir: &Path,
    manifest: Option<&PacheckManifest>,
    explicit: Option<&Path>,
) -> Result<ReferenceTables> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => match manifest.and_then(|m| m.references_path(project_dir)) {
            Some(path) => path,
            None => bail!("no reference tables: pass --references or set [references] path"),
        },
    };
    ReferenceTables::load(&path).with_context(|| format!("loading {}", path.display()))
}

/// The precommit matrix from the manifest's model lists.
pub fn manifest_cases(project_dir: &Path, manifest: &PacheckManifest) -> Result<Vec<ModelCase>> {
    let text = read_list(manifest.text_models(project_dir))?;
    let vision = read_list(manifest.vision_models(project_dir))?;
    if text.is_empty() && vision.is_empty() {
        bail!("no models listed: set [models] text and/or vision in pacheck.toml");
    }
    Ok(precommit_cases(&text, &vision))
}

fn read_list(path: Option<PathBuf>) -> Result<Vec<pacheck_harness::ModelEntry>> {
    match path {
        Some(path) => Ok(load_model_list(&path)?),
        None => Ok(Vec::new()),
    }
}
