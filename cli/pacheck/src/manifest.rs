//! `pacheck.toml` manifest parsing.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use pacheck_harness::RetryPolicy;
use pacheck_verify::VerifyConfig;
use serde::{Deserialize, Serialize};

pub const MANIFEST_NAME: &str = "pacheck.toml";

/// The top-level manifest of a verification project.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PacheckManifest {
    /// Verifier settings.
    #[serde(default)]
    pub verification: VerifyConfig,
    /// Reference delta tables.
    #[serde(default)]
    pub references: Option<ReferencesConfig>,
    /// Model list files for the precommit matrix.
    #[serde(default)]
    pub models: ModelsConfig,
    /// Stored graphs.
    #[serde(default)]
    pub graphs: Option<GraphsConfig>,
    #[serde(default)]
    pub retry: RetryPolicy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferencesConfig {
    pub path: PathBuf,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelsConfig {
    /// Text-only model list.
    #[serde(default)]
    pub text: Option<PathBuf>,
    /// Vision-and-text model list.
    #[serde(default)]
    pub vision: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphsConfig {
    /// Root holding `text/` and `vlm/` graph directories.
    pub dir: PathBuf,
}

impl PacheckManifest {
    /// Search upward from `start_dir` for a `pacheck.toml`, parse it and
    /// return it with the directory it was found in.
    pub fn find_and_load(start_dir: &Path) -> Result<Option<(Self, PathBuf)>> {
        let mut dir = start_dir.to_path_buf();
        loop {
            let candidate = dir.join(MANIFEST_NAME);
            if candidate.is_file() {
                let content = std::fs::read_to_string(&candidate)
                    .with_context(|| format!("reading {}", candidate.display()))?;
                let manifest: PacheckManifest = toml::from_str(&content)
                    .with_context(|| format!("parsing {}", candidate.display()))?;
                return Ok(Some((manifest, dir)));
            }
            if !dir.pop() {
                break;
            }
        }
        Ok(None)
    }

    #[cfg(test)]
    pub fn from_str(s: &str) -> Result<Self> {
        toml::from_str(s).context("parsing pacheck.toml")
    }

    pub fn references_path(&self, project_dir: &Path) -> Option<PathBuf> {
        self.references
            .as_ref()
            .map(|r| resolve(project_dir, &r.path))
    }

    pub fn graphs_dir(&self, project_dir: &Path) -> Option<PathBuf> {
        self.graphs.as_ref().map(|g| resolve(project_dir, &g.dir))
    }

    pub fn text_models(&self, project_dir: &Path) -> Option<PathBuf> {
        self.models.text.as_ref().map(|p| resolve(project_dir, p))
    }

    pub fn vision_models(&self, project_dir: &Path) -> Option<PathBuf> {
        self.models.vision.as_ref().map(|p| resolve(project_dir, p))
    }
}

/// Interpret `path` relative to the manifest directory.
fn resolve(project_dir: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        project_dir.join(path)
    }
}
