//! `pacheck verify`: check one model in one optimization mode.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use pacheck_core::Graph;
use pacheck_harness::{
    load_graph, with_retry, FileGraphProvider, GraphProvider, HarnessError, ModelCase, ModelEntry,
    ModelKind,
};
use pacheck_transform::Device;
use pacheck_verify::TransformationVerifier;

use crate::commands::{load_references, ReportFormat};
use crate::manifest::PacheckManifest;

pub struct VerifyArgs<'a> {
    pub model: &'a str,
    pub kind: ModelKind,
    pub optimizations: bool,
    /// Serialized graph; defaults to the stored graph for the case.
    pub graph: Option<&'a Path>,
    pub references: Option<&'a Path>,
    pub device: Option<Device>,
    pub report: ReportFormat,
}

/// Verify one case and print its report.
pub fn run(
    project_dir: &Path,
    manifest: Option<&PacheckManifest>,
    args: VerifyArgs<'_>,
) -> Result<()> {
    if let Some(path) = args.graph {
        if !path.is_file() {
            bail!("graph file not found: {}", path.display());
        }
    }

    let references = load_references(project_dir, manifest, args.references)?;
    let mut config = manifest
        .map(|m| m.verification.clone())
        .unwrap_or_default();
    if let Some(device) = args.device {
        config.device = device;
    }
    let retry = manifest.map(|m| m.retry).unwrap_or_default();
    let verifier = TransformationVerifier::new(references).with_config(config);

    let case = ModelCase::new(
        args.kind,
        ModelEntry::new(args.model, ""),
        args.optimizations,
    );
    let source = match args.graph {
        Some(path) => GraphSource::File(path.to_path_buf()),
        None => {
            let dir = manifest
                .and_then(|m| m.graphs_dir(project_dir))
                .unwrap_or_else(|| project_dir.join("graphs"));
            GraphSource::Stored(FileGraphProvider::new(dir))
        }
    };

    let report = with_retry(&retry, |_| {
        let mut graph = source.load(&case)?;
        Ok(verifier.verify(case.model_id(), &mut graph, &case.flags())?)
    })
    .with_context(|| format!("verifying {}", case.case_id()))?;

    match args.report {
        ReportFormat::Json => println!("{}", report.to_json()?),
        ReportFormat::Human => println!("{report}"),
    }
    Ok(())
}

enum GraphSource {
    File(PathBuf),
    Stored(FileGraphProvider),
}

impl GraphSource {
    fn load(&self, case: &ModelCase) -> Result<Graph, HarnessError> {
        match self {
            GraphSource::Stored(provider) => Ok(provider.provide(case)?),
            GraphSource::File(path) => Ok(load_graph(path, case.model_id())?),
        }
    }
}
