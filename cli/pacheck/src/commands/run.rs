//! `pacheck run`: the precommit matrix.

use std::path::Path;

use anyhow::{bail, Result};
use pacheck_harness::{FileGraphProvider, Runner};
use pacheck_verify::TransformationVerifier;

use crate::commands::{load_references, manifest_cases};
use crate::manifest::PacheckManifest;

/// Run every listed case whose id contains `filter`.
pub fn run(project_dir: &Path, manifest: &PacheckManifest, filter: Option<&str>) -> Result<()> {
    let mut cases = manifest_cases(project_dir, manifest)?;
    if let Some(filter) = filter {
        cases.retain(|c| c.case_id().contains(filter));
    }
    if cases.is_empty() {
        bail!("no cases match the filter");
    }

    let references = load_references(project_dir, Some(manifest), None)?;
    let graphs = manifest
        .graphs_dir(project_dir)
        .unwrap_or_else(|| project_dir.join("graphs"));
    let verifier =
        TransformationVerifier::new(references).with_config(manifest.verification.clone());
    let provider = FileGraphProvider::new(graphs);
    let runner = Runner::new(&verifier, &provider).with_retry_policy(manifest.retry);

    let run = runner.run_matrix(&cases);
    for result in &run.results {
        println!("{result}");
    }
    println!();
    println!("{}", run.summary);

    if run.summary.failed > 0 {
        bail!("{} of {} case(s) failed", run.summary.failed, run.summary.total());
    }
    Ok(())
}
