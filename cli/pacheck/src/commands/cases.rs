//! `pacheck cases`: list the precommit matrix.

use std::path::Path;

use anyhow::Result;
use pacheck_harness::ModelCase;

use crate::commands::manifest_cases;
use crate::manifest::PacheckManifest;

pub fn run(project_dir: &Path, manifest: &PacheckManifest) -> Result<()> {
    for case in manifest_cases(project_dir, manifest)? {
        println!("{}", describe(&case));
    }
    Ok(())
}

fn describe(case: &ModelCase) -> String {
    match case.entry.mark {
        Some(mark) => format!(
            "{}  ({mark}: {})",
            case.case_id(),
            case.entry.reason.as_deref().unwrap_or("")
        ),
        None => case.case_id(),
    }
}
