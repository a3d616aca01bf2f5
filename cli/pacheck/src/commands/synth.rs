//! `pacheck synth`: write a synthetic stateful decoder graph.

use std::path::Path;

use anyhow::{Context, Result};
use pacheck_transform::DecoderSpec;

pub fn run(layers: usize, head_metadata: bool, output: Option<&Path>) -> Result<()> {
    let mut spec = DecoderSpec::new(layers);
    if !head_metadata {
        spec = spec.without_head_metadata();
    }
    let graph = spec.build().context("building synthetic decoder")?;
    let json = serde_json::to_string_pretty(&graph)?;

    match output {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("creating {}", parent.display()))?;
            }
            std::fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
            eprintln!(
                "wrote {} ({} nodes, {} inputs)",
                path.display(),
                graph.node_count(),
                graph.inputs().len()
            );
        }
        None => println!("{json}"),
    }
    Ok(())
}
