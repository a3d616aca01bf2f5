//! pacheck: checks that the SDPA to paged-attention rewrite of a stateful
//! decoder graph produces the expected structure.

mod commands;
mod manifest;

use std::path::{Path, PathBuf};
use std::process;

use anyhow::Context;
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use pacheck_harness::ModelKind;
use pacheck_transform::Device;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use commands::ReportFormat;
use manifest::PacheckManifest;

#[derive(Parser)]
#[command(
    name = "pacheck",
    version,
    about = "Paged-attention transformation checks"
)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
    /// Log line format
    #[arg(long, value_enum, default_value_t = LogFormat::Text, global = true)]
    log_format: LogFormat,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Verify one model in one optimization mode
    Verify {
        /// Model id, as used in the reference tables
        #[arg(long)]
        model: String,
        /// Model family (text, vlm)
        #[arg(long, default_value = "text")]
        kind: ModelKind,
        /// Enable every optional paged-attention feature
        #[arg(long)]
        optimizations: bool,
        /// Serialized graph (default: <graphs>/<kind>/<model>.json)
        #[arg(long)]
        graph: Option<PathBuf>,
        /// Reference table file (default: [references] path)
        #[arg(long)]
        references: Option<PathBuf>,
        /// Compilation device (CPU, GPU, NPU)
        #[arg(long)]
        device: Option<Device>,
        /// Report format
        #[arg(long, value_enum, default_value_t = ReportFormat::Human)]
        report: ReportFormat,
    },
    /// Run the precommit matrix listed in pacheck.toml
    Run {
        /// Only run cases whose id contains this text
        #[arg(long)]
        filter: Option<String>,
    },
    /// List the precommit matrix
    Cases,
    /// Write a synthetic stateful decoder graph
    Synth {
        /// Number of attention layers
        #[arg(long, default_value_t = 2)]
        layers: usize,
        /// Output file (default: stdout)
        #[arg(long)]
        output: Option<PathBuf>,
        /// Leave head count and size off the attention nodes
        #[arg(long)]
        no_head_metadata: bool,
    },
}

fn main() {
    let cli = Cli::parse();

    let result = setup_logging(cli.verbose, cli.log_format).and_then(|()| run(cli));
    if let Err(e) = result {
        eprintln!("error: {e:#}");
        process::exit(1);
    }
}

fn setup_logging(verbose: u8, format: LogFormat) -> anyhow::Result<()> {
    let level = match verbose {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        _ => LevelFilter::DEBUG,
    };
    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    match format {
        LogFormat::Json => tracing::subscriber::set_global_default(builder.json().finish()),
        LogFormat::Text => tracing::subscriber::set_global_default(builder.compact().finish()),
    }
    .context("installing log subscriber")
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let cwd = std::env::current_dir()?;

    match cli.command {
        Commands::Verify {
            model,
            kind,
            optimizations,
            graph,
            references,
            device,
            report,
        } => {
            let (manifest, project_dir) = load_manifest_optional(&cwd)?;
            let project_dir = project_dir.unwrap_or(cwd);
            commands::verify::run(
                &project_dir,
                manifest.as_ref(),
                commands::verify::VerifyArgs {
                    model: &model,
                    kind,
                    optimizations,
                    graph: graph.as_deref(),
                    references: references.as_deref(),
                    device,
                    report,
                },
            )
        }
        Commands::Run { filter } => {
            let (manifest, project_dir) = load_manifest_required(&cwd)?;
            commands::run::run(&project_dir, &manifest, filter.as_deref())
        }
        Commands::Cases => {
            let (manifest, project_dir) = load_manifest_required(&cwd)?;
            commands::cases::run(&project_dir, &manifest)
        }
        Commands::Synth {
            layers,
            output,
            no_head_metadata,
        } => commands::synth::run(layers, !no_head_metadata, output.as_deref()),
    }
}

fn load_manifest_required(cwd: &Path) -> anyhow::Result<(PacheckManifest, PathBuf)> {
    match PacheckManifest::find_and_load(cwd)? {
        Some((manifest, dir)) => Ok((manifest, dir)),
        None => anyhow::bail!(
            "no {} found in this or any parent directory",
            manifest::MANIFEST_NAME
        ),
    }
}

fn load_manifest_optional(
    cwd: &Path,
) -> anyhow::Result<(Option<PacheckManifest>, Option<PathBuf>)> {
    match PacheckManifest::find_and_load(cwd)? {
        Some((manifest, dir)) => Ok((Some(manifest), Some(dir))),
        None => Ok((None, None)),
    }
}
