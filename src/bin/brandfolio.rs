//! Generates a branded PDF from a JSON config and a JSON content tree.
//!
//! ```bash
//! brandfolio --config folio.json --content content.json
//! brandfolio --config folio.json --content content.json --report out/report.json
//! ```

use anyhow::{Context, Result};
use brandfolio::{ContentInput, GenerationConfig, ValidationOutcome, generate};
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Two-pass branded PDF generation
#[derive(Parser, Debug)]
#[command(name = "brandfolio")]
#[command(version, about, long_about = None)]
struct Args {
    /// Generation config (JSON)
    #[arg(short, long)]
    config: PathBuf,

    /// Content tree with headings (JSON)
    #[arg(long)]
    content: PathBuf,

    /// Override the config's output path
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Write the report here instead of printing it
    #[arg(long)]
    report: Option<PathBuf>,

    /// Skip the validation loop
    #[arg(long)]
    no_validate: bool,
}

fn run(args: Args) -> Result<ValidationOutcome> {
    let mut config = GenerationConfig::from_json_path(&args.config)
        .with_context(|| format!("loading config {}", args.config.display()))?;
    if let Some(output) = args.output {
        config.output_path = output;
    }
    if args.no_validate {
        config.validation.enabled = false;
    }
    if config.source_path.is_none() {
        config.source_path = Some(args.content.clone());
    }
    let (tree, headings) = ContentInput::from_json_path(&args.content)
        .with_context(|| format!("loading content {}", args.content.display()))?;

    let report = generate(&config, &tree, &headings)?;
    match &args.report {
        Some(path) => report
            .write_json(path)
            .with_context(|| format!("writing report {}", path.display()))?,
        None => println!("{}", report.to_json()?),
    }
    if report.outcome == ValidationOutcome::Failed {
        tracing::warn!(
            errors = report.error_count(),
            attempts = report.attempts,
            "validation failed; best attempt written"
        );
    }
    Ok(report.outcome)
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    match run(Args::parse()) {
        Ok(_) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!("{err:#}");
            ExitCode::from(1)
        }
    }
}
