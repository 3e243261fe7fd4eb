//! optrun-ip (Initial Population) - seed store builder
//!
//! Selects the best candidates of one or more optimizer result stores and
//! writes them into a new store used as the initial population of a
//! subsequent optimization run.

use anyhow::{bail, Context, Result};
use clap::Parser;
use optrun_common::config::{load_toml_config, resolve_config_path, CONFIG_ENV_VAR};
use optrun_ip::merge::discard_output;
use optrun_ip::{generate, MergeReport, MergeRequest};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::info;

/// Command-line arguments for optrun-ip
#[derive(Parser, Debug)]
#[command(name = "optrun-ip")]
#[command(about = "Build an initial population store from optimization results")]
#[command(version)]
struct Args {
    /// Source stores as path[:iteration[:candidateIndex]]
    #[arg(value_name = "SOURCE")]
    sources: Vec<String>,

    /// Output store (must not exist)
    #[arg(short, long, value_name = "FILE")]
    output: PathBuf,

    /// Number of candidates to take from each source
    #[arg(short, long, env = "OPTRUN_NBEST", value_parser = clap::value_parser!(u32).range(1..))]
    nbest: Option<u32>,

    /// Configuration file
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Lock wait on busy stores (milliseconds)
    #[arg(long, env = "OPTRUN_BUSY_TIMEOUT_MS")]
    busy_timeout_ms: Option<u64>,

    /// Require identical metadata columns across sources
    #[arg(long)]
    strict_metadata: bool,

    /// Select and validate only; do not write the output store
    #[arg(long)]
    dry_run: bool,

    /// Export the merge report as JSON; if this fails the output store is removed
    #[arg(long, value_name = "FILE")]
    report: Option<PathBuf>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let args = Args::parse();

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<()> {
    let config_path = resolve_config_path(args.config.as_deref(), CONFIG_ENV_VAR);
    let loaded = load_toml_config(config_path.as_deref());

    let level = loaded
        .as_ref()
        .map(|(c, _)| c.logging.level.clone())
        .unwrap_or_else(|_| "info".to_string());

    // Logs go to stderr; stdout carries the confirmation line
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&level)),
        )
        .with_writer(std::io::stderr)
        .init();

    info!(
        "Starting optrun-ip v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let (config, source) = loaded.context("Failed to load configuration")?;
    source.log();

    let nbest = args.nbest.unwrap_or(config.merge.nbest);
    if nbest == 0 {
        bail!("nbest must be a positive integer");
    }

    let request = MergeRequest {
        sources: args.sources,
        output: args.output,
        nbest,
        busy_timeout_ms: args.busy_timeout_ms.unwrap_or(config.store.busy_timeout_ms),
        synchronous_off: config.store.synchronous_off,
        strict_metadata: args.strict_metadata || config.merge.strict_metadata,
        dry_run: args.dry_run,
    };

    let report = generate(&request).await?;

    // A failed report export leaves no output store behind
    if let Some(path) = &args.report {
        if let Err(e) = report.export_json(path) {
            if !report.dry_run {
                discard_output(&report.output);
            }
            return Err(e)
                .with_context(|| format!("Failed to export report to {}", path.display()));
        }
        info!("Report written to {}", path.display());
    }

    if report.dry_run {
        print_picks(&report);
    } else {
        println!(
            "Written initial population to `{}'",
            report.output.display()
        );
    }

    Ok(())
}

fn print_picks(report: &MergeReport) {
    for source in &report.sources {
        println!("{}", source.spec);
        for pick in &source.picks {
            println!("  iteration {:>6}  index {:>4}", pick.iteration, pick.index);
        }
    }
    println!(
        "{} candidates from {} sources (dry run, nothing written)",
        report.total_picks(),
        report.sources.len()
    );
}
