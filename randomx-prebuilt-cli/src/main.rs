//! download-librandomx - stage prebuilt librandomx binaries
//!
//! Resets `build/`, downloads the librandomx C API release archives, unpacks
//! them into `build/<platform>` and removes shared libraries. Run it once
//! before compiling; the build itself then needs no network access.

mod error;

use std::process::ExitCode;

use clap::Parser;
use randomx_prebuilt::{HttpFetcher, StageConfig, StageReport, Stager};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::error::CliError;

/// Download and stage prebuilt librandomx binaries into ./build.
#[derive(Debug, Parser)]
#[command(name = "download-librandomx", version, about)]
struct Cli {
    /// Log every extracted and removed file.
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = init_logging(cli.verbose) {
        eprintln!("{}", e.report());
        return ExitCode::FAILURE;
    }

    match run() {
        Ok(report) => {
            print_summary(&report);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{}", e.report());
            ExitCode::FAILURE
        }
    }
}

/// Install the fmt subscriber; `RUST_LOG` takes precedence over `--verbose`.
fn init_logging(verbose: bool) -> Result<(), CliError> {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "randomx_prebuilt={level},download_librandomx={level}",
            level = default_level
        ))
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init()
        .map_err(|e| CliError::Logging(e.to_string()))
}

fn run() -> Result<StageReport, CliError> {
    let config = StageConfig::default();
    tracing::info!(
        output = %config.output_dir.display(),
        releases = config.releases.len(),
        "Staging librandomx"
    );
    let fetcher = match config.timeout {
        Some(timeout) => HttpFetcher::with_timeout(timeout)?,
        None => HttpFetcher::new()?,
    };
    let report = Stager::new(config, fetcher).run()?;
    Ok(report)
}

fn print_summary(report: &StageReport) {
    for bundle in &report.bundles {
        println!(
            "{:<16} {} ({} files)",
            bundle.platform_id,
            bundle.path.display(),
            bundle.files_extracted
        );
    }
    println!(
        "Fetched {} bytes, removed {} shared libraries",
        report.bytes_fetched(),
        report.removed.len()
    );
}
