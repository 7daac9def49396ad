//! Book-Harvest main entry point
//!
//! This is the command-line interface for the catalog and quotes harvesting
//! pipeline.

use anyhow::Context;
use book_harvest::config::load_config;
use book_harvest::run_full_pipeline;
use clap::Parser;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Book-Harvest: scrape, enrich, store and export books and quotes
///
/// Book-Harvest reads a book catalog and a quotes collection, looks the
/// quoted authors up in a bibliographic search API, stores everything in a
/// normalized SQLite database and exports CSV and JSON views of it.
#[derive(Parser, Debug)]
#[command(name = "book-harvest")]
#[command(version = "1.0.0")]
#[command(about = "Catalog and quotes harvesting pipeline", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Seed for the synthetic assignments (overrides [random] seed)
    #[arg(long, value_name = "N")]
    seed: Option<u64>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let config = load_config(&cli.config)
        .with_context(|| format!("Failed to load configuration from {}", cli.config.display()))?;

    let mut rng = match cli.seed.or(config.random.seed) {
        Some(seed) => {
            tracing::info!("Using random seed {}", seed);
            StdRng::seed_from_u64(seed)
        }
        None => StdRng::from_entropy(),
    };

    let report = run_full_pipeline(&config, &mut rng)
        .await
        .context("Pipeline failed")?;

    let incomplete = report.phases().filter(|p| !p.is_complete()).count();
    if incomplete > 0 {
        tracing::warn!("{} phase(s) did not complete, see the log above", incomplete);
    }
    if let Some(export) = &report.export {
        for file in &export.files {
            tracing::info!("Wrote {}", file.display());
        }
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("book_harvest=info,warn"),
            1 => EnvFilter::new("book_harvest=debug,info"),
            2 => EnvFilter::new("book_harvest=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}
