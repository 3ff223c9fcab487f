#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI entry point for the Copilot metrics ingestion service.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use copilot_metrics_ingest::{Ingestor, config, initialize_storage, open_repository, scheduler};
use copilot_metrics_ingest_models::{IngestConfig, RunKind};

#[derive(Parser)]
#[command(
    name = "copilot_metrics_ingest",
    about = "GitHub Copilot metrics ingestion service"
)]
struct Cli {
    /// TOML configuration file. Environment variables override its values.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run every ingestion now, then on its schedule until interrupted
    Run,
    /// Run the metrics ingestion once
    Metrics,
    /// Run the seats ingestion once
    Seats,
    /// Run the usage ingestion once
    Usage,
    /// Initialize the configured storage and exit
    Init,
    /// Print the effective configuration with secrets redacted
    Config,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init();

    let cli = Cli::parse();
    let config = config::load(cli.config.as_deref())?;

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Config => {
            print!("{}", toml::to_string_pretty(&config.redacted())?);
        }
        Commands::Init => {
            let Some(repository) = copilot_metrics_database::from_config(&config.storage).await?
            else {
                log::warn!("No storage configured, nothing to initialize");
                return Ok(());
            };
            initialize_storage(repository.as_ref()).await?;
            log::info!("Storage {} initialized", repository.name());
        }
        Commands::Metrics => run_once(&config, RunKind::Metrics).await?,
        Commands::Seats => run_once(&config, RunKind::Seats).await?,
        Commands::Usage => run_once(&config, RunKind::Usage).await?,
        Commands::Run => {
            log::info!("Starting Copilot metrics ingestion");
            let repository = open_repository(&config.storage).await;
            let ingestor = Ingestor::connect(&config, repository).await?;

            scheduler::run_until(&ingestor, &config.schedule, scheduler::shutdown_signal()).await;

            ingestor.close().await;
            log::info!("Shutdown complete");
        }
    }

    Ok(())
}

async fn run_once(config: &IngestConfig, kind: RunKind) -> Result<(), Box<dyn std::error::Error>> {
    let repository = open_repository(&config.storage).await;
    let ingestor = Ingestor::connect(config, repository).await?;

    let result = ingestor.run(kind).await;
    ingestor.close().await;

    let report = result?;
    println!("{report}");
    Ok(())
}
