//! Fleetsnap Binary Entry Point
//!
//! This binary runs one fleet collection pass and writes the HTML report.
//! Core functionality is provided by the `fleetsnap` library crate.

use std::path::PathBuf;

use clap::Parser;
use fleetsnap::{
    CancelSource,
    config::{AppConfig, FleetDefaults, load_fleet},
    model::DeviceKind,
    report::{HtmlReport, ReportSink},
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Fleetsnap - Fleet Inventory Snapshot Collector
#[derive(Parser, Debug)]
#[command(name = "fleetsnap", version, about, long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(
        short,
        long,
        default_value = "configs/config.yaml",
        env = "FLEETSNAP_CONFIG"
    )]
    config: PathBuf,

    /// Path to the fleet CSV file
    #[arg(short, long, env = "FLEETSNAP_FLEET")]
    fleet: PathBuf,

    /// Device kind for fleet files without a kind column
    /// (switch, bmc, hypervisor)
    #[arg(short, long, env = "FLEETSNAP_KIND")]
    kind: Option<DeviceKind>,

    /// Report output path (overrides config file)
    #[arg(short, long, env = "FLEETSNAP_OUTPUT")]
    output: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,fleetsnap=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Fleetsnap - Fleet Inventory Snapshot Collector");

    // Parse CLI arguments
    let cli = Cli::parse();

    // Load configuration from file
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let mut config = AppConfig::load(&cli.config)?;

    // Apply CLI/env overrides (CLI > ENV > config file)
    if let Some(output) = cli.output {
        config.report.output_path = output;
    }

    // Load the fleet
    tracing::info!("Loading fleet from: {}", cli.fleet.display());
    let fleet = load_fleet(
        &cli.fleet,
        &FleetDefaults {
            kind: cli.kind,
            timeout: config.engine.default_timeout,
        },
    )?;
    tracing::info!("Fleet loaded: {} devices", fleet.len());

    // Build the engine and wire cancellation to process signals
    let engine = config.build_engine()?;
    let cancel = CancelSource::new();
    let token = cancel.token();
    tokio::spawn(async move {
        shutdown_signal().await;
        tracing::info!("Cancelling collection, completed records will be kept");
        cancel.cancel();
    });

    // Collect and report
    let results = engine.collect_with_cancel(&fleet, token).await?;
    tracing::info!(
        "Collection complete: {} records, {} not accessible",
        results.len(),
        results.failure_count()
    );

    let report = HtmlReport::new(&config.report.output_path, &config.report.title);
    let path = report.write(&results)?;
    tracing::info!("Report written to: {}", path.display());

    Ok(())
}

/// Wait for an interrupt or terminate signal.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C signal");
        }
        _ = terminate => {
            tracing::info!("Received terminate signal");
        }
    }
}
