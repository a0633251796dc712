//! cabundle-sync - copy CA bundles into API and webhook registrations.
//!
//! Runs a single synchronization pass and exits. Intended to be scheduled as
//! a CronJob:
//! - Initializes structured logging
//! - Loads the binding configuration
//! - Creates the Kubernetes client
//! - Applies every binding, exiting non-zero if any failed

use std::path::PathBuf;

use clap::Parser;
use tracing::{error, info};

use cabundle_sync::{Configuration, KubeCluster, Processor};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the JSON binding configuration
    #[arg(long, env = "CABUNDLE_SYNC_CONFIG")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("cabundle_sync=info".parse()?)
                .add_directive("kube=warn".parse()?),
        )
        .json()
        .init();

    let config = Configuration::load(&cli.config).inspect_err(|e| {
        error!(path = %cli.config.display(), error = %e, "Error loading config");
    })?;
    info!(
        path = %cli.config.display(),
        bindings = config.len(),
        "Loaded configuration"
    );

    let cluster = KubeCluster::try_default().await.inspect_err(|e| {
        error!(error = %e, "Error building Kubernetes client");
    })?;

    let processor = Processor::new(cluster);
    processor.run(&config).await.inspect_err(|e| {
        error!(failed = e.len(), error = %e, "Synchronization failed");
    })?;

    info!("All bindings applied");
    Ok(())
}
