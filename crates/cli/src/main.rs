//! AgriSight CLI
//!
//! Diagnoses crop photos from the command line, using the hosted classifier
//! when online and the bundled model otherwise.

mod report;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use cloud_bridge::{smart_analyzer, CloudConfig};
use diagnosis_core::{ConnectivityMode, DiagnosisConfig, ImageInput, LocalClassifier, ModelStatus};
use report::{collect_images, DiagnosisReport};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    "\ncommit: ",
    env!("BUILT_GIT_COMMIT_HASH"),
    "\nbuilt:  ",
    env!("BUILT_TIME_UTC")
);

#[derive(Parser)]
#[command(name = "agrisight")]
#[command(version, long_version = LONG_VERSION)]
#[command(about = "Crop disease diagnosis with online/offline model selection", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Diagnose a photo, or every photo under a directory
    Diagnose {
        /// Image file or directory
        path: PathBuf,

        /// Always try the hosted classifier first
        #[arg(long, conflicts_with = "offline")]
        online: bool,

        /// Never contact the hosted classifier
        #[arg(long)]
        offline: bool,

        /// Local model directory (overrides AGRISIGHT_MODEL_DIR)
        #[arg(long)]
        model_dir: Option<PathBuf>,

        /// Hosted inference endpoint (overrides AGRISIGHT_ENDPOINT)
        #[arg(long)]
        endpoint: Option<String>,

        /// Pretty-print JSON output
        #[arg(long)]
        pretty: bool,
    },

    /// Load the local model and report its status
    Model {
        /// Local model directory (overrides AGRISIGHT_MODEL_DIR)
        #[arg(long)]
        model_dir: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Diagnose {
            path,
            online,
            offline,
            model_dir,
            endpoint,
            pretty,
        } => {
            let mut config = DiagnosisConfig::from_env();
            if let Some(dir) = model_dir {
                config.model_dir = dir;
            }
            if online {
                config.connectivity = ConnectivityMode::Online;
            } else if offline {
                config.connectivity = ConnectivityMode::Offline;
            }

            let mut cloud = CloudConfig::from_env();
            if let Some(endpoint) = endpoint {
                cloud.endpoint = endpoint;
            }

            diagnose(path, config, cloud, pretty).await
        }
        Commands::Model { model_dir } => {
            let dir = model_dir.unwrap_or_else(|| DiagnosisConfig::from_env().model_dir);
            let status = LocalClassifier::new(&dir).load().await;
            print_json(&status, true)?;

            if let ModelStatus::Failed { reason } = status {
                anyhow::bail!("Local model in {} is unusable: {}", dir.display(), reason);
            }
            Ok(())
        }
    }
}

async fn diagnose(
    path: PathBuf,
    config: DiagnosisConfig,
    cloud: CloudConfig,
    pretty: bool,
) -> Result<()> {
    let images = collect_images(&path)?;
    if images.is_empty() {
        warn!("No images found under {}", path.display());
        return Ok(());
    }

    let local = Arc::new(LocalClassifier::new(&config.model_dir));
    local.load().await;
    let analyzer = smart_analyzer(local, &config, cloud)?;

    info!("Diagnosing {} image(s)", images.len());
    for file in images {
        let bytes = match tokio::fs::read(&file).await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("Skipping {}: {}", file.display(), e);
                continue;
            }
        };

        let result = analyzer.analyze(&ImageInput::from_bytes(bytes)).await;
        print_json(&DiagnosisReport::new(file, result), pretty)?;
    }
    Ok(())
}

fn print_json<T: Serialize>(value: &T, pretty: bool) -> Result<()> {
    let json = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    }
    .context("Failed to serialize output")?;
    println!("{}", json);
    Ok(())
}
