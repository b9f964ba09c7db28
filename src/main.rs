//! crm-engine - Capacitance-Resistance Model service
//!
//! Serves injector/producer connectivity ratios and production forecasts
//! over HTTP from a sled record store.
//!
//! # Usage
//!
//! ```bash
//! # Seed the store from a JSON dataset
//! crm-engine import --file dataset.json
//!
//! # Serve (default subcommand)
//! crm-engine serve --addr 127.0.0.1:8080
//!
//! # Encrypt a coordinate for a dataset (chacha codec)
//! crm-engine encrypt --value 45.123
//! ```
//!
//! # Environment Variables
//!
//! - `CRM_CONFIG`: path to the TOML config (default: ./crm_config.toml)
//! - `CRM_SERVER_ADDR`: bind address, same as `--addr`
//! - `CRM_COORDINATE_KEY`: 64 hex char coordinate key (name set by `codec.key_env`)
//! - `RUST_LOG`: logging level (default: info)

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crm_engine::api::{create_app, ApiState};
use crm_engine::codec::{self, ChaChaCoordinateCodec};
use crm_engine::config::{self, CrmConfig, StorageBackend};
use crm_engine::forecasting::{default_forecaster, SeriesForecaster};
use crm_engine::storage::{CrmRepository, Dataset, InMemoryRepository, SledRepository};
use crm_engine::CrmEngine;

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "crm-engine")]
#[command(about = "CRM connectivity and production forecasting service")]
#[command(version)]
struct CliArgs {
    #[command(subcommand)]
    command: Option<SubCommand>,

    /// Serve options when no subcommand is given
    #[command(flatten)]
    serve: ServeArgs,
}

#[derive(clap::Args, Debug)]
struct ServeArgs {
    /// Override the server address (default: `server.addr` from config)
    #[arg(short, long, env = "CRM_SERVER_ADDR")]
    addr: Option<String>,

    /// Dataset to preload when `storage.backend = "memory"`
    #[arg(long, value_name = "FILE")]
    dataset: Option<PathBuf>,
}

#[derive(clap::Subcommand, Debug)]
enum SubCommand {
    /// Serve the HTTP API (default)
    Serve(ServeArgs),

    /// Import a JSON dataset into the sled store
    Import {
        /// Dataset file: { wells, horizons, links, measurings, wellData, skinFactors }
        #[arg(long, value_name = "FILE")]
        file: PathBuf,

        /// Remove existing records first
        #[arg(long)]
        replace: bool,
    },

    /// Encrypt a coordinate with the configured key
    Encrypt {
        #[arg(long, allow_hyphen_values = true)]
        value: f64,
    },
}

// ============================================================================
// Commands
// ============================================================================

fn open_repository(cfg: &CrmConfig, dataset: Option<&PathBuf>) -> Result<Arc<dyn CrmRepository>> {
    match cfg.storage.backend {
        StorageBackend::Sled => {
            let store = SledRepository::open(&cfg.storage.path)
                .with_context(|| format!("Failed to open store at {}", cfg.storage.path.display()))?;
            Ok(Arc::new(store))
        }
        StorageBackend::Memory => {
            let repo = match dataset {
                Some(path) => {
                    let dataset = Dataset::load(path)?;
                    info!(records = dataset.record_count(), path = %path.display(), "Dataset loaded into memory");
                    InMemoryRepository::from_dataset(&dataset)
                }
                None => InMemoryRepository::new(),
            };
            Ok(Arc::new(repo))
        }
    }
}

async fn run_serve(cfg: &CrmConfig, args: ServeArgs) -> Result<()> {
    let server_addr = args.addr.unwrap_or_else(|| cfg.server.addr.clone());

    let repo = open_repository(cfg, args.dataset.as_ref())?;
    let codec = codec::from_config(&cfg.codec).context("Failed to build coordinate codec")?;
    let forecaster = default_forecaster(cfg.forecast.timeout_ms);
    info!(
        backend = repo.backend_name(),
        forecaster = forecaster.name(),
        codec = ?cfg.codec.mode,
        "Engine ready"
    );

    let engine = Arc::new(CrmEngine::new(repo, codec, forecaster, cfg.clone()));
    let app = create_app(ApiState::new(engine));

    let listener = tokio::net::TcpListener::bind(&server_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", server_addr))?;
    info!("HTTP server listening on {}", server_addr);

    // Graceful shutdown via Ctrl+C
    let cancel_token = CancellationToken::new();
    let shutdown_token = cancel_token.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("Received Ctrl+C, initiating shutdown...");
        shutdown_token.cancel();
    });

    let result = axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            cancel_token.cancelled().await;
            info!("[HttpServer] Received shutdown signal");
        })
        .await;

    match result {
        Ok(()) => {
            info!("[HttpServer] Graceful shutdown complete");
            Ok(())
        }
        Err(e) => {
            error!("[HttpServer] Server error: {}", e);
            Err(anyhow::anyhow!("HTTP server error: {}", e))
        }
    }
}

fn run_import(cfg: &CrmConfig, file: &PathBuf, replace: bool) -> Result<()> {
    let dataset = Dataset::load(file)?;
    let store = SledRepository::open(&cfg.storage.path)
        .with_context(|| format!("Failed to open store at {}", cfg.storage.path.display()))?;
    if replace {
        store.clear().context("Failed to clear store")?;
    }
    let written = store.import_dataset(&dataset).context("Dataset import failed")?;
    info!(records = written, path = %file.display(), "Import complete");
    Ok(())
}

fn run_encrypt(cfg: &CrmConfig, value: f64) -> Result<()> {
    let key_hex = cfg
        .codec
        .resolve_key_hex()
        .with_context(|| format!("No coordinate key: set codec.key_hex or ${}", cfg.codec.key_env))?;
    let codec = ChaChaCoordinateCodec::from_hex(&key_hex).context("Invalid coordinate key")?;
    println!("{}", codec.encrypt_number(value).context("Encryption failed")?);
    Ok(())
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let args = CliArgs::parse();

    let crm_config = CrmConfig::load();
    crm_config
        .validate()
        .context("Invalid CRM configuration")?;
    config::init(crm_config);
    let cfg = config::get();

    match args.command.unwrap_or(SubCommand::Serve(args.serve)) {
        SubCommand::Serve(serve) => run_serve(cfg, serve).await,
        SubCommand::Import { file, replace } => run_import(cfg, &file, replace),
        SubCommand::Encrypt { value } => run_encrypt(cfg, value),
    }
}
