//! dicomvault-server - DICOM study store
//!
//! Accepts batch uploads of DICOM files per study, answers metadata tag
//! queries and serves cached 8-bit grayscale PNG renderings.

use std::fs::OpenOptions;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use dicomvault_common::config::{
    default_config_path, load_toml_config, CompiledDefaults, RootFolderInitializer,
    RootFolderResolver, TomlConfig,
};
use dicomvault_server::store::Store;
use dicomvault_server::{build_router, AppState, MODULE_NAME};

/// Command-line arguments for dicomvault-server
#[derive(Parser, Debug)]
#[command(name = "dicomvault-server")]
#[command(about = "DICOM study store with metadata queries and PNG rendering")]
#[command(version)]
struct Args {
    /// Port to listen on
    #[arg(short, long, env = "DICOMVAULT_PORT")]
    port: Option<u16>,

    /// Address to bind to
    #[arg(short, long, env = "DICOMVAULT_BIND")]
    bind: Option<String>,

    /// Root folder holding files/dicom and files/png
    #[arg(short, long)]
    root_folder: Option<PathBuf>,

    /// TOML configuration file
    #[arg(short, long, env = "DICOMVAULT_CONFIG")]
    config: Option<PathBuf>,
}

/// Read the TOML file before logging exists; problems are reported once the
/// subscriber is up
fn load_bootstrap_config(path: Option<&Path>) -> (TomlConfig, Option<String>) {
    match path {
        Some(path) if path.exists() => match load_toml_config(path) {
            Ok(config) => (config, None),
            Err(e) => (TomlConfig::default(), Some(format!("{}; using defaults", e))),
        },
        _ => (TomlConfig::default(), None),
    }
}

fn init_tracing(config: &TomlConfig) -> Result<()> {
    let level = &config.logging.level;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("dicomvault_server={level},dicomvault_common={level},tower_http={level}").into()
    });

    match &config.logging.file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_ansi(false)
                        .with_writer(Mutex::new(file)),
                )
                .init();
        }
        None => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer())
                .init();
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config_path = args.config.clone().or_else(|| default_config_path(MODULE_NAME));
    let (toml_config, config_warning) = load_bootstrap_config(config_path.as_deref());

    init_tracing(&toml_config)?;

    // Build identification first, before any slow startup step
    info!(
        "Starting dicomvault-server v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );
    if let Some(warning) = config_warning {
        warn!("{}", warning);
    }

    let defaults = CompiledDefaults::for_current_platform();

    // Root folder: CLI > environment > TOML > compiled default
    let root_folder = RootFolderResolver::new(MODULE_NAME)
        .with_cli_override(args.root_folder.clone())
        .with_config_path(args.config.clone())
        .resolve();

    let initializer = RootFolderInitializer::new(root_folder);
    initializer
        .ensure_directory_exists()
        .context("Failed to initialize root folder")?;
    info!("DICOM files: {}", initializer.dicom_dir().display());
    info!("PNG cache: {}", initializer.png_dir().display());

    let store = Arc::new(Store::from_initializer(&initializer));
    let max_upload_bytes = toml_config
        .max_upload_bytes
        .unwrap_or(defaults.max_upload_bytes);
    let state = AppState::new(store, max_upload_bytes);
    let app = build_router(state);

    let port = args.port.or(toml_config.port).unwrap_or(defaults.port);
    let bind = args
        .bind
        .or(toml_config.bind_address)
        .unwrap_or(defaults.bind_address);
    let addr: SocketAddr = format!("{}:{}", bind, port)
        .parse()
        .with_context(|| format!("Invalid bind address {}:{}", bind, port))?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    info!("Listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!("Failed to install terminate handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
