//! gk-gateway - gatekeeper PC service
//!
//! Serves the recognition endpoint for edge devices plus the whitelist
//! management and history APIs. The `vehicles` subcommands manage the
//! whitelist database directly from the gatekeeper PC.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::extract::DefaultBodyLimit;
use clap::{Parser, Subcommand};
use gk_common::config::{load_config, resolve_config_file, GatewayConfig};
use gk_common::PlateCode;
use gk_gateway::db::{init_database, SqliteWhitelist};
use gk_gateway::recognizer::{CommandOcrEngine, OcrRecognizer};
use gk_gateway::whitelist::{WhitelistError, WhitelistStore};
use gk_gateway::{build_router, AppState};
use tokio::signal;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

/// Command-line arguments for gk-gateway
#[derive(Parser, Debug)]
#[command(name = "gk-gateway")]
#[command(about = "License plate access gateway")]
#[command(version)]
struct Args {
    /// TOML configuration file (falls back to $GK_GATEWAY_CONFIG, then the platform config dir)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Address to bind
    #[arg(long, env = "GK_HOST")]
    host: Option<String>,

    /// Port to listen on
    #[arg(short, long, env = "GK_PORT")]
    port: Option<u16>,

    /// Whitelist database file
    #[arg(long, env = "GK_DATABASE")]
    database: Option<PathBuf>,

    /// Seconds during which all recognitions are rejected after a pass
    #[arg(long, env = "GK_COOLDOWN_SECS")]
    cooldown_secs: Option<u64>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP service (default)
    Serve,
    /// Manage the whitelist database
    #[command(subcommand)]
    Vehicles(VehiclesCommand),
}

#[derive(Subcommand, Debug)]
enum VehiclesCommand {
    /// List whitelisted plates
    List,
    /// Whitelist a plate
    Add {
        plate: String,
        #[arg(short, long, default_value = "")]
        note: String,
    },
    /// Remove a plate from the whitelist
    Remove { plate: String },
}

impl Args {
    fn into_config(self) -> Result<(GatewayConfig, Option<Command>)> {
        let path = resolve_config_file(self.config.as_deref(), "GK_GATEWAY_CONFIG", "gateway.toml");
        let mut config: GatewayConfig = load_config(path.as_deref())?;

        if let Some(host) = self.host {
            config.host = host;
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(database) = self.database {
            config.database_path = database;
        }
        if let Some(cooldown) = self.cooldown_secs {
            config.cooldown_secs = cooldown;
        }

        config.validate()?;
        Ok((config, self.command))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gk_gateway=info,tower_http=info".into()),
        )
        .init();

    info!(
        "Starting gk-gateway v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let (config, command) = Args::parse().into_config()?;

    let pool = init_database(&config.database_path)
        .await
        .with_context(|| format!("Failed to open {}", config.database_path.display()))?;
    let whitelist: Arc<dyn WhitelistStore> = Arc::new(SqliteWhitelist::new(pool));

    match command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config, whitelist).await,
        Command::Vehicles(cmd) => manage_vehicles(cmd, whitelist.as_ref()).await,
    }
}

async fn serve(config: GatewayConfig, whitelist: Arc<dyn WhitelistStore>) -> Result<()> {
    let engine = CommandOcrEngine::from_config(&config.ocr).context("Invalid OCR configuration")?;
    let recognizer = OcrRecognizer::new(Arc::new(engine), config.ocr.timeout());
    info!(
        "OCR bridge: {:?} (languages {:?}, gpu {}, timeout {:?})",
        config.ocr.command,
        config.ocr.languages,
        config.ocr.gpu,
        config.ocr.timeout()
    );

    let state = AppState::new(
        whitelist,
        Arc::new(recognizer),
        config.cooldown(),
        config.history_capacity,
    );
    info!("Cooldown window: {:?}", config.cooldown());

    let mut app = build_router(state)
        .layer(DefaultBodyLimit::max(config.max_upload_bytes))
        .layer(TraceLayer::new_for_http());
    if config.cors_enabled {
        app = app.layer(CorsLayer::permissive());
    }

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    info!("gk-gateway listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

async fn manage_vehicles(cmd: VehiclesCommand, whitelist: &dyn WhitelistStore) -> Result<()> {
    match cmd {
        VehiclesCommand::List => {
            let entries = whitelist.list_all().await?;
            for entry in &entries {
                println!("{}\t{}", entry.plate, entry.note);
            }
            println!("{} vehicle(s)", entries.len());
        }
        VehiclesCommand::Add { plate, note } => {
            let plate = PlateCode::normalize(&plate)
                .with_context(|| format!("Invalid plate {:?}", plate))?;
            match whitelist.add(&plate, note.trim()).await {
                Ok(()) => println!("Added {}", plate),
                Err(WhitelistError::AlreadyExists(p)) => {
                    error!("Plate {} already exists", p);
                    anyhow::bail!("plate {} already exists", p);
                }
                Err(e) => return Err(e.into()),
            }
        }
        VehiclesCommand::Remove { plate } => {
            let plate = PlateCode::normalize(&plate)
                .with_context(|| format!("Invalid plate {:?}", plate))?;
            if whitelist.remove(&plate).await? {
                println!("Removed {}", plate);
            } else {
                println!("{} was not whitelisted", plate);
            }
        }
    }
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
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

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_config_path_env_is_left_to_file_resolution() {
        let command = Args::command();
        let config = command
            .get_arguments()
            .find(|arg| arg.get_id() == "config")
            .unwrap();
        assert_eq!(config.get_env(), None);

        let args = Args::try_parse_from(["gk-gateway"]).unwrap();
        assert_eq!(args.config, None);
    }
}
