//! gk-edge - camera node
//!
//! Watches the camera source, crops plate regions and uploads them to the
//! gateway until Ctrl+C (or until the source is drained in batch mode).

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use gk_common::config::{load_config, resolve_config_file, EdgeConfig};
use gk_edge::locator::locator_from_config;
use gk_edge::logging::init_tracing;
use gk_edge::source::DirectoryFrameSource;
use gk_edge::{CaptureLoop, CaptureSettings, UploadClient};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Command-line arguments for gk-edge
#[derive(Parser, Debug)]
#[command(name = "gk-edge")]
#[command(about = "License plate camera node")]
#[command(version)]
struct Args {
    /// TOML configuration file (falls back to $GK_EDGE_CONFIG, then the platform config dir)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Gateway recognition endpoint URL
    #[arg(long, env = "GK_GATEWAY_URL")]
    gateway_url: Option<String>,

    /// Directory the camera writes frames into
    #[arg(long, env = "GK_CAMERA_SOURCE")]
    camera_source: Option<PathBuf>,

    /// Process every Nth frame
    #[arg(long)]
    frame_skip: Option<u64>,

    /// Stop once every frame in the camera source has been processed
    #[arg(long)]
    exit_when_idle: bool,

    /// Keep a JPEG copy of every crop in the configured save path
    #[arg(long)]
    save_crops: bool,

    /// Log file appended to alongside stderr (empty string disables)
    #[arg(long, env = "GK_EDGE_LOG_FILE")]
    log_file: Option<PathBuf>,
}

impl Args {
    fn into_config(self) -> Result<EdgeConfig> {
        let path = resolve_config_file(self.config.as_deref(), "GK_EDGE_CONFIG", "edge.toml");
        let mut config: EdgeConfig = load_config(path.as_deref())?;

        if let Some(url) = self.gateway_url {
            config.gateway_url = url;
        }
        if let Some(source) = self.camera_source {
            config.camera_source = source;
        }
        if let Some(skip) = self.frame_skip {
            config.frame_skip = skip;
        }
        config.exit_when_idle |= self.exit_when_idle;
        config.save_crops |= self.save_crops;
        if let Some(log_file) = self.log_file {
            config.log_file = log_file;
        }

        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Args::parse().into_config()?;
    init_tracing(config.log_file()).context("Failed to open log file")?;

    info!(
        "Starting gk-edge v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    if let Some(path) = config.log_file() {
        info!("Log file: {}", path.display());
    }
    info!("Gateway: {}", config.gateway_url);
    info!("Camera source: {}", config.camera_source.display());
    info!("Frame skip: process 1 of every {} frames", config.frame_skip);

    let source = DirectoryFrameSource::open(&config.camera_source, config.exit_when_idle)
        .context("Failed to open camera source")?;
    let locator = locator_from_config(&config.locator).context("Invalid locator configuration")?;
    let uploader = UploadClient::new(
        config.gateway_url.clone(),
        config.upload_timeout(),
        config.jpeg_quality,
    )
    .context("Failed to build HTTP client")?;

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Received Ctrl+C, stopping capture");
                on_signal.cancel();
            }
            Err(e) => warn!("Failed to listen for Ctrl+C: {}", e),
        }
    });

    let mut capture = CaptureLoop::new(source, locator, uploader, CaptureSettings::from(&config));
    capture.run(cancel).await.context("Capture loop failed")?;

    info!("gk-edge stopped");
    Ok(())
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

        let args = Args::try_parse_from(["gk-edge"]).unwrap();
        assert_eq!(args.config, None);
    }
}
