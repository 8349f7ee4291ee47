//! Configuration loading and config file resolution

use crate::{Error, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// Config file resolution following this priority order:
/// 1. Command-line argument (highest priority)
/// 2. Environment variable
/// 3. Platform config directory (`<config dir>/gatekeeper/<file_name>`)
///
/// Returns `None` when no file applies; callers then use compiled defaults.
pub fn resolve_config_file(
    cli_arg: Option<&Path>,
    env_var_name: &str,
    file_name: &str,
) -> Option<PathBuf> {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(env_var_name) {
        if !path.is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    // Priority 3: Platform config directory, only if the file exists
    dirs::config_dir()
        .map(|d| d.join("gatekeeper").join(file_name))
        .filter(|p| p.exists())
}

/// Load a TOML config, or defaults when `path` is `None`.
///
/// An explicitly named file that does not exist is an error.
pub fn load_config<T>(path: Option<&Path>) -> Result<T>
where
    T: DeserializeOwned + Default,
{
    let Some(path) = path else {
        debug!("No config file found, using compiled defaults");
        return Ok(T::default());
    };

    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Cannot read {}: {}", path.display(), e)))?;
    let config = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Invalid TOML in {}: {}", path.display(), e)))?;
    info!("Loaded configuration from {}", path.display());
    Ok(config)
}

/// Get OS-dependent default data folder for the gateway database
pub fn default_data_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("gatekeeper"))
        .unwrap_or_else(|| PathBuf::from("./gatekeeper_data"))
}

// ============================================================================
// Gateway
// ============================================================================

/// Gatekeeper PC configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub host: String,
    pub port: u16,
    pub database_path: PathBuf,
    /// Suppression window after an allowed pass
    pub cooldown_secs: u64,
    /// Number of recognition events kept for `/latest` and `/recent`
    pub history_capacity: usize,
    pub cors_enabled: bool,
    pub max_upload_bytes: usize,
    pub ocr: OcrConfig,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            database_path: default_data_folder().join("vehicles.db"),
            cooldown_secs: 10,
            history_capacity: 20,
            cors_enabled: true,
            max_upload_bytes: 4 * 1024 * 1024,
            ocr: OcrConfig::default(),
        }
    }
}

impl GatewayConfig {
    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(self.cooldown_secs)
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn validate(&self) -> Result<()> {
        if self.port == 0 {
            return Err(Error::Config("port must be non-zero".to_string()));
        }
        if self.history_capacity == 0 {
            return Err(Error::Config("history_capacity must be at least 1".to_string()));
        }
        if self.max_upload_bytes == 0 {
            return Err(Error::Config("max_upload_bytes must be non-zero".to_string()));
        }
        self.ocr.validate()
    }
}

/// External OCR model invocation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    /// argv of the OCR bridge; receives a PNG on stdin, prints JSON fragments
    pub command: Vec<String>,
    /// Model language selection passed through to the bridge
    pub languages: Vec<String>,
    pub gpu: bool,
    pub timeout_secs: u64,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            command: vec!["gk-ocr-bridge".to_string()],
            languages: vec!["ch_sim".to_string(), "en".to_string()],
            gpu: false,
            timeout_secs: 15,
        }
    }
}

impl OcrConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn validate(&self) -> Result<()> {
        if self.command.is_empty() || self.command[0].trim().is_empty() {
            return Err(Error::Config("ocr.command must name a program".to_string()));
        }
        if self.timeout_secs == 0 {
            return Err(Error::Config("ocr.timeout_secs must be non-zero".to_string()));
        }
        Ok(())
    }
}

// ============================================================================
// Edge
// ============================================================================

/// Camera node configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EdgeConfig {
    /// Full URL of the gateway recognition endpoint
    pub gateway_url: String,
    pub upload_timeout_secs: u64,
    pub jpeg_quality: u8,
    /// Process every Nth frame
    pub frame_skip: u64,
    /// Camera source identifier: directory the camera drops frames into
    pub camera_source: PathBuf,
    pub poll_interval_ms: u64,
    /// Stop once the camera source has been drained
    pub exit_when_idle: bool,
    /// Log loop statistics every N frames (0 disables)
    pub stats_interval: u64,
    pub save_crops: bool,
    pub save_path: PathBuf,
    /// Persistent log file, written alongside stderr (empty disables)
    pub log_file: PathBuf,
    pub locator: LocatorConfig,
}

impl Default for EdgeConfig {
    fn default() -> Self {
        Self {
            gateway_url: "http://192.168.1.100:5000/recognize".to_string(),
            upload_timeout_secs: 5,
            jpeg_quality: 90,
            frame_skip: 3,
            camera_source: PathBuf::from("./frames"),
            poll_interval_ms: 100,
            exit_when_idle: false,
            stats_interval: 30,
            save_crops: false,
            save_path: PathBuf::from("./crops"),
            log_file: PathBuf::from("./logs/gk-edge.log"),
            locator: LocatorConfig::default(),
        }
    }
}

impl EdgeConfig {
    pub fn upload_timeout(&self) -> Duration {
        Duration::from_secs(self.upload_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn log_file(&self) -> Option<&Path> {
        if self.log_file.as_os_str().is_empty() {
            None
        } else {
            Some(&self.log_file)
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.gateway_url.trim().is_empty() {
            return Err(Error::Config("gateway_url must be set".to_string()));
        }
        if self.upload_timeout_secs == 0 {
            return Err(Error::Config("upload_timeout_secs must be non-zero".to_string()));
        }
        if !(1..=100).contains(&self.jpeg_quality) {
            return Err(Error::Config(format!(
                "jpeg_quality must be 1-100, got {}",
                self.jpeg_quality
            )));
        }
        if self.frame_skip == 0 {
            return Err(Error::Config("frame_skip must be at least 1".to_string()));
        }
        self.locator.validate()
    }
}

/// Plate localization model invocation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LocatorConfig {
    /// argv of the detector bridge; when absent the whole frame is uploaded
    pub command: Option<Vec<String>>,
    /// Detections below this score are dropped
    pub confidence_threshold: f32,
    pub timeout_secs: u64,
}

impl Default for LocatorConfig {
    fn default() -> Self {
        Self {
            command: None,
            confidence_threshold: 0.5,
            timeout_secs: 10,
        }
    }
}

impl LocatorConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(cmd) = &self.command {
            if cmd.is_empty() || cmd[0].trim().is_empty() {
                return Err(Error::Config("locator.command must name a program".to_string()));
            }
        }
        if !(0.0..=1.0).contains(&self.confidence_threshold) {
            return Err(Error::Config(
                "locator.confidence_threshold must be within 0-1".to_string(),
            ));
        }
        if self.timeout_secs == 0 {
            return Err(Error::Config("locator.timeout_secs must be non-zero".to_string()));
        }
        Ok(())
    }
}
