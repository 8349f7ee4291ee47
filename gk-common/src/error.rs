//! Common error types for Gatekeeper

use thiserror::Error;

/// Common result type for Gatekeeper operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types shared by the gateway and the edge
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Image decode/encode error
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    /// External model process failed or produced unusable output
    #[error("External command error: {0}")]
    External(String),

    /// Operation exceeded its time budget
    #[error("Timed out after {0:?}")]
    Timeout(std::time::Duration),
}
