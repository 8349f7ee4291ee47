//! Error types for gk-gateway

use thiserror::Error;

/// Main error type for gk-gateway startup and plumbing
#[derive(Error, Debug)]
pub enum Error {
    /// Database connection or query errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience Result type using gk-gateway Error
pub type Result<T> = std::result::Result<T, Error>;
