//! Error types for the edge node

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// Camera source could not be opened or listed
    #[error("Camera source error: {0}")]
    Source(String),

    #[error("Plate localization failed: {0}")]
    Locator(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Common(#[from] gk_common::Error),
}
