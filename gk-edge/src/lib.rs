//! gk-edge library - camera node beside the barrier
//!
//! Pulls frames from the camera source, locates plate regions, crops them
//! and uploads each crop to the gateway for recognition.

pub mod capture;
pub mod error;
pub mod locator;
pub mod logging;
pub mod source;
pub mod upload;

pub use capture::{CaptureLoop, CaptureSettings, CaptureStats};
pub use error::{Error, Result};
pub use upload::{UploadClient, UploadError};
