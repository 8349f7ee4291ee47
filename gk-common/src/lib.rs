//! # Gatekeeper Common Library
//!
//! Shared code for the gateway and edge binaries:
//! - Plate codes and OCR candidate extraction/ranking
//! - Wire types exchanged between edge, gateway and operators
//! - Configuration loading
//! - External model bridge (image in, JSON out)
//! - Image encoding helpers

pub mod api;
pub mod config;
pub mod error;
pub mod external;
pub mod extract;
pub mod imaging;
pub mod plate;

pub use error::{Error, Result};
pub use extract::{extract_candidate, extract_candidates, rank_candidates, OcrFragment};
pub use plate::{Candidate, PlateCode, RecognitionResult};
