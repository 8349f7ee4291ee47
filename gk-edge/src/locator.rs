//! Plate localization and cropping

use crate::{Error, Result};
use async_trait::async_trait;
use gk_common::config::LocatorConfig;
use gk_common::external::ExternalCommand;
use image::{DynamicImage, GenericImageView};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Axis-aligned plate box in frame pixel coordinates, as emitted by the detector
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
    pub confidence: f32,
}

#[async_trait]
pub trait PlateLocator: Send + Sync {
    async fn locate(&self, frame: &DynamicImage) -> Result<Vec<Detection>>;
}

/// Treats the whole frame as the plate region (camera already framed on the plate)
pub struct WholeFrameLocator;

#[async_trait]
impl PlateLocator for WholeFrameLocator {
    async fn locate(&self, frame: &DynamicImage) -> Result<Vec<Detection>> {
        let (w, h) = frame.dimensions();
        Ok(vec![Detection {
            x1: 0.0,
            y1: 0.0,
            x2: w as f32,
            y2: h as f32,
            confidence: 1.0,
        }])
    }
}

/// Detector model in an external process.
///
/// The command receives the frame as PNG on stdin and prints a JSON array of
/// [`Detection`]s. Detections scoring below the threshold are dropped.
pub struct CommandLocator {
    command: ExternalCommand,
    confidence_threshold: f32,
}

impl CommandLocator {
    pub fn new(command: ExternalCommand, confidence_threshold: f32) -> Self {
        Self {
            command,
            confidence_threshold,
        }
    }
}

#[async_trait]
impl PlateLocator for CommandLocator {
    async fn locate(&self, frame: &DynamicImage) -> Result<Vec<Detection>> {
        let detections: Vec<Detection> = self
            .command
            .run_on_image(frame)
            .await
            .map_err(|e| Error::Locator(e.to_string()))?;
        let total = detections.len();
        let kept: Vec<_> = detections
            .into_iter()
            .filter(|d| d.confidence >= self.confidence_threshold)
            .collect();
        debug!(total, kept = kept.len(), "Detector returned");
        Ok(kept)
    }
}

/// Locator selected by configuration: external detector if one is configured
pub fn locator_from_config(config: &LocatorConfig) -> Result<Box<dyn PlateLocator>> {
    match &config.command {
        Some(argv) => {
            let command = ExternalCommand::new(argv.clone(), config.timeout())?;
            Ok(Box::new(CommandLocator::new(command, config.confidence_threshold)))
        }
        None => Ok(Box::new(WholeFrameLocator)),
    }
}

/// Crop every detection out of `frame`.
///
/// Coordinates are truncated to whole pixels and clamped to the frame;
/// boxes left with no area are dropped.
pub fn crop_regions(frame: &DynamicImage, detections: &[Detection]) -> Vec<DynamicImage> {
    let (width, height) = frame.dimensions();
    detections
        .iter()
        .filter_map(|d| {
            let x1 = clamp_coord(d.x1, width);
            let y1 = clamp_coord(d.y1, height);
            let x2 = clamp_coord(d.x2, width);
            let y2 = clamp_coord(d.y2, height);
            if x2 <= x1 || y2 <= y1 {
                debug!(?d, "Dropping degenerate plate box");
                return None;
            }
            Some(frame.crop_imm(x1, y1, x2 - x1, y2 - y1))
        })
        .collect()
}

fn clamp_coord(value: f32, limit: u32) -> u32 {
    if value.is_nan() || value <= 0.0 {
        0
    } else {
        (value as u32).min(limit)
    }
}
