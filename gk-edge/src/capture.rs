//! Capture loop: frame → locate → crop → upload, until cancelled
//!
//! Only every `frame_skip`-th frame is processed. Upload failures are
//! logged and the loop moves on; a failing source ends the loop.

use crate::locator::{crop_regions, PlateLocator};
use crate::source::{FrameRead, FrameSource};
use crate::upload::UploadClient;
use crate::Result;
use chrono::Local;
use gk_common::config::EdgeConfig;
use image::DynamicImage;
use std::path::PathBuf;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Loop counters, logged periodically and on exit
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CaptureStats {
    pub frames: u64,
    /// Processed frames with at least one plate region
    pub detections: u64,
    /// Uploads the gateway answered
    pub uploads: u64,
    pub upload_failures: u64,
}

/// Loop tuning taken from [`EdgeConfig`]
#[derive(Debug, Clone)]
pub struct CaptureSettings {
    pub frame_skip: u64,
    pub poll_interval: Duration,
    pub stats_interval: u64,
    /// Directory for debug copies of each crop
    pub save_crops: Option<PathBuf>,
}

impl From<&EdgeConfig> for CaptureSettings {
    fn from(config: &EdgeConfig) -> Self {
        Self {
            frame_skip: config.frame_skip.max(1),
            poll_interval: config.poll_interval(),
            stats_interval: config.stats_interval,
            save_crops: config.save_crops.then(|| config.save_path.clone()),
        }
    }
}

pub struct CaptureLoop<S> {
    source: S,
    locator: Box<dyn PlateLocator>,
    uploader: UploadClient,
    settings: CaptureSettings,
    stats: CaptureStats,
}

impl<S: FrameSource> CaptureLoop<S> {
    pub fn new(
        source: S,
        locator: Box<dyn PlateLocator>,
        uploader: UploadClient,
        settings: CaptureSettings,
    ) -> Self {
        Self {
            source,
            locator,
            uploader,
            settings,
            stats: CaptureStats::default(),
        }
    }

    pub fn stats(&self) -> CaptureStats {
        self.stats
    }

    /// Run until `cancel` fires or the source is exhausted
    pub async fn run(&mut self, cancel: CancellationToken) -> Result<CaptureStats> {
        if let Some(dir) = &self.settings.save_crops {
            tokio::fs::create_dir_all(dir).await?;
        }
        info!(
            "Capture loop started: uploading to {}, processing every {} frame(s)",
            self.uploader.endpoint(),
            self.settings.frame_skip
        );

        loop {
            let read = tokio::select! {
                _ = cancel.cancelled() => {
                    info!("Capture loop cancelled");
                    break;
                }
                read = self.source.next_frame() => read?,
            };

            match read {
                FrameRead::Frame(frame) => self.on_frame(frame).await,
                FrameRead::NotReady => {
                    tokio::select! {
                        _ = cancel.cancelled() => {
                            info!("Capture loop cancelled");
                            break;
                        }
                        _ = tokio::time::sleep(self.settings.poll_interval) => {}
                    }
                }
                FrameRead::Exhausted => {
                    info!("Camera source exhausted");
                    break;
                }
            }
        }

        self.log_stats("Final statistics");
        Ok(self.stats)
    }

    async fn on_frame(&mut self, frame: DynamicImage) {
        self.stats.frames += 1;
        let frames = self.stats.frames;

        if self.settings.stats_interval > 0 && frames % self.settings.stats_interval == 0 {
            self.log_stats("Statistics");
        }
        if frames % self.settings.frame_skip != 0 {
            return;
        }

        let detections = match self.locator.locate(&frame).await {
            Ok(d) => d,
            Err(e) => {
                warn!("Plate localization failed on frame {}: {}", frames, e);
                return;
            }
        };
        let crops = crop_regions(&frame, &detections);
        if crops.is_empty() {
            return;
        }
        self.stats.detections += 1;
        info!("Detected {} plate region(s)", crops.len());

        for (i, crop) in crops.iter().enumerate() {
            if let Some(dir) = &self.settings.save_crops {
                save_crop(dir, crop, i).await;
            }
            if self.uploader.upload_and_log(crop).await {
                self.stats.uploads += 1;
            } else {
                self.stats.upload_failures += 1;
            }
        }
    }

    fn log_stats(&self, label: &str) {
        let s = &self.stats;
        info!(
            frames = s.frames,
            detections = s.detections,
            uploads = s.uploads,
            upload_failures = s.upload_failures,
            "{}",
            label
        );
    }
}

/// Debug copy of a crop; failures are logged and otherwise ignored
async fn save_crop(dir: &std::path::Path, crop: &DynamicImage, index: usize) {
    let stamp = Local::now().format("%Y%m%d_%H%M%S_%6f");
    let path = dir.join(format!("plate_{}_{}.jpg", stamp, index));
    let rgb = crop.to_rgb8();
    let target = path.clone();
    let saved = tokio::task::spawn_blocking(move || rgb.save(&target)).await;
    match saved {
        Ok(Ok(())) => debug!("Saved crop {}", path.display()),
        Ok(Err(e)) => warn!("Failed to save crop {}: {}", path.display(), e),
        Err(e) => warn!("Crop writer task failed: {}", e),
    }
}
