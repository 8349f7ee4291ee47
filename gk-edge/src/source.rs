//! Camera frame sources
//!
//! The camera is opaque to the edge node: something produces frames and
//! [`FrameSource`] hands them out one at a time.

use crate::{Error, Result};
use async_trait::async_trait;
use image::DynamicImage;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp"];

/// Outcome of one read attempt
#[derive(Debug)]
pub enum FrameRead {
    Frame(DynamicImage),
    /// Nothing new yet; poll again later
    NotReady,
    /// The source will never yield another frame
    Exhausted,
}

#[async_trait]
pub trait FrameSource: Send {
    async fn next_frame(&mut self) -> Result<FrameRead>;
}

/// Directory the camera (or a snapshot agent) drops frames into.
///
/// Image files are handed out in file name order, each exactly once.
/// Files that fail to decode are skipped with a warning. With
/// `exit_when_idle` the source reports [`FrameRead::Exhausted`] once every
/// file present has been handed out; otherwise it keeps polling for new ones.
///
/// The only state kept between scans is the greatest path handed out so
/// far. Frame names must therefore increase (timestamps or counters); a
/// file that appears with a name at or below the watermark is ignored.
pub struct DirectoryFrameSource {
    dir: PathBuf,
    exit_when_idle: bool,
    watermark: Option<PathBuf>,
    pending: VecDeque<PathBuf>,
}

impl DirectoryFrameSource {
    pub fn open(dir: impl Into<PathBuf>, exit_when_idle: bool) -> Result<Self> {
        let dir = dir.into();
        if !dir.is_dir() {
            return Err(Error::Source(format!(
                "{} is not a readable directory",
                dir.display()
            )));
        }
        Ok(Self {
            dir,
            exit_when_idle,
            watermark: None,
            pending: VecDeque::new(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Greatest frame path handed out so far
    pub fn watermark(&self) -> Option<&Path> {
        self.watermark.as_deref()
    }

    /// Queue image files named after the watermark. Only called with an
    /// empty queue, so nothing queued can be found twice.
    async fn rescan(&mut self) -> Result<()> {
        let mut entries = tokio::fs::read_dir(&self.dir)
            .await
            .map_err(|e| Error::Source(format!("cannot list {}: {}", self.dir.display(), e)))?;

        let mut fresh = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if !has_image_extension(&path) {
                continue;
            }
            if self.watermark.as_ref().is_some_and(|mark| path <= *mark) {
                continue;
            }
            if entry.file_type().await?.is_file() {
                fresh.push(path);
            }
        }
        fresh.sort();
        debug!(new_files = fresh.len(), "Scanned frame directory");
        self.pending.extend(fresh);
        Ok(())
    }
}

#[async_trait]
impl FrameSource for DirectoryFrameSource {
    async fn next_frame(&mut self) -> Result<FrameRead> {
        loop {
            if self.pending.is_empty() {
                self.rescan().await?;
            }
            let Some(path) = self.pending.pop_front() else {
                return Ok(if self.exit_when_idle {
                    FrameRead::Exhausted
                } else {
                    FrameRead::NotReady
                });
            };
            self.watermark = Some(path.clone());

            let decode_path = path.clone();
            let decoded = tokio::task::spawn_blocking(move || image::open(decode_path))
                .await
                .map_err(|e| Error::Source(format!("decoder task failed: {}", e)))?;
            match decoded {
                Ok(frame) => return Ok(FrameRead::Frame(frame)),
                Err(e) => warn!("Skipping unreadable frame {}: {}", path.display(), e),
            }
        }
    }
}

fn has_image_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;

    fn write_frame(dir: &Path, name: &str, width: u32) {
        let img = DynamicImage::ImageRgb8(RgbImage::new(width, 4));
        img.save(dir.join(name)).unwrap();
    }

    async fn next_width(source: &mut DirectoryFrameSource) -> Option<u32> {
        match source.next_frame().await.unwrap() {
            FrameRead::Frame(f) => Some(f.width()),
            _ => None,
        }
    }

    #[tokio::test]
    async fn test_frames_in_name_order_each_once() {
        let dir = tempfile::tempdir().unwrap();
        write_frame(dir.path(), "frame_002.png", 2);
        write_frame(dir.path(), "frame_001.png", 1);
        std::fs::write(dir.path().join("notes.txt"), "not a frame").unwrap();

        let mut source = DirectoryFrameSource::open(dir.path(), true).unwrap();
        assert_eq!(next_width(&mut source).await, Some(1));
        assert_eq!(next_width(&mut source).await, Some(2));
        assert!(matches!(source.next_frame().await.unwrap(), FrameRead::Exhausted));
    }

    #[tokio::test]
    async fn test_new_files_picked_up_when_polling() {
        let dir = tempfile::tempdir().unwrap();
        let mut source = DirectoryFrameSource::open(dir.path(), false).unwrap();
        assert!(matches!(source.next_frame().await.unwrap(), FrameRead::NotReady));

        write_frame(dir.path(), "a.png", 3);
        assert_eq!(next_width(&mut source).await, Some(3));
        assert!(matches!(source.next_frame().await.unwrap(), FrameRead::NotReady));
    }

    #[tokio::test]
    async fn test_unreadable_frame_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.jpg"), b"truncated").unwrap();
        write_frame(dir.path(), "b.png", 5);

        let mut source = DirectoryFrameSource::open(dir.path(), true).unwrap();
        assert_eq!(next_width(&mut source).await, Some(5));
        assert!(matches!(source.next_frame().await.unwrap(), FrameRead::Exhausted));
    }

    #[tokio::test]
    async fn test_polling_keeps_only_a_watermark() {
        let dir = tempfile::tempdir().unwrap();
        let mut source = DirectoryFrameSource::open(dir.path(), false).unwrap();
        assert_eq!(source.watermark(), None);

        for i in 0..20 {
            write_frame(dir.path(), &format!("frame_{:03}.png", i), 1);
        }
        for _ in 0..20 {
            assert_eq!(next_width(&mut source).await, Some(1));
        }
        assert!(matches!(source.next_frame().await.unwrap(), FrameRead::NotReady));
        assert_eq!(source.watermark(), Some(dir.path().join("frame_019.png").as_path()));
        assert!(source.pending.is_empty());

        // Drained frames may be removed by the camera without being re-read
        for i in 0..20 {
            std::fs::remove_file(dir.path().join(format!("frame_{:03}.png", i))).unwrap();
        }
        write_frame(dir.path(), "frame_005.png", 7);
        write_frame(dir.path(), "frame_020.png", 9);
        std::fs::create_dir(dir.path().join("frame_030.png")).unwrap();

        assert_eq!(next_width(&mut source).await, Some(9));
        assert!(matches!(source.next_frame().await.unwrap(), FrameRead::NotReady));
        assert_eq!(source.watermark(), Some(dir.path().join("frame_020.png").as_path()));
    }

    #[test]
    fn test_missing_directory_is_rejected() {
        let result = DirectoryFrameSource::open("/nonexistent/gk-frames", false);
        assert!(matches!(result, Err(Error::Source(_))));
    }
}
