//! Capture loop behavior with scripted frames and a counting gateway stub

use async_trait::async_trait;
use axum::{body::Bytes, extract::State, routing::post, Json, Router};
use gk_common::api::RecognitionResponse;
use gk_edge::locator::{Detection, PlateLocator, WholeFrameLocator};
use gk_edge::source::{FrameRead, FrameSource};
use gk_edge::{CaptureLoop, CaptureSettings, UploadClient};
use image::{DynamicImage, RgbImage};
use std::collections::VecDeque;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Fixed list of frames, then exhausted
struct ScriptedSource(VecDeque<DynamicImage>);

impl ScriptedSource {
    fn frames(n: usize) -> Self {
        Self((0..n).map(|_| DynamicImage::ImageRgb8(RgbImage::new(80, 40))).collect())
    }
}

#[async_trait]
impl FrameSource for ScriptedSource {
    async fn next_frame(&mut self) -> gk_edge::Result<FrameRead> {
        Ok(match self.0.pop_front() {
            Some(frame) => FrameRead::Frame(frame),
            None => FrameRead::Exhausted,
        })
    }
}

/// Camera that never produces anything
struct IdleSource;

#[async_trait]
impl FrameSource for IdleSource {
    async fn next_frame(&mut self) -> gk_edge::Result<FrameRead> {
        Ok(FrameRead::NotReady)
    }
}

/// Two plates per frame, one of them partly outside the frame
struct TwoPlates;

#[async_trait]
impl PlateLocator for TwoPlates {
    async fn locate(&self, _frame: &DynamicImage) -> gk_edge::Result<Vec<Detection>> {
        Ok(vec![
            Detection { x1: 5.0, y1: 5.0, x2: 35.0, y2: 15.0, confidence: 0.8 },
            Detection { x1: 60.0, y1: 30.0, x2: 120.0, y2: 60.0, confidence: 0.7 },
        ])
    }
}

async fn counting_gateway() -> (SocketAddr, Arc<AtomicUsize>) {
    async fn recognize(
        State(count): State<Arc<AtomicUsize>>,
        _body: Bytes,
    ) -> Json<RecognitionResponse> {
        count.fetch_add(1, Ordering::SeqCst);
        Json(RecognitionResponse::no_plate())
    }

    let count = Arc::new(AtomicUsize::new(0));
    let app = Router::new()
        .route("/recognize", post(recognize))
        .with_state(Arc::clone(&count));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (addr, count)
}

fn settings(frame_skip: u64, save_crops: Option<PathBuf>) -> CaptureSettings {
    CaptureSettings {
        frame_skip,
        poll_interval: Duration::from_millis(10),
        stats_interval: 0,
        save_crops,
    }
}

fn uploader(addr: SocketAddr) -> UploadClient {
    UploadClient::new(format!("http://{}/recognize", addr), Duration::from_secs(5), 90).unwrap()
}

#[tokio::test]
async fn test_only_every_nth_frame_is_uploaded() {
    let (addr, count) = counting_gateway().await;
    let mut capture = CaptureLoop::new(
        ScriptedSource::frames(7),
        Box::new(WholeFrameLocator),
        uploader(addr),
        settings(3, None),
    );

    let stats = capture.run(CancellationToken::new()).await.unwrap();
    assert_eq!(stats.frames, 7);
    assert_eq!(stats.detections, 2);
    assert_eq!(stats.uploads, 2);
    assert_eq!(count.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_every_region_is_uploaded_and_saved() {
    let (addr, count) = counting_gateway().await;
    let crops_dir = tempfile::tempdir().unwrap();
    let save_path = crops_dir.path().join("crops");
    let mut capture = CaptureLoop::new(
        ScriptedSource::frames(2),
        Box::new(TwoPlates),
        uploader(addr),
        settings(1, Some(save_path.clone())),
    );

    let stats = capture.run(CancellationToken::new()).await.unwrap();
    assert_eq!(stats.uploads, 4);
    assert_eq!(count.load(Ordering::SeqCst), 4);

    let saved: Vec<_> = std::fs::read_dir(&save_path)
        .unwrap()
        .map(|e| e.unwrap().file_name().into_string().unwrap())
        .collect();
    assert_eq!(saved.len(), 4);
    assert!(saved.iter().all(|n| n.starts_with("plate_") && n.ends_with(".jpg")));
}

#[tokio::test]
async fn test_upload_failures_do_not_stop_the_loop() {
    let refused = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap()
    };
    let mut capture = CaptureLoop::new(
        ScriptedSource::frames(3),
        Box::new(WholeFrameLocator),
        uploader(refused),
        settings(1, None),
    );

    let stats = capture.run(CancellationToken::new()).await.unwrap();
    assert_eq!(stats.frames, 3);
    assert_eq!(stats.uploads, 0);
    assert_eq!(stats.upload_failures, 3);
}

#[tokio::test]
async fn test_cancellation_stops_idle_loop() {
    let (addr, _) = counting_gateway().await;
    let mut capture = CaptureLoop::new(
        IdleSource,
        Box::new(WholeFrameLocator),
        uploader(addr),
        settings(1, None),
    );

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let stats = tokio::time::timeout(Duration::from_secs(5), capture.run(cancel))
        .await
        .expect("loop should stop on cancel")
        .unwrap();
    assert_eq!(stats.frames, 0);
}
