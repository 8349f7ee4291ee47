//! Plate recognition: external OCR + candidate extraction and ranking
//!
//! The OCR model is a black box behind [`OcrEngine`]. [`OcrRecognizer`]
//! adds the server-side time budget and turns raw fragments into a ranked
//! [`RecognitionResult`].

use async_trait::async_trait;
use gk_common::config::OcrConfig;
use gk_common::external::ExternalCommand;
use gk_common::{extract_candidates, rank_candidates, OcrFragment, RecognitionResult};
use image::DynamicImage;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum RecognitionError {
    #[error("OCR engine failed: {0}")]
    Engine(String),

    #[error("OCR did not finish within {0:?}")]
    Timeout(Duration),
}

impl From<gk_common::Error> for RecognitionError {
    fn from(err: gk_common::Error) -> Self {
        match err {
            gk_common::Error::Timeout(d) => RecognitionError::Timeout(d),
            other => RecognitionError::Engine(other.to_string()),
        }
    }
}

/// Raw OCR: image in, text fragments out
#[async_trait]
pub trait OcrEngine: Send + Sync {
    async fn read_text(&self, image: &DynamicImage) -> Result<Vec<OcrFragment>, RecognitionError>;
}

/// Image → ranked plate candidates
#[async_trait]
pub trait Recognizer: Send + Sync {
    async fn recognize(&self, image: &DynamicImage) -> Result<RecognitionResult, RecognitionError>;
}

/// OCR engine living in an external process (see [`gk_common::external`]).
///
/// The bridge receives the language list in `GK_OCR_LANGUAGES`
/// (comma-separated) and GPU selection in `GK_OCR_GPU` (`0`/`1`), and prints
/// a JSON array of `{text, confidence, region?}`.
pub struct CommandOcrEngine {
    command: ExternalCommand,
}

impl CommandOcrEngine {
    pub fn from_config(config: &OcrConfig) -> gk_common::Result<Self> {
        // The recognizer enforces the real budget; this one only reaps a stuck child
        let reap_after = config.timeout() + Duration::from_secs(1);
        let command = ExternalCommand::new(config.command.clone(), reap_after)?
            .env("GK_OCR_LANGUAGES", config.languages.join(","))
            .env("GK_OCR_GPU", if config.gpu { "1" } else { "0" });
        Ok(Self { command })
    }
}

#[async_trait]
impl OcrEngine for CommandOcrEngine {
    async fn read_text(&self, image: &DynamicImage) -> Result<Vec<OcrFragment>, RecognitionError> {
        Ok(self.command.run_on_image(image).await?)
    }
}

/// [`Recognizer`] over any [`OcrEngine`], bounded by a timeout
pub struct OcrRecognizer {
    engine: Arc<dyn OcrEngine>,
    timeout: Duration,
}

impl OcrRecognizer {
    pub fn new(engine: Arc<dyn OcrEngine>, timeout: Duration) -> Self {
        Self { engine, timeout }
    }
}

#[async_trait]
impl Recognizer for OcrRecognizer {
    async fn recognize(&self, image: &DynamicImage) -> Result<RecognitionResult, RecognitionError> {
        let fragments = tokio::time::timeout(self.timeout, self.engine.read_text(image))
            .await
            .map_err(|_| RecognitionError::Timeout(self.timeout))??;

        debug!(fragments = fragments.len(), "OCR returned");
        let result = rank_candidates(extract_candidates(&fragments));
        if let Some(best) = result.best() {
            debug!(
                plate = %best.text,
                confidence = best.confidence,
                candidates = result.len(),
                "Best plate candidate"
            );
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;

    struct FixedOcr(Vec<OcrFragment>);

    #[async_trait]
    impl OcrEngine for FixedOcr {
        async fn read_text(&self, _image: &DynamicImage) -> Result<Vec<OcrFragment>, RecognitionError> {
            Ok(self.0.clone())
        }
    }

    struct StuckOcr;

    #[async_trait]
    impl OcrEngine for StuckOcr {
        async fn read_text(&self, _image: &DynamicImage) -> Result<Vec<OcrFragment>, RecognitionError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(Vec::new())
        }
    }

    fn blank() -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::new(8, 8))
    }

    #[tokio::test]
    async fn test_ranks_extracted_fragments() {
        let engine = FixedOcr(vec![
            OcrFragment::new("京", 0.99),
            OcrFragment::new("AB1234", 0.90),
            OcrFragment::new("AB1 2345", 0.40),
            OcrFragment::new("CD12", 0.99),
        ]);
        let recognizer = OcrRecognizer::new(Arc::new(engine), Duration::from_secs(1));

        let result = recognizer.recognize(&blank()).await.unwrap();
        let texts: Vec<_> = result.candidates().iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["AB12345", "AB1234", "CD12"]);
    }

    #[tokio::test]
    async fn test_no_fragments_is_empty_result() {
        let recognizer = OcrRecognizer::new(Arc::new(FixedOcr(Vec::new())), Duration::from_secs(1));
        assert!(recognizer.recognize(&blank()).await.unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stuck_engine_times_out() {
        let recognizer = OcrRecognizer::new(Arc::new(StuckOcr), Duration::from_secs(5));
        let err = recognizer.recognize(&blank()).await.unwrap_err();
        assert!(matches!(err, RecognitionError::Timeout(d) if d == Duration::from_secs(5)));
    }

    #[test]
    fn test_common_timeout_maps_to_recognition_timeout() {
        let err: RecognitionError = gk_common::Error::Timeout(Duration::from_secs(2)).into();
        assert!(matches!(err, RecognitionError::Timeout(_)));

        let err: RecognitionError = gk_common::Error::External("boom".into()).into();
        assert!(matches!(err, RecognitionError::Engine(_)));
    }
}
