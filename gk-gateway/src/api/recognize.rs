//! Recognition endpoint: the edge uploads one plate-region image per request

use crate::api::ApiError;
use crate::AppState;
use axum::{
    body::Bytes,
    extract::{multipart::MultipartRejection, Multipart, State},
    Json,
};
use gk_common::api::{RecognitionEvent, RecognitionResponse, Verdict};
use image::DynamicImage;
use tracing::{debug, info};

/// Multipart field carrying the JPEG bytes
pub const IMAGE_FIELD: &str = "image";

/// POST /recognize
///
/// While the gate is cooling down the request is answered immediately,
/// without reading the image or running OCR. Otherwise the image is decoded,
/// the best plate candidate is run through the access gate and the outcome
/// is recorded in the history. Bad uploads are rejected with 400 and leave
/// no history entry.
pub async fn recognize(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<RecognitionResponse>, ApiError> {
    if state.gate.is_cooling_down().await {
        debug!("Gate cooling down, upload rejected without OCR");
        return Ok(Json(RecognitionResponse::cooling_down()));
    }

    let multipart = multipart
        .map_err(|e| ApiError::BadRequest(format!("expected multipart upload: {}", e.body_text())))?;
    let bytes = read_image_field(multipart).await?;
    let image = decode_upload(bytes).await?;

    let result = state.recognizer.recognize(&image).await?;
    let Some(best) = result.into_best() else {
        info!("No plate detected");
        state
            .history
            .record(RecognitionEvent::new(None, 0.0, Verdict::NoPlate))
            .await;
        return Ok(Json(RecognitionResponse::no_plate()));
    };

    let decision = state.gate.decide(Some(&best.text)).await?;
    info!(
        plate = %best.text,
        confidence = best.confidence,
        verdict = decision.verdict.as_str(),
        "Access decision"
    );

    state
        .history
        .record(RecognitionEvent::new(
            Some(best.text.clone()),
            best.confidence,
            decision.verdict,
        ))
        .await;

    Ok(Json(RecognitionResponse::decided(
        &best.text,
        best.confidence,
        decision.verdict,
    )))
}

async fn read_image_field(mut multipart: Multipart) -> Result<Bytes, ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("malformed multipart body: {}", e.body_text())))?
    {
        if field.name() != Some(IMAGE_FIELD) {
            continue;
        }
        let data = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(format!("unreadable image field: {}", e.body_text())))?;
        if data.is_empty() {
            return Err(ApiError::BadRequest("empty image".to_string()));
        }
        return Ok(data);
    }
    Err(ApiError::BadRequest("no image provided".to_string()))
}

/// Decode on the blocking pool; JPEG decoding is CPU-bound
async fn decode_upload(bytes: Bytes) -> Result<DynamicImage, ApiError> {
    tokio::task::spawn_blocking(move || gk_common::imaging::decode_image(&bytes))
        .await
        .map_err(|e| ApiError::Internal(format!("decoder task failed: {}", e)))?
        .map_err(|e| ApiError::BadRequest(format!("invalid image: {}", e)))
}
