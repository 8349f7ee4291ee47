//! Recognition history endpoints

use crate::api::ApiError;
use crate::AppState;
use axum::{
    extract::{rejection::QueryRejection, Query, State},
    Json,
};
use gk_common::api::RecognitionEvent;
use serde::Deserialize;

const DEFAULT_RECENT_LIMIT: usize = 10;

#[derive(Debug, Deserialize)]
pub struct RecentQuery {
    pub limit: Option<usize>,
}

/// GET /latest - most recent event, or `null`
pub async fn latest(State(state): State<AppState>) -> Json<Option<RecognitionEvent>> {
    Json(state.history.latest().await)
}

/// GET /recent?limit=N - newest first, capped at the history capacity
pub async fn recent(
    State(state): State<AppState>,
    query: Result<Query<RecentQuery>, QueryRejection>,
) -> Result<Json<Vec<RecognitionEvent>>, ApiError> {
    let Query(query) = query.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let limit = query
        .limit
        .unwrap_or(DEFAULT_RECENT_LIMIT)
        .min(state.history.capacity());
    Ok(Json(state.history.recent(limit).await))
}
