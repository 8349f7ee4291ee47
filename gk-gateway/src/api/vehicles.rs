//! Whitelist management endpoints

use crate::api::ApiError;
use crate::AppState;
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};
use gk_common::api::{NewVehicle, VehicleAck, VehicleEntry};
use gk_common::PlateCode;
use tracing::info;

/// GET /vehicles
pub async fn list_vehicles(
    State(state): State<AppState>,
) -> Result<Json<Vec<VehicleEntry>>, ApiError> {
    Ok(Json(state.whitelist.list_all().await?))
}

/// POST /vehicles - 409 if the plate is already whitelisted
pub async fn add_vehicle(
    State(state): State<AppState>,
    body: Result<Json<NewVehicle>, JsonRejection>,
) -> Result<Json<VehicleAck>, ApiError> {
    let Json(request) = body.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let plate = parse_plate(&request.plate)?;
    let note = request.note.trim();

    state.whitelist.add(&plate, note).await?;
    info!(plate = %plate, "Vehicle added to whitelist");

    Ok(Json(VehicleAck {
        message: "vehicle added".to_string(),
        plate,
    }))
}

/// DELETE /vehicles/:plate - 404 if the plate was not whitelisted
///
/// A path that does not normalize to a valid plate cannot be on the
/// whitelist, so it is reported as absent too.
pub async fn remove_vehicle(
    State(state): State<AppState>,
    Path(raw): Path<String>,
) -> Result<Json<VehicleAck>, ApiError> {
    let plate = PlateCode::normalize(&raw)
        .map_err(|_| ApiError::NotFound(format!("plate {:?} not found", raw)))?;

    if !state.whitelist.remove(&plate).await? {
        return Err(ApiError::NotFound(format!("plate {} not found", plate)));
    }
    info!(plate = %plate, "Vehicle removed from whitelist");

    Ok(Json(VehicleAck {
        message: "vehicle removed".to_string(),
        plate,
    }))
}

fn parse_plate(raw: &str) -> Result<PlateCode, ApiError> {
    PlateCode::normalize(raw)
        .map_err(|e| ApiError::BadRequest(format!("invalid plate {:?}: {}", raw, e)))
}
