//! Wire types shared by the gateway, the edge and operator tooling

use crate::plate::PlateCode;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Outcome of one access decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Verdict {
    /// Whitelisted plate, barrier may open
    Pass,
    /// Rejected because a pass happened inside the cooldown window
    Cooldown,
    /// Plate recognized but not on the whitelist
    NotWhitelisted,
    /// Nothing plate-like found in the image
    NoPlate,
}

impl Verdict {
    pub fn allowed(self) -> bool {
        matches!(self, Verdict::Pass)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Verdict::Pass => "pass",
            Verdict::Cooldown => "cooldown",
            Verdict::NotWhitelisted => "not-whitelisted",
            Verdict::NoPlate => "no-plate",
        }
    }

    /// Operator-facing message shown on the gate display
    pub fn message(self) -> &'static str {
        match self {
            Verdict::Pass => "access granted",
            Verdict::Cooldown => "system cooling down, try again later",
            Verdict::NotWhitelisted => "access denied",
            Verdict::NoPlate => "no plate detected",
        }
    }
}

/// Response body of `POST /recognize`
///
/// `plate` is always present (possibly null); `confidence` only accompanies
/// a non-null plate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecognitionResponse {
    pub plate: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    pub allowed: bool,
    pub message: String,
    #[serde(default)]
    pub cooldown: bool,
}

impl RecognitionResponse {
    /// Fast-path rejection while the gate is cooling down
    pub fn cooling_down() -> Self {
        Self {
            plate: None,
            confidence: None,
            allowed: false,
            message: Verdict::Cooldown.message().to_string(),
            cooldown: true,
        }
    }

    pub fn no_plate() -> Self {
        Self {
            plate: None,
            confidence: None,
            allowed: false,
            message: Verdict::NoPlate.message().to_string(),
            cooldown: false,
        }
    }

    /// Decision for a recognized plate
    pub fn decided(plate: &PlateCode, confidence: f64, verdict: Verdict) -> Self {
        Self {
            plate: Some(plate.to_string()),
            confidence: Some(round_confidence(confidence)),
            allowed: verdict.allowed(),
            message: verdict.message().to_string(),
            cooldown: verdict == Verdict::Cooldown,
        }
    }
}

/// Confidence as reported to clients: two decimal places
pub fn round_confidence(confidence: f64) -> f64 {
    (confidence * 100.0).round() / 100.0
}

/// Whitelist row as listed by `GET /vehicles`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VehicleEntry {
    pub plate: PlateCode,
    pub note: String,
}

/// Body of `POST /vehicles`; the plate is normalized server-side
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NewVehicle {
    pub plate: String,
    #[serde(default)]
    pub note: String,
}

/// Acknowledgement for whitelist mutations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VehicleAck {
    pub message: String,
    pub plate: PlateCode,
}

/// One completed recognition, kept in the in-memory history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecognitionEvent {
    pub plate: Option<PlateCode>,
    pub confidence: f64,
    pub allowed: bool,
    pub reason: Verdict,
    pub timestamp: DateTime<Utc>,
}

impl RecognitionEvent {
    pub fn new(plate: Option<PlateCode>, confidence: f64, reason: Verdict) -> Self {
        Self {
            plate,
            confidence: round_confidence(confidence),
            allowed: reason.allowed(),
            reason,
            timestamp: Utc::now(),
        }
    }
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub module: String,
    pub version: String,
}
