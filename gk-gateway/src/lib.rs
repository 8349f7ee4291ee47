//! gk-gateway library - gatekeeper PC service
//!
//! Receives plate-region images from edge devices, recognizes the plate,
//! decides access against the whitelist under a global cooldown, and serves
//! the whitelist management and recognition history APIs.

use axum::Router;
use std::sync::Arc;

pub mod api;
pub mod db;
pub mod error;
pub mod gate;
pub mod history;
pub mod recognizer;
pub mod whitelist;

pub use error::{Error, Result};

use gate::AccessGate;
use history::RecognitionHistory;
use recognizer::Recognizer;
use whitelist::WhitelistStore;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub whitelist: Arc<dyn WhitelistStore>,
    pub gate: Arc<AccessGate>,
    pub recognizer: Arc<dyn Recognizer>,
    pub history: Arc<RecognitionHistory>,
}

impl AppState {
    /// Wire the gate to the same whitelist the management API mutates
    pub fn new(
        whitelist: Arc<dyn WhitelistStore>,
        recognizer: Arc<dyn Recognizer>,
        cooldown: std::time::Duration,
        history_capacity: usize,
    ) -> Self {
        let gate = Arc::new(AccessGate::new(Arc::clone(&whitelist), cooldown));
        Self {
            whitelist,
            gate,
            recognizer,
            history: Arc::new(RecognitionHistory::new(history_capacity)),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::{delete, get, post};

    Router::new()
        // Edge upload
        .route("/recognize", post(api::recognize))
        // Whitelist management
        .route("/vehicles", get(api::list_vehicles).post(api::add_vehicle))
        .route("/vehicles/:plate", delete(api::remove_vehicle))
        // Recognition history
        .route("/latest", get(api::latest))
        .route("/recent", get(api::recent))
        .route("/events", get(api::event_stream))
        .merge(api::health_routes())
        .with_state(state)
}
