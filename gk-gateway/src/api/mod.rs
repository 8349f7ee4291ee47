//! HTTP API handlers for gk-gateway

pub mod error;
pub mod health;
pub mod history;
pub mod recognize;
pub mod sse;
pub mod vehicles;

pub use error::ApiError;
pub use health::health_routes;
pub use history::{latest, recent};
pub use recognize::recognize;
pub use sse::event_stream;
pub use vehicles::{add_vehicle, list_vehicles, remove_vehicle};
