// Presentation layer - HTTP routing and wire formats
pub mod app_state;
pub mod dto;
pub mod error;
pub mod handlers;
pub mod operator;

use crate::presentation::app_state::AppState;
use crate::presentation::handlers::{
    delete_alert, health_check, list_alerts, list_models, list_vehicles, run_forecast, toggle_alert_saved,
    vehicle_health, vehicle_timeseries,
};
use axum::{
    Router,
    routing::{delete, get, post},
};
use std::sync::Arc;

// Compression is applied per response in the JSON builder, so no
// CompressionLayer here
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(health_check))
        .route("/vehicles", get(list_vehicles))
        .route("/vehicles/:id/timeseries", get(vehicle_timeseries))
        .route("/vehicles/:id/health", get(vehicle_health))
        .route("/meta/models", get(list_models))
        .route("/ml/forecast", post(run_forecast))
        .route("/alerts", get(list_alerts))
        .route("/alerts/:id", delete(delete_alert))
        .route("/alerts/:id/saved", post(toggle_alert_saved))
        .with_state(state)
}
