// HTTP request handlers
use crate::application::operator_context::OperatorContext;
use crate::domain::forecast::ForecastError;
use crate::domain::telemetry::VehicleId;
use crate::infrastructure::http_response::{accepts_brotli, json_response};
use crate::presentation::app_state::AppState;
use crate::presentation::dto::{
    AlertDeleted, AlertSaved, AlertsResponse, ForecastRequestDto, ForecastResponseDto, HealthQuery, ModelInfo,
    ModelsResponse, TimeseriesResponse, VehiclesResponse,
};
use crate::presentation::error::ApiError;
use axum::{
    Json,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

async fn reply<T: Serialize>(headers: &HeaderMap, data: &T) -> Response {
    json_response(StatusCode::OK, data, accepts_brotli(headers))
        .await
        .into_response()
}

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "ok"
}

/// Fleet listing with per-vehicle summary statistics
pub async fn list_vehicles(headers: HeaderMap, State(state): State<Arc<AppState>>) -> Result<Response, ApiError> {
    let vehicles = state.fleet_service.list_vehicles().await?;
    Ok(reply(&headers, &VehiclesResponse { vehicles }).await)
}

pub async fn vehicle_timeseries(
    Path(vehicle_id): Path<VehicleId>,
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
) -> Result<Response, ApiError> {
    let series = state.fleet_service.timeseries(vehicle_id).await?;
    Ok(reply(&headers, &TimeseriesResponse::from(&series)).await)
}

/// Windowed series plus the SoH of that window
pub async fn vehicle_health(
    Path(vehicle_id): Path<VehicleId>,
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
    query: Result<Query<HealthQuery>, QueryRejection>,
) -> Result<Response, ApiError> {
    let Query(query) = query?;
    let view = state
        .fleet_service
        .window_view(vehicle_id, query.end_index(), query.inspect.as_deref())
        .await?;
    Ok(reply(&headers, &view).await)
}

pub async fn list_models(headers: HeaderMap, State(state): State<Arc<AppState>>) -> Response {
    let orchestrator = state.forecast_service.orchestrator();
    let models = orchestrator
        .models()
        .into_iter()
        .map(|(key, label)| ModelInfo { key, label })
        .collect();

    let response = ModelsResponse {
        models,
        default_known: state.default_known,
        max_horizon: orchestrator.max_horizon(),
    };
    reply(&headers, &response).await
}

pub async fn run_forecast(
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
    body: Result<Json<ForecastRequestDto>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(body) = body?;
    let request = body.into_request(state.default_known)?;
    if state.forecast_service.is_in_flight(request.vehicle_id) {
        return Err(ForecastError::InProgress {
            vehicle_id: request.vehicle_id,
        }
        .into());
    }
    let series = state.fleet_service.timeseries(request.vehicle_id).await?;

    tracing::info!(
        vehicle_id = request.vehicle_id,
        model = %request.model_key,
        n_known = request.known_months,
        horizon = request.horizon_months,
        "forecast requested"
    );

    let result = state.forecast_service.run(series, request).await?;
    Ok(reply(&headers, &ForecastResponseDto::from(result)).await)
}

/// Alert feed, newest first
pub async fn list_alerts(headers: HeaderMap, State(state): State<Arc<AppState>>) -> Response {
    let alerts = state.alert_service.list();
    reply(&headers, &AlertsResponse { alerts }).await
}

pub async fn delete_alert(
    ctx: OperatorContext,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
) -> Response {
    let removed = state.alert_service.delete(&ctx, id);
    reply(&headers, &AlertDeleted { id, removed }).await
}

pub async fn toggle_alert_saved(
    ctx: OperatorContext,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
) -> Result<Response, ApiError> {
    let saved = state
        .alert_service
        .toggle_saved(&ctx, id)
        .ok_or_else(|| ApiError::not_found(format!("alert {id} not found")))?;
    Ok(reply(&headers, &AlertSaved { id, saved }).await)
}
