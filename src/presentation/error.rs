// Mapping of service errors onto HTTP responses
use crate::application::fleet_service::FleetError;
use crate::domain::forecast::{ForecastError, ValidationError};
use axum::{
    Json,
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    field: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    indices: Option<Vec<usize>>,
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: ErrorBody,
}

impl ApiError {
    fn new(status: StatusCode, error: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            body: ErrorBody {
                error,
                message: message.into(),
                field: None,
                indices: None,
            },
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, "not_found", message)
    }
}

impl From<ValidationError> for ApiError {
    fn from(e: ValidationError) -> Self {
        let mut err = Self::new(StatusCode::BAD_REQUEST, "validation", e.to_string());
        err.body.field = Some(e.field);
        err
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "invalid_body", rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "invalid_query", rejection.body_text())
    }
}

impl From<FleetError> for ApiError {
    fn from(e: FleetError) -> Self {
        match e {
            FleetError::VehicleNotFound(_) => Self::new(StatusCode::NOT_FOUND, "vehicle_not_found", e.to_string()),
            FleetError::Malformed { ref source, .. } => {
                let indices = source.indices().to_vec();
                let mut err = Self::new(StatusCode::UNPROCESSABLE_ENTITY, "malformed_series", e.to_string());
                err.body.indices = Some(indices);
                err
            }
            FleetError::Store(ref source) => {
                tracing::error!(error = ?source, "telemetry store failure");
                Self::new(StatusCode::BAD_GATEWAY, "telemetry_unavailable", e.to_string())
            }
        }
    }
}

impl From<ForecastError> for ApiError {
    fn from(e: ForecastError) -> Self {
        match e {
            ForecastError::Validation(v) => v.into(),
            ForecastError::Model { .. } => Self::new(StatusCode::INTERNAL_SERVER_ERROR, "model_error", e.to_string()),
            ForecastError::Timeout { .. } => Self::new(StatusCode::GATEWAY_TIMEOUT, "timeout", e.to_string()),
            ForecastError::InProgress { .. } => Self::new(StatusCode::CONFLICT, "in_progress", e.to_string()),
            ForecastError::Worker(_) => {
                tracing::error!(error = %e, "forecast worker failure");
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, "worker_failed", e.to_string())
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::forecast::{ModelFailure, ModelKey};
    use crate::domain::telemetry::SeriesError;

    #[test]
    fn test_status_mapping() {
        let cases: Vec<(ApiError, StatusCode)> = vec![
            (ValidationError::new("horizon", "too long").into(), StatusCode::BAD_REQUEST),
            (FleetError::VehicleNotFound(3).into(), StatusCode::NOT_FOUND),
            (
                FleetError::Malformed {
                    vehicle_id: 3,
                    source: SeriesError::MissingMonth { indices: vec![2] },
                }
                .into(),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (FleetError::Store(anyhow::anyhow!("down")).into(), StatusCode::BAD_GATEWAY),
            (
                ForecastError::Model {
                    model: ModelKey::Svr,
                    source: ModelFailure::NotConverged { iterations: 5 },
                }
                .into(),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (ForecastError::Timeout { budget_ms: 10 }.into(), StatusCode::GATEWAY_TIMEOUT),
            (ForecastError::InProgress { vehicle_id: 1 }.into(), StatusCode::CONFLICT),
        ];

        for (err, status) in cases {
            assert_eq!(err.status, status, "{err:?}");
        }
    }

    #[test]
    fn test_malformed_body_lists_indices() {
        let err: ApiError = FleetError::Malformed {
            vehicle_id: 3,
            source: SeriesError::UnparsableMonth { indices: vec![0, 4] },
        }
        .into();
        assert_eq!(err.body.indices, Some(vec![0, 4]));
        assert_eq!(err.body.error, "malformed_series");
    }
}
