// Wire shapes for the HTTP surface
use crate::domain::alert::AlertMessage;
use crate::domain::forecast::{ForecastRequest, ForecastResult, ModelKey, PredictedPoint, ValidationError};
use crate::domain::telemetry::{Sample, TelemetrySeries, VehicleId};
use crate::domain::vehicle::VehicleSummary;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

#[derive(Debug, Serialize)]
pub struct VehiclesResponse {
    pub vehicles: Vec<VehicleSummary>,
}

#[derive(Debug, Serialize)]
pub struct TimeseriesResponse {
    pub vehicle_id: VehicleId,
    pub n_samples: usize,
    pub samples: Vec<Sample>,
}

impl From<&TelemetrySeries> for TimeseriesResponse {
    fn from(series: &TelemetrySeries) -> Self {
        Self {
            vehicle_id: series.vehicle_id(),
            n_samples: series.len(),
            samples: series.samples().to_vec(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct HealthQuery {
    pub end: Option<i64>,
    /// Raw month key; one that does not parse is reported as not found
    pub inspect: Option<String>,
}

impl HealthQuery {
    /// Negative ends clamp to the first sample
    pub fn end_index(&self) -> Option<usize> {
        self.end.map(|end| usize::try_from(end.max(0)).unwrap_or(usize::MAX))
    }
}

/// Month counts stay raw JSON until `into_request` range-checks them
#[derive(Debug, Deserialize)]
pub struct ForecastRequestDto {
    pub vehicle_id: VehicleId,
    pub model: String,
    #[serde(default)]
    pub n_known: Value,
    #[serde(default)]
    pub horizon: Value,
}

impl ForecastRequestDto {
    pub fn into_request(self, default_known: usize) -> Result<ForecastRequest, ValidationError> {
        let model_key = self.model.parse()?;
        let known_months = month_count("n_known", &self.n_known)?.unwrap_or(default_known);
        let horizon_months =
            month_count("horizon", &self.horizon)?.ok_or_else(|| ValidationError::new("horizon", "is required"))?;

        Ok(ForecastRequest {
            vehicle_id: self.vehicle_id,
            model_key,
            known_months,
            horizon_months,
        })
    }
}

fn month_count(field: &'static str, value: &Value) -> Result<Option<usize>, ValidationError> {
    if value.is_null() {
        return Ok(None);
    }
    value
        .as_u64()
        .and_then(|n| usize::try_from(n).ok())
        .map(Some)
        .ok_or_else(|| ValidationError::new(field, format!("must be a non-negative integer, got {value}")))
}

#[derive(Debug, Serialize)]
pub struct ForecastResponseDto {
    pub vehicle_id: VehicleId,
    pub model: ModelKey,
    pub model_label: String,
    pub n_known: usize,
    pub horizon: usize,
    pub current_ca: f64,
    pub last_predicted_ca: f64,
    pub degradation_ah: f64,
    pub degradation_pct: Option<f64>,
    pub mae: Option<f64>,
    pub rmse: Option<f64>,
    pub predicted_series: Vec<PredictedPoint>,
    pub actual_series: Vec<PredictedPoint>,
    /// Base64-encoded PNG
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plot_png: Option<String>,
}

impl From<ForecastResult> for ForecastResponseDto {
    fn from(result: ForecastResult) -> Self {
        Self {
            vehicle_id: result.vehicle_id,
            model: result.model_key,
            model_label: result.model_label,
            n_known: result.known_months,
            horizon: result.horizon_months,
            current_ca: result.current_capacity,
            last_predicted_ca: result.last_predicted_capacity,
            degradation_ah: result.degradation_ah,
            degradation_pct: result.degradation_percent,
            mae: result.mae,
            rmse: result.rmse,
            predicted_series: result.predicted_series,
            actual_series: result.actual_series,
            plot_png: result.chart.map(|png| STANDARD.encode(png)),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ModelInfo {
    pub key: ModelKey,
    pub label: String,
}

#[derive(Debug, Serialize)]
pub struct ModelsResponse {
    pub models: Vec<ModelInfo>,
    pub default_known: usize,
    pub max_horizon: usize,
}

#[derive(Debug, Serialize)]
pub struct AlertsResponse {
    pub alerts: Vec<AlertMessage>,
}

#[derive(Debug, Serialize)]
pub struct AlertDeleted {
    pub id: Uuid,
    pub removed: bool,
}

#[derive(Debug, Serialize)]
pub struct AlertSaved {
    pub id: Uuid,
    pub saved: bool,
}
