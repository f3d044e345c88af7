// Forecast domain models - requests, results and the failure taxonomy
use super::telemetry::{MonthKey, VehicleId};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Closed set of forecasting models
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelKey {
    Gpr,
    Svr,
    Seq2seqGpr,
}

impl ModelKey {
    pub const ALL: [ModelKey; 3] = [ModelKey::Gpr, ModelKey::Svr, ModelKey::Seq2seqGpr];

    pub fn as_str(&self) -> &'static str {
        match self {
            ModelKey::Gpr => "gpr",
            ModelKey::Svr => "svr",
            ModelKey::Seq2seqGpr => "seq2seq_gpr",
        }
    }
}

impl fmt::Display for ModelKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelKey {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ModelKey::ALL
            .into_iter()
            .find(|key| key.as_str() == s.trim())
            .ok_or_else(|| ValidationError::new("model", format!("unknown model '{s}'")))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForecastRequest {
    pub vehicle_id: VehicleId,
    pub model_key: ModelKey,
    pub known_months: usize,
    pub horizon_months: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PredictedPoint {
    pub month: MonthKey,
    pub capacity: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ForecastResult {
    pub vehicle_id: VehicleId,
    pub model_key: ModelKey,
    pub model_label: String,
    pub known_months: usize,
    pub horizon_months: usize,
    pub predicted_series: Vec<PredictedPoint>,
    /// Recorded capacity for every month of the series
    pub actual_series: Vec<PredictedPoint>,
    /// Last known capacity
    pub current_capacity: f64,
    pub last_predicted_capacity: f64,
    pub degradation_ah: f64,
    /// Absent when the current capacity is zero
    pub degradation_percent: Option<f64>,
    /// Accuracy against recorded months overlapping the forecast, if any
    pub mae: Option<f64>,
    pub rmse: Option<f64>,
    /// PNG chart of actual vs predicted capacity
    pub chart: Option<Bytes>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid {field}: {reason}")]
pub struct ValidationError {
    pub field: &'static str,
    pub reason: String,
}

impl ValidationError {
    pub fn new(field: &'static str, reason: impl Into<String>) -> Self {
        Self {
            field,
            reason: reason.into(),
        }
    }
}

/// Diagnostic raised by a model adapter
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ModelFailure {
    #[error("insufficient data: need at least {required} known months, got {actual}")]
    InsufficientData { required: usize, actual: usize },

    #[error("solver did not converge after {iterations} iterations")]
    NotConverged { iterations: usize },

    #[error("numerical error: {0}")]
    Numerical(String),

    #[error("model returned {actual} points for a horizon of {expected}")]
    HorizonMismatch { expected: usize, actual: usize },
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ForecastError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("{model} model failed: {source}")]
    Model {
        model: ModelKey,
        #[source]
        source: ModelFailure,
    },

    #[error("forecast exceeded its {budget_ms} ms time budget")]
    Timeout { budget_ms: u64 },

    #[error("a forecast for vehicle {vehicle_id} is already in progress")]
    InProgress { vehicle_id: VehicleId },

    #[error("forecast worker failed: {0}")]
    Worker(String),
}

/// Lifecycle of one forecast computation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForecastPhase {
    Idle,
    Validating,
    Dispatching,
    Completed,
    Failed,
}

impl ForecastPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ForecastPhase::Completed | ForecastPhase::Failed)
    }

    /// Validating and Dispatching may fail; everything else moves forward only
    pub fn can_advance_to(&self, next: ForecastPhase) -> bool {
        matches!(
            (self, next),
            (ForecastPhase::Idle, ForecastPhase::Validating)
                | (ForecastPhase::Validating, ForecastPhase::Dispatching)
                | (ForecastPhase::Validating, ForecastPhase::Failed)
                | (ForecastPhase::Dispatching, ForecastPhase::Completed)
                | (ForecastPhase::Dispatching, ForecastPhase::Failed)
        )
    }
}
