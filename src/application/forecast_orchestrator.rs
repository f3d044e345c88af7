// Forecast orchestration - validate, dispatch to a model, assemble the result
use crate::application::chart_renderer::ChartRenderer;
use crate::application::forecast_model::{ForecastModel, ModelRegistry};
use crate::domain::forecast::{
    ForecastError, ForecastPhase, ForecastRequest, ForecastResult, ModelFailure, ModelKey,
    PredictedPoint, ValidationError,
};
use crate::domain::telemetry::{TelemetrySeries, VehicleId};
use std::sync::Arc;

/// Tracks one computation through `Idle -> Validating -> Dispatching ->
/// Completed | Failed`.
struct ForecastRun {
    vehicle_id: VehicleId,
    phase: ForecastPhase,
}

impl ForecastRun {
    fn new(vehicle_id: VehicleId) -> Self {
        Self {
            vehicle_id,
            phase: ForecastPhase::Idle,
        }
    }

    fn advance(&mut self, next: ForecastPhase) {
        debug_assert!(!self.phase.is_terminal(), "forecast run already finished");
        debug_assert!(
            self.phase.can_advance_to(next),
            "illegal forecast transition {:?} -> {:?}",
            self.phase,
            next
        );
        tracing::debug!(
            vehicle_id = self.vehicle_id,
            from = ?self.phase,
            to = ?next,
            "forecast phase"
        );
        self.phase = next;
    }
}

#[derive(Clone)]
pub struct ForecastOrchestrator {
    registry: ModelRegistry,
    renderer: Option<Arc<dyn ChartRenderer>>,
    max_horizon: usize,
}

impl ForecastOrchestrator {
    pub fn new(registry: ModelRegistry, max_horizon: usize) -> Self {
        Self {
            registry,
            renderer: None,
            max_horizon,
        }
    }

    pub fn with_renderer(mut self, renderer: Arc<dyn ChartRenderer>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    pub fn max_horizon(&self) -> usize {
        self.max_horizon
    }

    /// Registered models as `(key, label)` pairs
    pub fn models(&self) -> Vec<(ModelKey, String)> {
        self.registry
            .keys()
            .into_iter()
            .filter_map(|key| Some((key, self.registry.get(key)?.label().to_string())))
            .collect()
    }

    /// Check a request against the series without touching any model
    pub fn validate(
        &self,
        series: &TelemetrySeries,
        request: &ForecastRequest,
    ) -> Result<Arc<dyn ForecastModel>, ValidationError> {
        if series.vehicle_id() != request.vehicle_id {
            return Err(ValidationError::new(
                "vehicle_id",
                format!(
                    "series belongs to vehicle {}, not {}",
                    series.vehicle_id(),
                    request.vehicle_id
                ),
            ));
        }
        if request.known_months == 0 {
            return Err(ValidationError::new("n_known", "must be a positive integer"));
        }
        if request.known_months > series.len() {
            return Err(ValidationError::new(
                "n_known",
                format!(
                    "{} exceeds the {} recorded months",
                    request.known_months,
                    series.len()
                ),
            ));
        }
        if request.horizon_months == 0 || request.horizon_months > self.max_horizon {
            return Err(ValidationError::new(
                "horizon",
                format!("must be between 1 and {}", self.max_horizon),
            ));
        }

        self.registry.get(request.model_key).ok_or_else(|| {
            ValidationError::new(
                "model",
                format!("no adapter registered for '{}'", request.model_key),
            )
        })
    }

    /// Run one forecast to completion. Atomic: either a full result or an error.
    pub fn run(
        &self,
        series: &TelemetrySeries,
        request: &ForecastRequest,
    ) -> Result<ForecastResult, ForecastError> {
        let mut run = ForecastRun::new(request.vehicle_id);

        run.advance(ForecastPhase::Validating);
        let model = match self.validate(series, request) {
            Ok(model) => model,
            Err(e) => {
                run.advance(ForecastPhase::Failed);
                tracing::info!(vehicle_id = request.vehicle_id, error = %e, "forecast rejected");
                return Err(e.into());
            }
        };

        run.advance(ForecastPhase::Dispatching);
        match self.dispatch(model.as_ref(), series, request) {
            Ok(result) => {
                run.advance(ForecastPhase::Completed);
                Ok(result)
            }
            Err(e) => {
                run.advance(ForecastPhase::Failed);
                tracing::warn!(vehicle_id = request.vehicle_id, error = %e, "forecast failed");
                Err(e)
            }
        }
    }

    fn dispatch(
        &self,
        model: &dyn ForecastModel,
        series: &TelemetrySeries,
        request: &ForecastRequest,
    ) -> Result<ForecastResult, ForecastError> {
        let model_error = |source: ModelFailure| ForecastError::Model {
            model: request.model_key,
            source,
        };

        let known = series.prefix(request.known_months);
        let fitted = model.fit(known).map_err(model_error)?;
        let values = fitted.predict(request.horizon_months).map_err(model_error)?;

        if values.len() != request.horizon_months {
            return Err(model_error(ModelFailure::HorizonMismatch {
                expected: request.horizon_months,
                actual: values.len(),
            }));
        }
        if values.iter().any(|v| !v.is_finite()) {
            return Err(model_error(ModelFailure::Numerical(
                "model produced a non-finite capacity".to_string(),
            )));
        }

        let last_known = &known[known.len() - 1];
        let mut month = last_known.month;
        let predicted_series: Vec<PredictedPoint> = values
            .into_iter()
            .map(|capacity| {
                month = month.succ();
                PredictedPoint { month, capacity }
            })
            .collect();

        let current_capacity = last_known.capacity;
        let last_predicted_capacity = predicted_series[predicted_series.len() - 1].capacity;
        let degradation_ah = current_capacity - last_predicted_capacity;
        let degradation_percent =
            (current_capacity > 0.0).then(|| degradation_ah / current_capacity * 100.0);

        let (mae, rmse) = accuracy(series, &predicted_series);
        let chart = self.render_chart(series, &predicted_series, model.label());

        tracing::info!(
            vehicle_id = request.vehicle_id,
            model = %request.model_key,
            n_known = request.known_months,
            horizon = request.horizon_months,
            degradation_ah,
            "forecast completed"
        );

        Ok(ForecastResult {
            vehicle_id: request.vehicle_id,
            model_key: request.model_key,
            model_label: model.label().to_string(),
            known_months: request.known_months,
            horizon_months: request.horizon_months,
            predicted_series,
            actual_series: series
                .samples()
                .iter()
                .map(|s| PredictedPoint {
                    month: s.month,
                    capacity: s.capacity,
                })
                .collect(),
            current_capacity,
            last_predicted_capacity,
            degradation_ah,
            degradation_percent,
            mae,
            rmse,
            chart,
        })
    }

    fn render_chart(
        &self,
        series: &TelemetrySeries,
        predicted: &[PredictedPoint],
        label: &str,
    ) -> Option<bytes::Bytes> {
        let renderer = self.renderer.as_ref()?;
        match renderer.render(series.samples(), predicted, label) {
            Ok(png) => Some(png),
            Err(e) => {
                tracing::warn!(vehicle_id = series.vehicle_id(), error = %e, "chart rendering failed");
                None
            }
        }
    }
}

/// MAE and RMSE over forecast months that also have a recorded sample
fn accuracy(series: &TelemetrySeries, predicted: &[PredictedPoint]) -> (Option<f64>, Option<f64>) {
    let errors: Vec<f64> = predicted
        .iter()
        .filter_map(|point| {
            let idx = series.position(point.month)?;
            Some(series.samples()[idx].capacity - point.capacity)
        })
        .collect();

    if errors.is_empty() {
        return (None, None);
    }
    let n = errors.len() as f64;
    let mae = errors.iter().map(|e| e.abs()).sum::<f64>() / n;
    let rmse = (errors.iter().map(|e| e * e).sum::<f64>() / n).sqrt();
    (Some(mae), Some(rmse))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::forecast_model::testing::StubModel;
    use crate::domain::telemetry::MonthKey;
    use crate::domain::telemetry::fixtures::series_from;

    fn fourteen_months() -> TelemetrySeries {
        let capacities: Vec<f64> = (0..14).map(|i| 140.0 - i as f64).collect();
        series_from(5, MonthKey::new(2019, 1).unwrap(), &capacities)
    }

    fn request(model_key: ModelKey, known_months: usize, horizon_months: usize) -> ForecastRequest {
        ForecastRequest {
            vehicle_id: 5,
            model_key,
            known_months,
            horizon_months,
        }
    }

    fn orchestrator(stub: &Arc<StubModel>) -> ForecastOrchestrator {
        ForecastOrchestrator::new(ModelRegistry::new().with_model(stub.clone()), 24)
    }

    #[test]
    fn test_horizon_points_continue_from_last_known_month() {
        let stub = Arc::new(StubModel::new(ModelKey::Svr));
        let result = orchestrator(&stub)
            .run(&fourteen_months(), &request(ModelKey::Svr, 6, 8))
            .unwrap();

        assert_eq!(result.predicted_series.len(), 8);
        let mut expected = MonthKey::new(2019, 6).unwrap();
        for point in &result.predicted_series {
            expected = expected.succ();
            assert_eq!(point.month, expected);
        }
        assert_eq!(result.predicted_series[7].month.to_string(), "2020-02");
    }

    #[test]
    fn test_degradation_from_last_known_and_last_predicted() {
        let stub = Arc::new(StubModel::new(ModelKey::Svr));
        let result = orchestrator(&stub)
            .run(&fourteen_months(), &request(ModelKey::Svr, 6, 8))
            .unwrap();

        // last known month is index 5 (135 Ah); stub fades 0.5 Ah per month
        assert_eq!(result.current_capacity, 135.0);
        assert_eq!(result.last_predicted_capacity, 131.0);
        assert!((result.degradation_ah - 4.0).abs() < 1e-12);
        let pct = result.degradation_percent.unwrap();
        assert!((pct - 4.0 / 135.0 * 100.0).abs() < 1e-9);
        assert_eq!(result.model_label, "Stub");
    }

    #[test]
    fn test_accuracy_against_overlapping_months() {
        let stub = Arc::new(StubModel::new(ModelKey::Gpr));
        let result = orchestrator(&stub)
            .run(&fourteen_months(), &request(ModelKey::Gpr, 12, 4))
            .unwrap();

        // months 13-14 are recorded (128, 127); stub predicts 128.5, 128.0
        let mae = result.mae.unwrap();
        assert!((mae - 0.75).abs() < 1e-9);
        assert!(result.rmse.unwrap() >= mae);
    }

    #[test]
    fn test_known_months_beyond_series_is_rejected_without_dispatch() {
        let stub = Arc::new(StubModel::new(ModelKey::Svr));
        let err = orchestrator(&stub)
            .run(&fourteen_months(), &request(ModelKey::Svr, 15, 8))
            .unwrap_err();

        assert!(matches!(err, ForecastError::Validation(ref v) if v.field == "n_known"));
        assert_eq!(stub.fits(), 0);
    }

    #[test]
    fn test_horizon_and_model_validation() {
        let stub = Arc::new(StubModel::new(ModelKey::Svr));
        let orchestrator = orchestrator(&stub);
        let series = fourteen_months();

        let err = orchestrator.run(&series, &request(ModelKey::Svr, 6, 0)).unwrap_err();
        assert!(matches!(err, ForecastError::Validation(ref v) if v.field == "horizon"));

        let err = orchestrator.run(&series, &request(ModelKey::Svr, 6, 25)).unwrap_err();
        assert!(matches!(err, ForecastError::Validation(ref v) if v.field == "horizon"));

        let err = orchestrator.run(&series, &request(ModelKey::Gpr, 6, 8)).unwrap_err();
        assert!(matches!(err, ForecastError::Validation(ref v) if v.field == "model"));

        let err = orchestrator.run(&series, &request(ModelKey::Svr, 0, 8)).unwrap_err();
        assert!(matches!(err, ForecastError::Validation(ref v) if v.field == "n_known"));

        assert_eq!(stub.fits(), 0);
    }

    #[test]
    fn test_model_failure_carries_diagnostic() {
        let mut stub = StubModel::new(ModelKey::Seq2seqGpr);
        stub.fail_with = Some(ModelFailure::NotConverged { iterations: 10 });
        let stub = Arc::new(stub);

        let err = orchestrator(&stub)
            .run(&fourteen_months(), &request(ModelKey::Seq2seqGpr, 6, 3))
            .unwrap_err();

        match err {
            ForecastError::Model { model, source } => {
                assert_eq!(model, ModelKey::Seq2seqGpr);
                assert_eq!(source, ModelFailure::NotConverged { iterations: 10 });
            }
            other => panic!("expected model error, got {other:?}"),
        }
        assert_eq!(stub.fits(), 1);
    }

    #[test]
    fn test_model_catalog() {
        let stub = Arc::new(StubModel::new(ModelKey::Svr));
        assert_eq!(orchestrator(&stub).models(), vec![(ModelKey::Svr, "Stub".to_string())]);
    }

    #[test]
    fn test_zero_current_capacity_has_no_percentage() {
        let series = series_from(5, MonthKey::new(2019, 1).unwrap(), &[140.0, 0.0, 120.0]);
        let stub = Arc::new(StubModel::new(ModelKey::Svr));
        let result = orchestrator(&stub)
            .run(&series, &request(ModelKey::Svr, 2, 2))
            .unwrap();
        assert_eq!(result.current_capacity, 0.0);
        assert!(result.degradation_percent.is_none());
    }
}
