// Fleet service - Use cases over per-vehicle telemetry
use crate::application::telemetry_repository::TelemetryRepository;
use crate::domain::alert::{FleetSnapshot, VehicleSnapshot};
use crate::domain::health::{self, HealthAssessment};
use crate::domain::telemetry::{Sample, SeriesError, TelemetrySeries, VehicleId};
use crate::domain::vehicle::VehicleSummary;
use crate::domain::window::{InspectOutcome, WindowSelector};
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FleetError {
    #[error("vehicle {0} not found")]
    VehicleNotFound(VehicleId),

    #[error("malformed telemetry for vehicle {vehicle_id}: {source}")]
    Malformed {
        vehicle_id: VehicleId,
        #[source]
        source: SeriesError,
    },

    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

/// Display window over one vehicle's series, with the SoH of that window
#[derive(Debug, Clone, Serialize)]
pub struct WindowView {
    pub vehicle_id: VehicleId,
    pub n_samples: usize,
    pub end_index: usize,
    pub inspect_index: usize,
    /// Set when an inspect month was requested but not recorded
    pub inspect_not_found: bool,
    pub window: Vec<Sample>,
    pub inspected: Option<Sample>,
    pub health: HealthAssessment,
}

#[derive(Clone)]
pub struct FleetService {
    repository: Arc<dyn TelemetryRepository>,
}

impl FleetService {
    pub fn new(repository: Arc<dyn TelemetryRepository>) -> Self {
        Self { repository }
    }

    /// Canonical series for one vehicle
    pub async fn timeseries(&self, vehicle_id: VehicleId) -> Result<TelemetrySeries, FleetError> {
        let raw = self.repository.get_timeseries(vehicle_id).await?;
        if raw.is_empty() {
            return Err(FleetError::VehicleNotFound(vehicle_id));
        }
        TelemetrySeries::ingest(vehicle_id, raw).map_err(|source| FleetError::Malformed { vehicle_id, source })
    }

    /// Summaries for every vehicle with usable telemetry.
    /// Vehicles whose telemetry is malformed are logged and left out.
    pub async fn list_vehicles(&self) -> Result<Vec<VehicleSummary>, FleetError> {
        let ids = self.repository.list_vehicle_ids().await?;
        let mut vehicles = Vec::with_capacity(ids.len());

        for vehicle_id in ids {
            match self.timeseries(vehicle_id).await {
                Ok(series) => vehicles.push(VehicleSummary::from_series(&series)),
                Err(FleetError::Store(e)) => return Err(FleetError::Store(e)),
                Err(e) => tracing::warn!(vehicle_id, error = %e, "skipping vehicle in fleet listing"),
            }
        }

        vehicles.sort_by_key(|v| v.vehicle_id);
        Ok(vehicles)
    }

    /// Apply `end` then `inspect` to a fresh selector and assess the window
    pub async fn window_view(
        &self,
        vehicle_id: VehicleId,
        end: Option<usize>,
        inspect: Option<&str>,
    ) -> Result<WindowView, FleetError> {
        let series = self.timeseries(vehicle_id).await?;
        Ok(build_window_view(&series, end, inspect))
    }

    /// Point-in-time health of the whole fleet for alert synthesis.
    /// A vehicle with malformed telemetry is included with an unknown health.
    pub async fn snapshot(&self) -> Result<FleetSnapshot, FleetError> {
        let ids = self.repository.list_vehicle_ids().await?;
        let mut vehicles = Vec::with_capacity(ids.len());

        for vehicle_id in ids {
            let health = match self.timeseries(vehicle_id).await {
                Ok(series) => health::evaluate(series.samples()),
                Err(FleetError::Store(e)) => return Err(FleetError::Store(e)),
                Err(_) => HealthAssessment::Unknown,
            };
            vehicles.push(VehicleSnapshot { vehicle_id, health });
        }

        Ok(FleetSnapshot { vehicles })
    }
}

fn build_window_view(series: &TelemetrySeries, end: Option<usize>, inspect: Option<&str>) -> WindowView {
    let mut selector = WindowSelector::for_series(series);
    if let Some(end) = end {
        selector.set_end(end);
    }
    let inspect_not_found = match inspect.map(|key| (key, selector.set_inspect_by_key(series, key))) {
        Some((key, InspectOutcome::Selected { index })) => {
            tracing::debug!(vehicle_id = series.vehicle_id(), month = key, index, "inspecting month");
            false
        }
        Some((key, InspectOutcome::NotFound)) => {
            tracing::debug!(vehicle_id = series.vehicle_id(), month = key, "inspected month not recorded");
            true
        }
        None => false,
    };

    let window = selector.window(series);
    WindowView {
        vehicle_id: series.vehicle_id(),
        n_samples: series.len(),
        end_index: selector.end_index(),
        inspect_index: selector.inspect_index(),
        inspect_not_found,
        window: window.to_vec(),
        inspected: selector.inspected(series).cloned(),
        health: health::evaluate(window),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::telemetry_repository::memory::MemoryRepository;
    use crate::domain::telemetry::RawSample;
    use crate::domain::telemetry::fixtures::raw;

    fn repository() -> MemoryRepository {
        let mut repo = MemoryRepository::default();
        repo.vehicles.insert(
            2,
            vec![raw("2019-02", 139.0), raw("2019-01", 140.0), raw("2019-03", 126.0)],
        );
        repo.vehicles.insert(1, vec![raw("2019-01", 132.0)]);
        repo.vehicles.insert(9, vec![raw("2019-01", 140.0), raw("2019-01", 139.0)]);
        repo
    }

    fn service() -> FleetService {
        FleetService::new(Arc::new(repository()))
    }

    #[tokio::test]
    async fn test_list_vehicles_skips_malformed() {
        let vehicles = service().list_vehicles().await.unwrap();
        let ids: Vec<VehicleId> = vehicles.iter().map(|v| v.vehicle_id).collect();
        assert_eq!(ids, vec![1, 2]);
        assert_eq!(vehicles[1].n_samples, 3);
    }

    #[tokio::test]
    async fn test_timeseries_errors() {
        let service = service();
        assert!(matches!(
            service.timeseries(42).await,
            Err(FleetError::VehicleNotFound(42))
        ));

        match service.timeseries(9).await {
            Err(FleetError::Malformed { vehicle_id, source }) => {
                assert_eq!(vehicle_id, 9);
                assert_eq!(source.indices(), &[0, 1]);
            }
            other => panic!("expected malformed series, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_window_view_pulls_end_forward_on_inspect() {
        let service = service();
        let view = service
            .window_view(2, Some(0), Some("2019-02"))
            .await
            .unwrap();

        assert_eq!(view.end_index, 1);
        assert_eq!(view.inspect_index, 1);
        assert!(!view.inspect_not_found);
        assert_eq!(view.window.len(), 2);
        let soh = view.health.assessed().unwrap();
        assert!((soh.percentage - 139.0 / 140.0 * 100.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_window_view_reports_missing_month() {
        let view = service()
            .window_view(2, Some(1), Some("2020-06"))
            .await
            .unwrap();
        assert!(view.inspect_not_found);
        assert_eq!(view.end_index, 1);
        assert_eq!(view.inspect_index, 2);
    }

    #[tokio::test]
    async fn test_snapshot_marks_malformed_as_unknown() {
        let snapshot = service().snapshot().await.unwrap();
        assert_eq!(snapshot.vehicles.len(), 3);

        let malformed = snapshot.vehicles.iter().find(|v| v.vehicle_id == 9).unwrap();
        assert_eq!(malformed.health, HealthAssessment::Unknown);

        let faded = snapshot.vehicles.iter().find(|v| v.vehicle_id == 2).unwrap();
        assert!((faded.health.assessed().unwrap().percentage - 90.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_store_failure_propagates() {
        struct Failing;

        #[async_trait::async_trait]
        impl TelemetryRepository for Failing {
            async fn list_vehicle_ids(&self) -> anyhow::Result<Vec<VehicleId>> {
                anyhow::bail!("store offline")
            }

            async fn get_timeseries(&self, _vehicle_id: VehicleId) -> anyhow::Result<Vec<RawSample>> {
                anyhow::bail!("store offline")
            }
        }

        let service = FleetService::new(Arc::new(Failing));
        assert!(matches!(service.snapshot().await, Err(FleetError::Store(_))));
        assert!(matches!(service.timeseries(1).await, Err(FleetError::Store(_))));
    }
}
