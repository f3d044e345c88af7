// Forecast service - runs forecasts off the request path with a time budget
use crate::application::forecast_orchestrator::ForecastOrchestrator;
use crate::domain::forecast::{ForecastError, ForecastRequest, ForecastResult};
use crate::domain::telemetry::{TelemetrySeries, VehicleId};
use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::Semaphore;

/// Marks a vehicle as having a forecast in flight until dropped
struct InFlightGuard {
    vehicle_id: VehicleId,
    in_flight: Arc<Mutex<HashSet<VehicleId>>>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.vehicle_id);
    }
}

#[derive(Clone)]
pub struct ForecastService {
    orchestrator: Arc<ForecastOrchestrator>,
    in_flight: Arc<Mutex<HashSet<VehicleId>>>,
    workers: Arc<Semaphore>,
    timeout: Duration,
}

impl ForecastService {
    pub fn new(orchestrator: ForecastOrchestrator, max_concurrent: usize, timeout: Duration) -> Self {
        Self {
            orchestrator: Arc::new(orchestrator),
            in_flight: Arc::new(Mutex::new(HashSet::new())),
            workers: Arc::new(Semaphore::new(max_concurrent.max(1))),
            timeout,
        }
    }

    pub fn orchestrator(&self) -> &ForecastOrchestrator {
        &self.orchestrator
    }

    pub fn is_in_flight(&self, vehicle_id: VehicleId) -> bool {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&vehicle_id)
    }

    fn claim(&self, vehicle_id: VehicleId) -> Result<InFlightGuard, ForecastError> {
        let mut in_flight = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        if !in_flight.insert(vehicle_id) {
            return Err(ForecastError::InProgress { vehicle_id });
        }
        Ok(InFlightGuard {
            vehicle_id,
            in_flight: self.in_flight.clone(),
        })
    }

    /// Validate, then compute on the blocking pool.
    ///
    /// At most one computation per vehicle runs at a time; a concurrent
    /// request for the same vehicle fails with `InProgress`. The in-flight
    /// mark is held by the worker itself, so after a `Timeout` the vehicle
    /// stays busy until the abandoned computation actually finishes.
    pub async fn run(
        &self,
        series: TelemetrySeries,
        request: ForecastRequest,
    ) -> Result<ForecastResult, ForecastError> {
        self.orchestrator.validate(&series, &request)?;

        let guard = self.claim(request.vehicle_id)?;
        let orchestrator = self.orchestrator.clone();
        let workers = self.workers.clone();

        let work = async move {
            let permit = workers
                .acquire_owned()
                .await
                .map_err(|e| ForecastError::Worker(e.to_string()))?;

            tokio::task::spawn_blocking(move || {
                let _guard = guard;
                let _permit = permit;
                orchestrator.run(&series, &request)
            })
            .await
            .map_err(|e| ForecastError::Worker(e.to_string()))?
        };

        match tokio::time::timeout(self.timeout, work).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(timeout = ?self.timeout, "forecast timed out");
                Err(ForecastError::Timeout {
                    budget_ms: self.timeout.as_millis() as u64,
                })
            }
        }
    }
}
