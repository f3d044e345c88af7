// Repository trait for telemetry data access
use crate::domain::telemetry::{RawSample, VehicleId};
use async_trait::async_trait;

#[async_trait]
pub trait TelemetryRepository: Send + Sync {
    /// List all vehicle IDs known to the store
    async fn list_vehicle_ids(&self) -> anyhow::Result<Vec<VehicleId>>;

    /// Raw monthly records for one vehicle, in store order.
    /// An unknown vehicle yields an empty list.
    async fn get_timeseries(&self, vehicle_id: VehicleId) -> anyhow::Result<Vec<RawSample>>;
}
