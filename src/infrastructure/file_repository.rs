// File-backed telemetry repository over the exported feature table
use crate::application::telemetry_repository::TelemetryRepository;
use crate::domain::telemetry::{RawSample, VehicleId};
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::Path;

/// Loads the whole table once at startup and serves it from memory
#[derive(Debug, Clone, Default)]
pub struct FileTelemetryRepository {
    vehicles: BTreeMap<VehicleId, Vec<RawSample>>,
}

impl FileTelemetryRepository {
    pub async fn load(path: &Path) -> Result<Self> {
        let raw = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read telemetry table {}", path.display()))?;
        let records: Vec<RawSample> = serde_json::from_slice(&raw)
            .with_context(|| format!("Failed to parse telemetry table {}", path.display()))?;

        let repository = Self::from_records(records);
        tracing::info!(
            path = %path.display(),
            vehicles = repository.vehicles.len(),
            "telemetry table loaded"
        );
        Ok(repository)
    }

    pub fn from_records(records: Vec<RawSample>) -> Self {
        let mut vehicles: BTreeMap<VehicleId, Vec<RawSample>> = BTreeMap::new();
        let mut orphans = 0usize;

        for record in records {
            match record.vehicle {
                Some(vehicle_id) => vehicles.entry(vehicle_id).or_default().push(record),
                None => orphans += 1,
            }
        }

        if orphans > 0 {
            tracing::warn!(orphans, "skipped telemetry records without a vehicle id");
        }
        Self { vehicles }
    }
}

#[async_trait]
impl TelemetryRepository for FileTelemetryRepository {
    async fn list_vehicle_ids(&self) -> Result<Vec<VehicleId>> {
        Ok(self.vehicles.keys().copied().collect())
    }

    async fn get_timeseries(&self, vehicle_id: VehicleId) -> Result<Vec<RawSample>> {
        Ok(self.vehicles.get(&vehicle_id).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const TABLE: &str = r#"[
        {"vehicle": 2, "month_ts": "2019-01-01 00:00:00", "Ca": 140.0, "Tmax_ave": 31.5, "Month": 1},
        {"vehicle": 1, "month_ts": "2019-01-01 00:00:00", "Ca": 132.0},
        {"vehicle": 2, "month_ts": "2019-02-01 00:00:00", "Ca": 139.2, "SOC_ave": 61.0},
        {"month_ts": "2019-02-01 00:00:00", "Ca": 99.0}
    ]"#;

    #[tokio::test]
    async fn test_load_groups_records_by_vehicle() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(TABLE.as_bytes()).unwrap();

        let repository = FileTelemetryRepository::load(file.path()).await.unwrap();
        assert_eq!(repository.list_vehicle_ids().await.unwrap(), vec![1, 2]);

        let records = repository.get_timeseries(2).await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].temp_max, Some(31.5));
        assert_eq!(records[1].soc_avg, Some(61.0));
    }

    #[tokio::test]
    async fn test_unknown_vehicle_is_empty() {
        let repository = FileTelemetryRepository::from_records(Vec::new());
        assert!(repository.get_timeseries(7).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unreadable_table_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("features.json");
        assert!(FileTelemetryRepository::load(&missing).await.is_err());

        std::fs::write(&missing, "{not json").unwrap();
        let err = FileTelemetryRepository::load(&missing).await.unwrap_err();
        assert!(err.to_string().contains("Failed to parse telemetry table"));
    }
}
