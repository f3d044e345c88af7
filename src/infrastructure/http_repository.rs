// REST telemetry API repository implementation
use crate::application::telemetry_repository::TelemetryRepository;
use crate::domain::telemetry::{RawSample, VehicleId};
use crate::infrastructure::config::expand_template;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct HttpTelemetryRepository {
    client: reqwest::Client,
    base_url: String,
    token: String,
    vehicles_path: String,
    telemetry_path: String,
}

#[derive(Debug, Deserialize)]
struct VehiclesResponse {
    vehicles: Vec<VehicleEntry>,
}

#[derive(Debug, Deserialize)]
struct VehicleEntry {
    vehicle_id: VehicleId,
}

#[derive(Debug, Deserialize)]
struct TelemetryResponse {
    #[serde(default)]
    records: Vec<RawSample>,
}

impl HttpTelemetryRepository {
    pub fn new(base_url: String, token: String, vehicles_path: String, telemetry_path: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
            vehicles_path,
            telemetry_path,
        }
    }

    fn telemetry_url(&self, vehicle_id: VehicleId) -> String {
        let mut vars = HashMap::new();
        vars.insert("vehicle".to_string(), vehicle_id.to_string());
        format!("{}{}", self.base_url, expand_template(&self.telemetry_path, &vars))
    }

    /// GET a JSON document; `Ok(None)` when the store answers 404
    async fn fetch<T: DeserializeOwned>(&self, url: &str) -> Result<Option<T>> {
        let mut request = self.client.get(url).header("Accept", "application/json");
        if !self.token.is_empty() {
            request = request.bearer_auth(&self.token);
        }

        let response = request
            .send()
            .await
            .with_context(|| format!("Failed to send request to telemetry store at {url}"))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Telemetry store request failed with status {}: {}", status, body);
        }

        let data = response
            .json::<T>()
            .await
            .context("Failed to parse telemetry store response")?;
        Ok(Some(data))
    }
}

#[async_trait]
impl TelemetryRepository for HttpTelemetryRepository {
    async fn list_vehicle_ids(&self) -> Result<Vec<VehicleId>> {
        let url = format!("{}{}", self.base_url, self.vehicles_path);
        let response: Option<VehiclesResponse> = self.fetch(&url).await?;

        let mut ids: Vec<VehicleId> = response
            .map(|r| r.vehicles.into_iter().map(|v| v.vehicle_id).collect())
            .unwrap_or_default();
        ids.sort_unstable();
        ids.dedup();
        Ok(ids)
    }

    async fn get_timeseries(&self, vehicle_id: VehicleId) -> Result<Vec<RawSample>> {
        let url = self.telemetry_url(vehicle_id);
        tracing::debug!(vehicle_id, %url, "fetching telemetry");

        let response: Option<TelemetryResponse> = self.fetch(&url).await?;
        let mut records = response.map(|r| r.records).unwrap_or_default();

        // The store may omit the vehicle column on per-vehicle endpoints
        for record in &mut records {
            record.vehicle.get_or_insert(vehicle_id);
        }
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repository() -> HttpTelemetryRepository {
        HttpTelemetryRepository::new(
            "http://telemetry.local/api/".to_string(),
            "secret".to_string(),
            "/vehicles".to_string(),
            "/vehicles/${vehicle}/telemetry".to_string(),
        )
    }

    #[test]
    fn test_telemetry_url_expands_vehicle() {
        assert_eq!(
            repository().telemetry_url(12),
            "http://telemetry.local/api/vehicles/12/telemetry"
        );
    }

    #[test]
    fn test_response_shapes() {
        let vehicles: VehiclesResponse =
            serde_json::from_str(r#"{"vehicles": [{"vehicle_id": 3, "label": "bus"}, {"vehicle_id": 1}]}"#).unwrap();
        let ids: Vec<VehicleId> = vehicles.vehicles.iter().map(|v| v.vehicle_id).collect();
        assert_eq!(ids, vec![3, 1]);

        let telemetry: TelemetryResponse =
            serde_json::from_str(r#"{"records": [{"month_ts": "2020-05", "Ca": 120.5}]}"#).unwrap();
        assert_eq!(telemetry.records[0].capacity, Some(120.5));

        let empty: TelemetryResponse = serde_json::from_str("{}").unwrap();
        assert!(empty.records.is_empty());
    }

    #[tokio::test]
    async fn test_unreachable_store_is_an_error() {
        let repository = HttpTelemetryRepository::new(
            "http://127.0.0.1:9".to_string(),
            String::new(),
            "/vehicles".to_string(),
            "/vehicles/${vehicle}/telemetry".to_string(),
        );
        let err = repository.list_vehicle_ids().await.unwrap_err();
        assert!(err.to_string().contains("Failed to send request"));
    }
}
