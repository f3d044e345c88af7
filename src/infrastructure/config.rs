use anyhow::Context;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
pub struct ServiceConfig {
    pub server: ServerSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
    pub telemetry: TelemetrySource,
    #[serde(default)]
    pub forecast: ForecastSettings,
    #[serde(default)]
    pub alerts: AlertSettings,
    #[serde(default = "default_models_path")]
    pub models_path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    pub address: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingSettings {
    pub filter: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
        }
    }
}

/// Where telemetry is read from
#[derive(Debug, Deserialize, Clone)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TelemetrySource {
    /// Exported feature table: a JSON array of records
    File { path: PathBuf },
    /// Remote REST telemetry API
    Http {
        base_url: String,
        #[serde(default)]
        token: String,
        #[serde(default = "default_vehicles_path")]
        vehicles_path: String,
        #[serde(default = "default_telemetry_path")]
        telemetry_path: String,
    },
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ForecastSettings {
    pub max_horizon: usize,
    /// Used when a request leaves `n_known` out
    pub default_known: usize,
    pub timeout_secs: u64,
    pub max_concurrent: usize,
    pub render_charts: bool,
}

impl ForecastSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for ForecastSettings {
    fn default() -> Self {
        Self {
            max_horizon: 24,
            default_known: 6,
            timeout_secs: 30,
            max_concurrent: 4,
            render_charts: true,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct AlertSettings {
    pub capacity: usize,
    pub interval_secs: u64,
    pub seed: Option<u64>,
}

impl Default for AlertSettings {
    fn default() -> Self {
        Self {
            capacity: 50,
            interval_secs: 15,
            seed: None,
        }
    }
}

fn default_models_path() -> PathBuf {
    PathBuf::from("config/models.toml")
}

fn default_vehicles_path() -> String {
    "/vehicles".to_string()
}

fn default_telemetry_path() -> String {
    "/vehicles/${vehicle}/telemetry".to_string()
}

/// `config/service.toml` overlaid with `BATTERY__SECTION__KEY` variables
pub fn load_service_config() -> anyhow::Result<ServiceConfig> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("config/service"))
        .add_source(config::Environment::with_prefix("BATTERY").separator("__"))
        .build()
        .context("Failed to read service configuration")?;

    Ok(settings.try_deserialize()?)
}

/// Offline-trained model hyperparameters
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct ModelArtifacts {
    pub gpr: GprArtifact,
    pub svr: SvrArtifact,
    pub seq2seq: Seq2SeqArtifact,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct KernelArtifact {
    pub length_scale: f64,
    pub signal_variance: f64,
    pub noise: f64,
}

impl Default for KernelArtifact {
    fn default() -> Self {
        Self {
            length_scale: 5.0,
            signal_variance: 1.0,
            noise: 1.0,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct GprArtifact {
    pub kernel: KernelArtifact,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SvrArtifact {
    pub c: f64,
    pub epsilon: f64,
    pub gamma: f64,
    pub lags: usize,
    pub max_iter: usize,
    pub tolerance: f64,
}

impl Default for SvrArtifact {
    fn default() -> Self {
        Self {
            c: 10.0,
            epsilon: 0.2,
            gamma: 0.5,
            lags: 3,
            max_iter: 1000,
            tolerance: 1e-6,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Seq2SeqArtifact {
    pub level_gain: f64,
    pub trend_gain: f64,
    pub damping: f64,
    pub residual: KernelArtifact,
}

impl Default for Seq2SeqArtifact {
    fn default() -> Self {
        Self {
            level_gain: 0.6,
            trend_gain: 0.3,
            damping: 0.95,
            residual: KernelArtifact {
                length_scale: 1.5,
                signal_variance: 0.5,
                noise: 0.5,
            },
        }
    }
}

pub fn load_model_artifacts(path: &Path) -> anyhow::Result<ModelArtifacts> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read model artifacts from {}", path.display()))?;
    toml::from_str(&raw).with_context(|| format!("Failed to parse model artifacts in {}", path.display()))
}

/// Replace `${name}` placeholders in a path template, URL-encoding the values
pub fn expand_template(template: &str, vars: &HashMap<String, String>) -> String {
    let mut result = template.to_string();
    for (key, value) in vars {
        let placeholder = format!("${{{}}}", key);
        result = result.replace(&placeholder, &urlencoding::encode(value));
    }
    result
}
