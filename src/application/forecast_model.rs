// Model adapter contract and the registry of available forecasters
use crate::domain::forecast::{ModelFailure, ModelKey};
use crate::domain::telemetry::Sample;
use std::collections::HashMap;
use std::sync::Arc;

/// Per-vehicle state produced by fitting a model to the known months
pub trait FittedModel: Send {
    /// Capacity for each of the next `horizon` months, in order
    fn predict(&self, horizon: usize) -> Result<Vec<f64>, ModelFailure>;
}

/// A forecasting model whose hyperparameters were loaded from artifacts.
///
/// Adapters are shared across requests; all per-request state lives in the
/// [`FittedModel`] returned by `fit`.
pub trait ForecastModel: Send + Sync {
    fn key(&self) -> ModelKey;

    /// Human-readable name shown next to the forecast
    fn label(&self) -> &str;

    fn fit(&self, known: &[Sample]) -> Result<Box<dyn FittedModel>, ModelFailure>;
}

#[derive(Clone, Default)]
pub struct ModelRegistry {
    models: HashMap<ModelKey, Arc<dyn ForecastModel>>,
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_model(mut self, model: Arc<dyn ForecastModel>) -> Self {
        self.models.insert(model.key(), model);
        self
    }

    pub fn get(&self, key: ModelKey) -> Option<Arc<dyn ForecastModel>> {
        self.models.get(&key).cloned()
    }

    pub fn keys(&self) -> Vec<ModelKey> {
        let mut keys: Vec<ModelKey> = self.models.keys().copied().collect();
        keys.sort_by_key(|k| k.as_str());
        keys
    }
}

pub(crate) fn check_known(known: &[Sample], required: usize) -> Result<(), ModelFailure> {
    if known.len() < required {
        return Err(ModelFailure::InsufficientData {
            required,
            actual: known.len(),
        });
    }
    Ok(())
}
