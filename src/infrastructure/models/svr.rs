//! Epsilon-insensitive support vector regression on monthly capacity deltas.
//!
//! The last `lags` standardized deltas predict the next one. The dual is
//! solved without a bias term by cyclic coordinate descent:
//!
//! `min ½ βᵀKβ − yᵀβ + ε‖β‖₁  subject to  |βᵢ| ≤ C`
//!
//! Forecasts are produced by rolling the predicted deltas forward.

use super::linalg::{Standardizer, rbf};
use crate::application::forecast_model::{FittedModel, ForecastModel, check_known};
use crate::domain::forecast::{ModelFailure, ModelKey};
use crate::domain::telemetry::Sample;
use crate::infrastructure::config::SvrArtifact;

pub struct SvrModel {
    artifact: SvrArtifact,
}

impl SvrModel {
    pub fn new(artifact: SvrArtifact) -> Self {
        Self { artifact }
    }

    fn kernel(&self, a: &[f64], b: &[f64]) -> f64 {
        // exp(-γ‖a-b‖²) written as an RBF with length scale 1/sqrt(2γ)
        rbf(a, b, (1.0 / (2.0 * self.artifact.gamma)).sqrt(), 1.0)
    }

    fn solve(&self, inputs: &[Vec<f64>], targets: &[f64]) -> Result<Vec<f64>, ModelFailure> {
        let n = inputs.len();
        let gram: Vec<Vec<f64>> = inputs
            .iter()
            .map(|a| inputs.iter().map(|b| self.kernel(a, b)).collect())
            .collect();

        let SvrArtifact { c, epsilon, max_iter, tolerance, .. } = self.artifact;
        let mut beta = vec![0.0; n];

        for _ in 0..max_iter {
            let mut max_step: f64 = 0.0;
            for i in 0..n {
                let kii = gram[i][i];
                let gradient: f64 = (0..n).map(|j| gram[i][j] * beta[j]).sum::<f64>() - targets[i];
                let z = kii * beta[i] - gradient;
                let updated = (soft_threshold(z, epsilon) / kii).clamp(-c, c);

                max_step = max_step.max((updated - beta[i]).abs());
                beta[i] = updated;
            }
            if max_step < tolerance {
                return Ok(beta);
            }
        }
        Err(ModelFailure::NotConverged { iterations: max_iter })
    }
}

fn soft_threshold(value: f64, threshold: f64) -> f64 {
    value.signum() * (value.abs() - threshold).max(0.0)
}

struct FittedSvr {
    gamma: f64,
    support: Vec<Vec<f64>>,
    beta: Vec<f64>,
    deltas: Standardizer,
    /// Most recent standardized deltas, oldest first
    window: Vec<f64>,
    last_capacity: f64,
}

impl FittedSvr {
    fn decision_value(&self, x: &[f64]) -> f64 {
        let length_scale = (1.0 / (2.0 * self.gamma)).sqrt();
        self.support
            .iter()
            .zip(&self.beta)
            .map(|(s, b)| b * rbf(s, x, length_scale, 1.0))
            .sum()
    }
}

impl ForecastModel for SvrModel {
    fn key(&self) -> ModelKey {
        ModelKey::Svr
    }

    fn label(&self) -> &str {
        "SVR"
    }

    fn fit(&self, known: &[Sample]) -> Result<Box<dyn FittedModel>, ModelFailure> {
        let SvrArtifact { lags, gamma, c, .. } = self.artifact;
        if lags == 0 || gamma <= 0.0 || c <= 0.0 {
            return Err(ModelFailure::Numerical("invalid SVR hyperparameters".to_string()));
        }
        check_known(known, lags + 2)?;

        let raw: Vec<f64> = known.windows(2).map(|w| w[1].capacity - w[0].capacity).collect();
        let scaler = Standardizer::fit(&raw);
        let deltas: Vec<f64> = raw.iter().map(|d| scaler.apply(*d)).collect();

        let inputs: Vec<Vec<f64>> = deltas.windows(lags + 1).map(|w| w[..lags].to_vec()).collect();
        let targets: Vec<f64> = deltas.windows(lags + 1).map(|w| w[lags]).collect();

        let beta = self.solve(&inputs, &targets)?;
        tracing::debug!(
            support_vectors = beta.iter().filter(|b| b.abs() > 0.0).count(),
            samples = inputs.len(),
            "svr fitted"
        );

        Ok(Box::new(FittedSvr {
            gamma,
            support: inputs,
            beta,
            deltas: scaler,
            window: deltas[deltas.len() - lags..].to_vec(),
            last_capacity: known[known.len() - 1].capacity,
        }))
    }
}

impl FittedModel for FittedSvr {
    fn predict(&self, horizon: usize) -> Result<Vec<f64>, ModelFailure> {
        let mut window = self.window.clone();
        let mut capacity = self.last_capacity;
        let mut predicted = Vec::with_capacity(horizon);

        for _ in 0..horizon {
            let next = self.decision_value(&window);
            capacity += self.deltas.invert(next);
            predicted.push(capacity);

            window.remove(0);
            window.push(next);
        }
        Ok(predicted)
    }
}
