//! Gaussian-process regression on the month index.
//!
//! Capacity is modelled as a least-squares linear trend plus a zero-mean GP
//! over the standardized residuals. Far from the known window the GP term
//! decays and the forecast follows the trend.

use super::linalg::{GaussianProcess, LinearTrend, Standardizer};
use crate::application::forecast_model::{FittedModel, ForecastModel, check_known};
use crate::domain::forecast::{ModelFailure, ModelKey};
use crate::domain::telemetry::Sample;
use crate::infrastructure::config::GprArtifact;

pub struct GprModel {
    artifact: GprArtifact,
}

impl GprModel {
    pub fn new(artifact: GprArtifact) -> Self {
        Self { artifact }
    }
}

struct FittedGpr {
    trend: LinearTrend,
    residuals: Standardizer,
    gp: GaussianProcess,
    known: usize,
}

impl ForecastModel for GprModel {
    fn key(&self) -> ModelKey {
        ModelKey::Gpr
    }

    fn label(&self) -> &str {
        "GPR"
    }

    fn fit(&self, known: &[Sample]) -> Result<Box<dyn FittedModel>, ModelFailure> {
        check_known(known, 2)?;

        let capacities: Vec<f64> = known.iter().map(|s| s.capacity).collect();
        let trend = LinearTrend::fit(&capacities)?;

        let residuals: Vec<f64> = capacities
            .iter()
            .enumerate()
            .map(|(t, y)| y - trend.at(t as f64))
            .collect();
        let scaler = Standardizer::fit(&residuals);
        let targets: Vec<f64> = residuals.iter().map(|r| scaler.apply(*r)).collect();
        let inputs: Vec<Vec<f64>> = (0..known.len()).map(|t| vec![t as f64]).collect();

        let gp = GaussianProcess::fit(inputs, &targets, &self.artifact.kernel)?;
        Ok(Box::new(FittedGpr {
            trend,
            residuals: scaler,
            gp,
            known: known.len(),
        }))
    }
}

impl FittedModel for FittedGpr {
    fn predict(&self, horizon: usize) -> Result<Vec<f64>, ModelFailure> {
        Ok((0..horizon)
            .map(|k| {
                let t = (self.known + k) as f64;
                self.trend.at(t) + self.residuals.invert(self.gp.predict(&[t]))
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::telemetry::MonthKey;

    fn samples(capacities: &[f64]) -> Vec<Sample> {
        let mut month = MonthKey::new(2020, 1).unwrap();
        capacities
            .iter()
            .map(|c| {
                let sample = Sample::new(month, *c);
                month = month.succ();
                sample
            })
            .collect()
    }

    #[test]
    fn test_linear_fade_is_extrapolated() {
        let model = GprModel::new(GprArtifact::default());
        let known = samples(&[140.0, 139.0, 138.0, 137.0, 136.0, 135.0]);

        let predicted = model.fit(&known).unwrap().predict(4).unwrap();
        assert_eq!(predicted.len(), 4);
        for (k, value) in predicted.iter().enumerate() {
            let expected = 134.0 - k as f64;
            assert!((value - expected).abs() < 1e-6, "{value} vs {expected}");
        }
    }

    #[test]
    fn test_noisy_series_stays_near_trend() {
        let model = GprModel::new(GprArtifact::default());
        let known = samples(&[140.0, 138.5, 138.9, 136.8, 136.1, 134.7, 134.9, 133.0]);

        let predicted = model.fit(&known).unwrap().predict(12).unwrap();
        assert!(predicted.iter().all(|v| v.is_finite()));
        assert!(predicted[11] < predicted[0]);
        assert!(predicted[11] > 120.0);
    }

    #[test]
    fn test_needs_two_points() {
        let model = GprModel::new(GprArtifact::default());
        let err = model.fit(&samples(&[140.0])).err().unwrap();
        assert_eq!(err, ModelFailure::InsufficientData { required: 2, actual: 1 });
    }
}
