//! Encoder/decoder forecaster with a residual Gaussian-process correction.
//!
//! The encoder folds the known window into a damped (level, trend) latent
//! state. The decoder unrolls that state one month at a time and feeds each
//! corrected output back in as the next observation. The residual GP is
//! trained on the encoder's one-step errors against calendar month and
//! average temperatures, so seasonal and thermal effects are corrected on
//! top of the smooth fade.

use super::linalg::{GaussianProcess, Standardizer};
use crate::application::forecast_model::{FittedModel, ForecastModel, check_known};
use crate::domain::forecast::{ModelFailure, ModelKey};
use crate::domain::telemetry::{MonthKey, Sample};
use crate::infrastructure::config::Seq2SeqArtifact;

pub struct Seq2SeqGprModel {
    artifact: Seq2SeqArtifact,
}

impl Seq2SeqGprModel {
    pub fn new(artifact: Seq2SeqArtifact) -> Self {
        Self { artifact }
    }
}

#[derive(Debug, Clone, Copy)]
struct Latent {
    level: f64,
    trend: f64,
}

#[derive(Debug, Clone, Copy)]
struct Gains {
    level: f64,
    trend: f64,
    damping: f64,
}

impl Gains {
    fn one_step(&self, state: Latent) -> f64 {
        state.level + self.damping * state.trend
    }

    fn update(&self, state: Latent, observed: f64) -> Latent {
        let forecast = self.one_step(state);
        let level = self.level * observed + (1.0 - self.level) * forecast;
        let trend = self.trend * (level - state.level) + (1.0 - self.trend) * self.damping * state.trend;
        Latent { level, trend }
    }
}

/// Per-column scaling of the residual features
#[derive(Debug, Clone)]
struct FeatureScaler {
    columns: Vec<Standardizer>,
}

impl FeatureScaler {
    fn fit(rows: &[[f64; 3]]) -> Self {
        let columns = (0..3)
            .map(|c| Standardizer::fit(&rows.iter().map(|r| r[c]).collect::<Vec<_>>()))
            .collect();
        Self { columns }
    }

    fn apply(&self, row: [f64; 3]) -> Vec<f64> {
        row.iter().zip(&self.columns).map(|(v, s)| s.apply(*v)).collect()
    }
}

/// (calendar month, max temp, min temp) with gaps filled from the last seen value
fn features(samples: &[Sample]) -> Vec<[f64; 3]> {
    let mut temp_max = samples.iter().find_map(|s| s.temp_max).unwrap_or(0.0);
    let mut temp_min = samples.iter().find_map(|s| s.temp_min).unwrap_or(0.0);
    samples
        .iter()
        .map(|s| {
            temp_max = s.temp_max.unwrap_or(temp_max);
            temp_min = s.temp_min.unwrap_or(temp_min);
            [f64::from(s.month.month()), temp_max, temp_min]
        })
        .collect()
}

struct FittedSeq2Seq {
    gains: Gains,
    state: Latent,
    scaler: FeatureScaler,
    residuals: Standardizer,
    gp: GaussianProcess,
    last_month: MonthKey,
    last_temps: (f64, f64),
}

impl ForecastModel for Seq2SeqGprModel {
    fn key(&self) -> ModelKey {
        ModelKey::Seq2seqGpr
    }

    fn label(&self) -> &str {
        "Seq2Seq-I + GPR-I"
    }

    fn fit(&self, known: &[Sample]) -> Result<Box<dyn FittedModel>, ModelFailure> {
        check_known(known, 3)?;

        let gains = Gains {
            level: self.artifact.level_gain,
            trend: self.artifact.trend_gain,
            damping: self.artifact.damping,
        };
        let in_unit = |g: f64| (0.0..=1.0).contains(&g);
        if !(in_unit(gains.level) && in_unit(gains.trend) && in_unit(gains.damping)) {
            return Err(ModelFailure::Numerical("encoder gains must lie in [0, 1]".to_string()));
        }

        // Encode
        let mut state = Latent {
            level: known[0].capacity,
            trend: known[1].capacity - known[0].capacity,
        };
        let mut errors = Vec::with_capacity(known.len() - 1);
        for sample in &known[1..] {
            errors.push(sample.capacity - gains.one_step(state));
            state = gains.update(state, sample.capacity);
        }

        let rows = features(known);
        let scaler = FeatureScaler::fit(&rows[1..]);
        let residuals = Standardizer::fit(&errors);
        let inputs: Vec<Vec<f64>> = rows[1..].iter().map(|r| scaler.apply(*r)).collect();
        let targets: Vec<f64> = errors.iter().map(|e| residuals.apply(*e)).collect();
        let gp = GaussianProcess::fit(inputs, &targets, &self.artifact.residual)?;

        let [_, last_max, last_min] = rows[rows.len() - 1];
        Ok(Box::new(FittedSeq2Seq {
            gains,
            state,
            scaler,
            residuals,
            gp,
            last_month: known[known.len() - 1].month,
            last_temps: (last_max, last_min),
        }))
    }
}

impl FittedModel for FittedSeq2Seq {
    fn predict(&self, horizon: usize) -> Result<Vec<f64>, ModelFailure> {
        let mut state = self.state;
        let mut month = self.last_month;
        let (temp_max, temp_min) = self.last_temps;
        let mut decoded = Vec::with_capacity(horizon);

        for _ in 0..horizon {
            month = month.succ();
            let row = [f64::from(month.month()), temp_max, temp_min];
            let correction = self.residuals.invert(self.gp.predict(&self.scaler.apply(row)));

            let value = self.gains.one_step(state) + correction;
            if !value.is_finite() {
                return Err(ModelFailure::Numerical(format!("decoder diverged at {month}")));
            }
            decoded.push(value);
            state = self.gains.update(state, value);
        }
        Ok(decoded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn samples(capacities: &[f64]) -> Vec<Sample> {
        let mut month = MonthKey::new(2019, 1).unwrap();
        capacities
            .iter()
            .map(|c| {
                let m = f64::from(month.month());
                let sample = Sample::new(month, *c).with_temperatures(25.0 + m, 8.0 + m / 2.0);
                month = month.succ();
                sample
            })
            .collect()
    }

    #[test]
    fn test_linear_fade_is_tracked() {
        let model = Seq2SeqGprModel::new(Seq2SeqArtifact {
            damping: 1.0,
            ..Seq2SeqArtifact::default()
        });
        let known = samples(&[140.0, 139.0, 138.0, 137.0, 136.0, 135.0]);

        let predicted = model.fit(&known).unwrap().predict(3).unwrap();
        assert_eq!(predicted.len(), 3);
        for (k, value) in predicted.iter().enumerate() {
            let expected = 134.0 - k as f64;
            assert!((value - expected).abs() < 1e-9, "{value} vs {expected}");
        }
    }

    #[test]
    fn test_damped_trend_flattens() {
        let model = Seq2SeqGprModel::new(Seq2SeqArtifact::default());
        let known = samples(&[140.0, 138.8, 138.1, 136.9, 136.2, 135.1, 134.3, 133.0]);

        let predicted = model.fit(&known).unwrap().predict(24).unwrap();
        assert!(predicted.iter().all(|v| v.is_finite()));
        let early = predicted[0] - predicted[1];
        let late = predicted[22] - predicted[23];
        assert!(late.abs() < early.abs() + 0.5);
        assert!(predicted[23] < 133.0);
    }

    #[test]
    fn test_missing_temperatures_are_tolerated() {
        let model = Seq2SeqGprModel::new(Seq2SeqArtifact::default());
        let mut known = samples(&[140.0, 139.0, 138.5, 137.0]);
        for sample in &mut known {
            sample.temp_max = None;
            sample.temp_min = None;
        }
        assert_eq!(model.fit(&known).unwrap().predict(5).unwrap().len(), 5);
    }

    #[test]
    fn test_needs_three_points() {
        let model = Seq2SeqGprModel::new(Seq2SeqArtifact::default());
        let err = model.fit(&samples(&[140.0, 139.0])).err().unwrap();
        assert_eq!(err, ModelFailure::InsufficientData { required: 3, actual: 2 });
    }
}
