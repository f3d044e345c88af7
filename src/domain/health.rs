// State-of-Health evaluation from first and latest capacity
use super::telemetry::Sample;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthTier {
    Excellent,
    Healthy,
    Monitor,
    Critical,
}

impl HealthTier {
    /// Inclusive lower bounds at 95, 90 and 80 percent
    pub fn from_percentage(percentage: f64) -> Self {
        if percentage >= 95.0 {
            HealthTier::Excellent
        } else if percentage >= 90.0 {
            HealthTier::Healthy
        } else if percentage >= 80.0 {
            HealthTier::Monitor
        } else {
            HealthTier::Critical
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            HealthTier::Excellent => "Excellent",
            HealthTier::Healthy => "Healthy",
            HealthTier::Monitor => "Monitor",
            HealthTier::Critical => "Critical",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SoHAssessment {
    pub percentage: f64,
    pub tier: HealthTier,
    /// Annualised capacity loss, percent per year
    pub annual_fade_rate: f64,
    pub first_capacity: f64,
    pub latest_capacity: f64,
    pub months: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum HealthAssessment {
    Assessed(SoHAssessment),
    /// First or latest capacity is zero or missing
    Unknown,
}

impl HealthAssessment {
    pub fn assessed(&self) -> Option<&SoHAssessment> {
        match self {
            HealthAssessment::Assessed(assessment) => Some(assessment),
            HealthAssessment::Unknown => None,
        }
    }
}

/// Assess a run of samples (a whole series or a display window).
///
/// Pure; callers recompute whenever the samples change.
pub fn evaluate(samples: &[Sample]) -> HealthAssessment {
    let (Some(first), Some(latest)) = (samples.first(), samples.last()) else {
        return HealthAssessment::Unknown;
    };
    let (first_capacity, latest_capacity) = (first.capacity, latest.capacity);
    if !usable(first_capacity) || !usable(latest_capacity) {
        return HealthAssessment::Unknown;
    }

    let percentage = latest_capacity / first_capacity * 100.0;
    let months = samples.len();
    let annual_fade_rate = if months == 1 {
        0.0
    } else {
        (first_capacity - latest_capacity) / first_capacity * (12.0 / months as f64) * 100.0
    };

    HealthAssessment::Assessed(SoHAssessment {
        percentage,
        tier: HealthTier::from_percentage(percentage),
        annual_fade_rate,
        first_capacity,
        latest_capacity,
        months,
    })
}

fn usable(capacity: f64) -> bool {
    capacity.is_finite() && capacity != 0.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::telemetry::MonthKey;
    use crate::domain::telemetry::fixtures::series_from;

    fn start() -> MonthKey {
        MonthKey::new(2019, 1).unwrap()
    }

    #[test]
    fn test_thirteen_month_example() {
        // 140 Ah fading to 126 Ah over 2019-01..2020-01
        let capacities: Vec<f64> = (0..13)
            .map(|i| if i == 12 { 126.0 } else { 140.0 - i as f64 })
            .collect();
        let series = series_from(1, start(), &capacities);

        let assessment = evaluate(series.samples());
        let soh = assessment.assessed().unwrap();
        assert!((soh.percentage - 90.0).abs() < 1e-9);
        assert_eq!(soh.tier, HealthTier::Healthy);
        assert!((soh.annual_fade_rate - 9.2308).abs() < 1e-3);
        assert_eq!(soh.months, 13);
    }

    #[test]
    fn test_flat_capacity_is_excellent() {
        let series = series_from(1, start(), &[132.0, 120.0, 132.0]);
        let soh = evaluate(series.samples()).assessed().cloned().unwrap();
        assert_eq!(soh.percentage, 100.0);
        assert_eq!(soh.tier, HealthTier::Excellent);
        assert_eq!(soh.annual_fade_rate, 0.0);
    }

    #[test]
    fn test_single_sample_has_zero_fade() {
        let series = series_from(1, start(), &[131.0]);
        let soh = evaluate(series.samples()).assessed().cloned().unwrap();
        assert_eq!(soh.percentage, 100.0);
        assert_eq!(soh.annual_fade_rate, 0.0);
    }

    #[test]
    fn test_zero_capacity_is_unknown() {
        let series = series_from(1, start(), &[0.0, 120.0]);
        assert_eq!(evaluate(series.samples()), HealthAssessment::Unknown);

        let series = series_from(1, start(), &[140.0, 0.0]);
        assert_eq!(evaluate(series.samples()), HealthAssessment::Unknown);
        assert_eq!(evaluate(&[]), HealthAssessment::Unknown);
    }

    #[test]
    fn test_tier_boundaries() {
        assert_eq!(HealthTier::from_percentage(120.0), HealthTier::Excellent);
        assert_eq!(HealthTier::from_percentage(95.0), HealthTier::Excellent);
        assert_eq!(HealthTier::from_percentage(94.999), HealthTier::Healthy);
        assert_eq!(HealthTier::from_percentage(90.0), HealthTier::Healthy);
        assert_eq!(HealthTier::from_percentage(89.999), HealthTier::Monitor);
        assert_eq!(HealthTier::from_percentage(80.0), HealthTier::Monitor);
        assert_eq!(HealthTier::from_percentage(79.999), HealthTier::Critical);
        assert_eq!(HealthTier::from_percentage(0.0), HealthTier::Critical);
    }

    #[test]
    fn test_tiers_are_monotone_over_range() {
        let rank = |t: HealthTier| match t {
            HealthTier::Critical => 0,
            HealthTier::Monitor => 1,
            HealthTier::Healthy => 2,
            HealthTier::Excellent => 3,
        };
        let mut previous = rank(HealthTier::from_percentage(0.0));
        for step in 0..=1200 {
            let current = rank(HealthTier::from_percentage(step as f64 / 10.0));
            assert!(current >= previous);
            previous = current;
        }
    }
}
