// Vehicle summary for the fleet overview
use super::telemetry::{MonthKey, TelemetrySeries, VehicleId};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VehicleSummary {
    pub vehicle_id: VehicleId,
    pub n_samples: usize,
    pub cap_min: f64,
    pub cap_max: f64,
    pub t_min: MonthKey,
    pub t_max: MonthKey,
}

impl VehicleSummary {
    pub fn from_series(series: &TelemetrySeries) -> Self {
        let (cap_min, cap_max) = series
            .samples()
            .iter()
            .map(|s| s.capacity)
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), c| (lo.min(c), hi.max(c)));

        Self {
            vehicle_id: series.vehicle_id(),
            n_samples: series.len(),
            cap_min,
            cap_max,
            t_min: series.first().month,
            t_max: series.last().month,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::telemetry::fixtures::series_from;

    #[test]
    fn test_summary_from_series() {
        let series = series_from(12, MonthKey::new(2019, 11).unwrap(), &[140.0, 141.5, 137.0]);
        let summary = VehicleSummary::from_series(&series);

        assert_eq!(summary.vehicle_id, 12);
        assert_eq!(summary.n_samples, 3);
        assert_eq!(summary.cap_min, 137.0);
        assert_eq!(summary.cap_max, 141.5);
        assert_eq!(summary.t_min.to_string(), "2019-11");
        assert_eq!(summary.t_max.to_string(), "2020-01");
    }
}
