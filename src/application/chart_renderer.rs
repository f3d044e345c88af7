// Chart rendering port for forecast artifacts
use crate::domain::forecast::PredictedPoint;
use crate::domain::telemetry::Sample;
use bytes::Bytes;

/// Renders recorded capacity against a forecast into an image.
///
/// Implementations must be pure: the returned bytes are the only output.
pub trait ChartRenderer: Send + Sync {
    fn render(&self, actual: &[Sample], predicted: &[PredictedPoint], model_label: &str) -> anyhow::Result<Bytes>;
}
