// Forecast model adapters backed by offline artifacts
pub mod gpr;
pub mod linalg;
pub mod seq2seq_gpr;
pub mod svr;

use crate::application::forecast_model::ModelRegistry;
use crate::infrastructure::config::ModelArtifacts;
use std::sync::Arc;

/// Registry with every adapter configured from `artifacts`
pub fn build_registry(artifacts: &ModelArtifacts) -> ModelRegistry {
    ModelRegistry::new()
        .with_model(Arc::new(gpr::GprModel::new(artifacts.gpr.clone())))
        .with_model(Arc::new(svr::SvrModel::new(artifacts.svr.clone())))
        .with_model(Arc::new(seq2seq_gpr::Seq2SeqGprModel::new(artifacts.seq2seq.clone())))
}
