// Main entry point - Dependency injection and server setup
mod application;
mod domain;
mod infrastructure;
mod presentation;

use std::{net::SocketAddr, sync::Arc, time::Duration};

use anyhow::Context;
use futures::StreamExt;
use tokio_stream::wrappers::IntervalStream;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use crate::application::alert_service::AlertService;
use crate::application::fleet_service::FleetService;
use crate::application::forecast_orchestrator::ForecastOrchestrator;
use crate::application::forecast_service::ForecastService;
use crate::application::telemetry_repository::TelemetryRepository;
use crate::infrastructure::chart_renderer::PngChartRenderer;
use crate::infrastructure::config::{TelemetrySource, load_model_artifacts, load_service_config};
use crate::infrastructure::file_repository::FileTelemetryRepository;
use crate::infrastructure::http_repository::HttpTelemetryRepository;
use crate::infrastructure::models::build_registry;
use crate::presentation::app_state::AppState;

async fn build_repository(source: &TelemetrySource) -> anyhow::Result<Arc<dyn TelemetryRepository>> {
    Ok(match source {
        TelemetrySource::File { path } => Arc::new(FileTelemetryRepository::load(path).await?),
        TelemetrySource::Http {
            base_url,
            token,
            vehicles_path,
            telemetry_path,
        } => Arc::new(HttpTelemetryRepository::new(
            base_url.clone(),
            token.clone(),
            vehicles_path.clone(),
            telemetry_path.clone(),
        )),
    })
}

/// Synthesize one alert per interval until the process exits
fn spawn_alert_ticker(alert_service: AlertService, every: Duration) {
    let mut ticks = IntervalStream::new(tokio::time::interval(every));
    tokio::spawn(async move {
        while ticks.next().await.is_some() {
            if let Err(e) = alert_service.tick(chrono::Utc::now()).await {
                tracing::warn!(error = %e, "alert tick failed");
            }
        }
    });
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = load_service_config()?;

    // Initialize tracing; RUST_LOG wins over the configured filter
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&config.logging.filter))?;
    tracing_subscriber::fmt().with_env_filter(filter).init();

    // Create repository (infrastructure layer)
    let repository = build_repository(&config.telemetry).await?;
    let artifacts = load_model_artifacts(&config.models_path)?;

    // Create services (application layer)
    let mut orchestrator = ForecastOrchestrator::new(build_registry(&artifacts), config.forecast.max_horizon);
    if config.forecast.render_charts {
        orchestrator = orchestrator.with_renderer(Arc::new(PngChartRenderer::default()));
    }
    let forecast_service = ForecastService::new(
        orchestrator,
        config.forecast.max_concurrent,
        config.forecast.timeout(),
    );
    let fleet_service = FleetService::new(repository);
    let alert_service = AlertService::new(fleet_service.clone(), config.alerts.capacity, config.alerts.seed);

    if config.alerts.interval_secs > 0 {
        spawn_alert_ticker(alert_service.clone(), Duration::from_secs(config.alerts.interval_secs));
    }

    // Create application state
    let state = Arc::new(AppState {
        fleet_service,
        forecast_service,
        alert_service,
        default_known: config.forecast.default_known,
    });

    // Build router (presentation layer)
    let router = presentation::router(state).layer(TraceLayer::new_for_http());

    // Start server
    let addr: SocketAddr = config
        .server
        .address
        .parse()
        .with_context(|| format!("Invalid server address '{}'", config.server.address))?;
    tracing::info!(%addr, "Starting fleet-battery-health service");

    axum::serve(tokio::net::TcpListener::bind(addr).await?, router).await?;

    Ok(())
}
