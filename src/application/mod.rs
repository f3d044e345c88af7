// Application layer - Use cases and ports
pub mod alert_service;
pub mod chart_renderer;
pub mod fleet_service;
pub mod forecast_model;
pub mod forecast_orchestrator;
pub mod forecast_service;
pub mod operator_context;
pub mod telemetry_repository;
