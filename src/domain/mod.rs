// Domain layer - Pure battery telemetry models and algorithms
pub mod alert;
pub mod forecast;
pub mod health;
pub mod telemetry;
pub mod vehicle;
pub mod window;
