// Application state for HTTP handlers
use crate::application::alert_service::AlertService;
use crate::application::fleet_service::FleetService;
use crate::application::forecast_service::ForecastService;

#[derive(Clone)]
pub struct AppState {
    pub fleet_service: FleetService,
    pub forecast_service: ForecastService,
    pub alert_service: AlertService,
    /// Known months used when a forecast request leaves `n_known` out
    pub default_known: usize,
}
