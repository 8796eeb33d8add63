use tracing_subscriber::EnvFilter;

pub enum LogServiceType {
    Register,
    Analysis,
    Live,
    Health,
    Other
}
impl LogServiceType {
    fn as_str(&self) -> &'static str {
        match self {
            LogServiceType::Register => "REGISTER",
            LogServiceType::Analysis => "ANALYSIS",
            LogServiceType::Live => "LIVE",
            LogServiceType::Health => "HEALTH",
            LogServiceType::Other => "OTHER"
        }
    }
}

/// Installs the fmt subscriber. `RUST_LOG` overrides the default `info` level.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,ort=warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

pub fn log_info(service: LogServiceType, message: String) {
    tracing::info!(service = service.as_str(), "{}", message)
}

pub fn log_warn(service: LogServiceType, message: String) {
    tracing::warn!(service = service.as_str(), "{}", message)
}

pub fn log_error(service: LogServiceType, message: String) {
    tracing::error!(service = service.as_str(), "{}", message)
}
