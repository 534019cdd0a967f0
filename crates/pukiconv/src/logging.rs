use tracing_subscriber::EnvFilter;

pub const LOG_FILTER_ENV: &str = "PUKICONV_LOG";
const DEFAULT_LOG_FILTER: &str = "warn";

/// Install the stderr subscriber. stdout stays reserved for progress lines.
pub fn init_logger() {
    let filter = EnvFilter::try_from_env(LOG_FILTER_ENV)
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
