//! Tracing initialization
//!
//! Shared subscriber setup so binaries and tests configure logging the
//! same way.

use crate::config::ObservabilitySettings;
use tracing_subscriber::EnvFilter;

/// Initialize the global tracing subscriber
///
/// Safe to call more than once; later calls are no-ops.
pub fn init(settings: &ObservabilitySettings) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(settings.log_level.clone()));

    if settings.json_logging {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .json()
            .try_init();
    } else {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .try_init();
    }

    tracing::debug!(
        service = %settings.service_name,
        version = crate::VERSION,
        "Telemetry initialized"
    );
}
