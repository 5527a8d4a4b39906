//! Errors raised while installing logging or maintaining metrics.

use prometheus::Error as PrometheusError;
use thiserror::Error;
use tracing_subscriber::util::TryInitError;

/// Result alias for telemetry operations.
pub type Result<T> = std::result::Result<T, TelemetryError>;

/// Logging and metrics failures.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// A global tracing subscriber was already installed.
    #[error("logging subscriber could not be installed")]
    Logging {
        /// Operation identifier.
        operation: &'static str,
        /// Subscriber install failure.
        #[source]
        source: TryInitError,
    },
    /// A Prometheus collector could not be built, registered or rendered.
    #[error("metrics operation failed")]
    Metrics {
        /// Operation identifier.
        operation: &'static str,
        /// Metric involved, when the failure is tied to one collector.
        metric: Option<&'static str>,
        /// Prometheus failure.
        #[source]
        source: PrometheusError,
    },
}

impl TelemetryError {
    pub(crate) const fn metric(
        operation: &'static str,
        metric: &'static str,
        source: PrometheusError,
    ) -> Self {
        Self::Metrics {
            operation,
            metric: Some(metric),
            source,
        }
    }
}
