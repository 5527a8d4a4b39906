//! # Design
//!
//! - Centralize application-level errors for bootstrap and service lifecycle.
//! - Keep error messages constant while carrying context fields for debugging.
//! - Preserve source errors without re-logging at call sites.

use std::io;

use thiserror::Error;

/// Result alias for application operations.
pub type AppResult<T> = Result<T, AppError>;

/// Application-level error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Configuration operations failed.
    #[error("configuration operation failed")]
    Config {
        /// Operation identifier.
        operation: &'static str,
        /// Source configuration error.
        source: riptide_config::ConfigError,
    },
    /// Engine session operations failed.
    #[error("session operation failed")]
    Session {
        /// Operation identifier.
        operation: &'static str,
        /// Source session error.
        source: riptide_session::SessionError,
    },
    /// Telemetry operations failed.
    #[error("telemetry operation failed")]
    Telemetry {
        /// Operation identifier.
        operation: &'static str,
        /// Source telemetry error.
        source: riptide_telemetry::TelemetryError,
    },
    /// Waiting for the process shutdown signal failed.
    #[error("shutdown signal failed")]
    Signal {
        /// Source IO error.
        source: io::Error,
    },
}

impl AppError {
    pub(crate) const fn config(
        operation: &'static str,
        source: riptide_config::ConfigError,
    ) -> Self {
        Self::Config { operation, source }
    }

    pub(crate) const fn session(
        operation: &'static str,
        source: riptide_session::SessionError,
    ) -> Self {
        Self::Session { operation, source }
    }

    pub(crate) const fn telemetry(
        operation: &'static str,
        source: riptide_telemetry::TelemetryError,
    ) -> Self {
        Self::Telemetry { operation, source }
    }
}
