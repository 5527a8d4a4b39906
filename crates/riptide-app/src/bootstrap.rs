//! Process-level wiring: logging, configuration, metrics and the service.

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

use riptide_config::Configuration;
use riptide_telemetry::{LoggingConfig, Metrics, init_logging};
use riptide_torrent_core::{EngineSession, ProgressUi};
use tracing::info;

use crate::error::{AppError, AppResult};
use crate::service::{BtService, ServiceDependencies};

/// Dependencies required to bootstrap the application.
pub struct BootstrapDependencies {
    /// Logging setup installed before anything else runs.
    pub logging: LoggingConfig<'static>,
    /// JSON configuration document.
    pub config_path: PathBuf,
    /// Engine session supplied by the embedding process.
    pub session: Arc<dyn EngineSession>,
    /// Progress dialog sink supplied by the embedding process.
    pub ui: Arc<dyn ProgressUi>,
}

/// Install logging, start the service and run until Ctrl-C.
///
/// # Errors
///
/// Returns an error if logging cannot be installed, the configuration cannot
/// be loaded, or the service fails to start.
pub async fn run_app(dependencies: BootstrapDependencies) -> AppResult<()> {
    init_logging(&dependencies.logging)
        .map_err(|err| AppError::telemetry("telemetry.init", err))?;
    run_until(dependencies, async {
        tokio::signal::ctrl_c()
            .await
            .map_err(|source| AppError::Signal { source })
    })
    .await
}

/// Boot sequence that stops when `shutdown` resolves; logging must already be
/// installed.
///
/// # Errors
///
/// Returns an error if the configuration cannot be loaded, the service fails
/// to start, or `shutdown` itself fails. The service is closed in the last
/// case too.
pub async fn run_until<F>(dependencies: BootstrapDependencies, shutdown: F) -> AppResult<()>
where
    F: Future<Output = AppResult<()>>,
{
    let BootstrapDependencies {
        logging: _,
        config_path,
        session,
        ui,
    } = dependencies;

    info!(path = %config_path.display(), "riptide bootstrap starting");
    let validated = Configuration::load(&config_path)
        .await
        .map_err(|err| AppError::config("config.load", err))?;
    let metrics = Metrics::new().map_err(|err| AppError::telemetry("telemetry.metrics", err))?;

    let service = BtService::start(ServiceDependencies {
        session,
        ui,
        metrics,
        config: validated.config,
    })
    .await?;

    let outcome = shutdown.await;
    service.close().await;
    outcome
}
