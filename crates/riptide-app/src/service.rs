//! Owned service context wiring the engine session to every background loop.
//!
//! # Design
//! - One explicitly constructed [`BtService`] owns the engine session, the
//!   alert hub, the live configuration and every task handle.
//! - Start-up order: resume directory, settings, discovery services, alert
//!   consumers, pump, snapshot trigger, then (with background handling) the
//!   resume reload followed by the seeding loop.
//! - `close` tears consumers down before the session handle is released.

use std::sync::Arc;

use riptide_config::{ConfigReceiver, ConfigSender, Configuration, config_channel};
use riptide_events::{DoneSignal, Subscription};
use riptide_session::{
    AlertHub, AlertPump, LoadReport, ResumeLoader, ResumeWriter, SessionConfigurator,
    SnapshotTrigger, ensure_resume_dir, shutdown_channel, spawn_alert_logger,
};
use riptide_telemetry::Metrics;
use riptide_torrent_core::{Alert, EngineSession, ProgressUi};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::error::{AppError, AppResult};
use crate::seeding::SeedingPolicy;

/// Collaborators needed to start the service.
pub struct ServiceDependencies {
    /// Engine session to orchestrate.
    pub session: Arc<dyn EngineSession>,
    /// Sink for the background progress dialog.
    pub ui: Arc<dyn ProgressUi>,
    /// Shared metrics registry.
    pub metrics: Metrics,
    /// Validated configuration to start with.
    pub config: Configuration,
}

/// Running orchestration layer around one engine session.
pub struct BtService {
    session: Arc<dyn EngineSession>,
    configurator: SessionConfigurator,
    config_tx: ConfigSender,
    shutdown_tx: watch::Sender<bool>,
    hub: AlertHub,
    metrics: Metrics,
    load_report: Option<LoadReport>,
    pump: JoinHandle<()>,
    consumers: Vec<(&'static str, JoinHandle<()>)>,
    loops: Vec<(&'static str, JoinHandle<()>)>,
}

impl BtService {
    /// Configure the session and start every background loop.
    ///
    /// A resume directory that cannot be created is logged and the service
    /// continues without persistence.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Session`] when the engine rejects the initial
    /// settings or the discovery-service toggles.
    pub async fn start(dependencies: ServiceDependencies) -> AppResult<Self> {
        let ServiceDependencies {
            session,
            ui,
            metrics,
            config,
        } = dependencies;

        if let Err(err) = ensure_resume_dir(&config.resume_path).await {
            warn!(
                path = %config.resume_path.display(),
                error = %err,
                "resume directory unavailable"
            );
        }

        let (config_tx, config_rx) = config_channel(config);
        let configurator =
            SessionConfigurator::configure(Arc::clone(&session), Arc::clone(&config_rx.borrow()))
                .map_err(|err| AppError::session("session.configure", err))?;
        configurator
            .start_services()
            .map_err(|err| AppError::session("session.start_services", err))?;

        let hub = AlertHub::new();
        let consumers = vec![
            (
                "resume_writer",
                ResumeWriter::new(config_rx.clone(), metrics.clone()).spawn(&hub),
            ),
            ("alert_logger", spawn_alert_logger(&hub)),
        ];

        let (shutdown_tx, shutdown_rx) = shutdown_channel();
        let pump = AlertPump::new(Arc::clone(&session), hub.clone(), metrics.clone())
            .spawn(shutdown_rx.clone());

        let mut loops = vec![(
            "snapshot_trigger",
            SnapshotTrigger::new(Arc::clone(&session))
                .spawn(config_rx.clone(), shutdown_rx.clone()),
        )];

        let background = config_rx.borrow().background_handling;
        let mut load_report = None;
        if background {
            let (resume_path, download_path) = {
                let current = config_rx.borrow();
                (current.resume_path.clone(), current.download_path.clone())
            };
            let report = ResumeLoader::new(Arc::clone(&session), metrics.clone())
                .load(&resume_path, &download_path)
                .await;
            load_report = Some(report);

            let policy = SeedingPolicy::new(Arc::clone(&session), ui, metrics.clone());
            loops.push(("seeding_policy", policy.spawn(config_rx, shutdown_rx)));
        } else {
            info!("background handling disabled; skipping resume reload and seeding policy");
        }

        info!("torrent service started");
        Ok(Self {
            session,
            configurator,
            config_tx,
            shutdown_tx,
            hub,
            metrics,
            load_report,
            pump,
            consumers,
            loops,
        })
    }

    /// Replace the configuration: validate it, stop services, apply new
    /// settings, start services, then publish the new snapshot to every loop.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Config`] when `config` fails validation and
    /// [`AppError::Session`] when the engine rejects a step. Neither case
    /// publishes the new configuration.
    pub async fn reconfigure(&self, config: Configuration) -> AppResult<()> {
        let validated = config
            .validate()
            .map_err(|err| AppError::config("config.validate", err))?;
        let config = validated.config;
        if let Err(err) = ensure_resume_dir(&config.resume_path).await {
            warn!(
                path = %config.resume_path.display(),
                error = %err,
                "resume directory unavailable"
            );
        }
        let config = Arc::new(config);
        self.configurator
            .reconfigure(Arc::clone(&config))
            .map_err(|err| AppError::session("session.reconfigure", err))?;
        self.config_tx.send_replace(config);
        info!(warnings = validated.warnings.len(), "configuration replaced");
        Ok(())
    }

    /// Register an additional alert subscriber.
    #[must_use]
    pub fn subscribe(&self) -> (Subscription<Alert>, DoneSignal<Alert>) {
        self.hub.subscribe()
    }

    /// Receiver for the live configuration.
    #[must_use]
    pub fn config_receiver(&self) -> ConfigReceiver {
        self.config_tx.subscribe()
    }

    /// Configuration currently applied.
    #[must_use]
    pub fn config(&self) -> Arc<Configuration> {
        self.configurator.config()
    }

    /// Engine session being orchestrated.
    #[must_use]
    pub const fn session(&self) -> &Arc<dyn EngineSession> {
        &self.session
    }

    /// Shared metrics registry.
    #[must_use]
    pub const fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Outcome of the start-up resume reload, if it ran.
    #[must_use]
    pub const fn load_report(&self) -> Option<&LoadReport> {
        self.load_report.as_ref()
    }

    /// Ordered shutdown: signal every loop, wait for the pump (which shuts the
    /// hub down), wait for the subscribers to drain, stop discovery services,
    /// and only then release the session.
    pub async fn close(self) {
        info!("torrent service stopping");
        self.shutdown_tx.send_replace(true);

        for (name, task) in self.loops {
            if let Err(err) = task.await {
                warn!(task = name, error = %err, "background loop join failed");
            }
        }
        if let Err(err) = self.pump.await {
            warn!(task = "alert_pump", error = %err, "alert pump join failed");
        }
        // No-op unless the pump panicked.
        self.hub.shutdown();
        for (name, task) in self.consumers {
            if let Err(err) = task.await {
                warn!(task = name, error = %err, "alert consumer join failed");
            }
        }

        if let Err(err) = self.configurator.stop_services() {
            warn!(error = %err, "failed to stop discovery services");
        }
        drop(self.configurator);
        drop(self.session);
        info!("torrent service stopped");
    }
}
