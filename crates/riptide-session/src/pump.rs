//! Single reader of the engine alert queue.
//!
//! # Design
//! - The engine's wait primitive is blocking, so the pump runs on a blocking
//!   thread and bounds every wait so the shutdown flag is rechecked regularly.
//! - Alerts are decoded once here; subscribers only ever see [`Alert`].
//! - The whole drained batch is published in engine order before the next
//!   shutdown check, and the hub is shut down when the loop exits.

use std::sync::Arc;
use std::time::Duration;

use riptide_events::{Broadcaster, Delivery};
use riptide_telemetry::Metrics;
use riptide_torrent_core::{
    Alert, AlertKind, AlertPayload, EngineSession, NativeAlert, StatusQuery,
};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::shutdown::{ShutdownSignal, is_shutdown_requested};

/// Fan-out hub carrying decoded engine alerts.
pub type AlertHub = Broadcaster<Alert>;

/// Decode the kind-specific payload of a native alert.
///
/// Resume-data alerts read the owning torrent's hash and name through a single
/// status query. An alert whose payload cannot be recovered is still
/// forwarded, with [`AlertPayload::None`].
#[must_use]
pub fn decode_alert(native: NativeAlert) -> Alert {
    let kind = AlertKind::from_code(native.type_code);
    let payload = match kind {
        AlertKind::SaveResumeData => match (&native.torrent, native.resume_data) {
            (Some(torrent), Some(data)) => {
                let status = torrent.status(StatusQuery::NAME | StatusQuery::SAVE_PATH);
                AlertPayload::ResumeData {
                    info_hash: status.info_hash,
                    name: status.name,
                    data,
                }
            }
            _ => {
                warn!(what = %native.what, "resume-data alert without torrent or blob");
                AlertPayload::None
            }
        },
        AlertKind::SaveResumeDataFailed | AlertKind::TorrentError => {
            if let Some(torrent) = &native.torrent {
                let info_hash = torrent.status(StatusQuery::NONE).info_hash;
                let error = native.error.unwrap_or_else(|| native.message.clone());
                if kind == AlertKind::TorrentError {
                    AlertPayload::TorrentError { info_hash, error }
                } else {
                    AlertPayload::ResumeDataFailed { info_hash, error }
                }
            } else {
                warn!(what = %native.what, "failure alert without torrent");
                AlertPayload::None
            }
        }
        _ => AlertPayload::None,
    };

    Alert::new(kind, native.category, native.what, native.message).with_payload(payload)
}

/// Moves alerts from the engine into an [`AlertHub`].
pub struct AlertPump {
    session: Arc<dyn EngineSession>,
    hub: AlertHub,
    metrics: Metrics,
    wait: Duration,
}

impl AlertPump {
    /// Longest single wait on the engine before the shutdown flag is rechecked.
    pub const DEFAULT_WAIT: Duration = Duration::from_secs(1);

    /// Pump publishing into `hub`.
    #[must_use]
    pub fn new(session: Arc<dyn EngineSession>, hub: AlertHub, metrics: Metrics) -> Self {
        Self {
            session,
            hub,
            metrics,
            wait: Self::DEFAULT_WAIT,
        }
    }

    /// Override the engine wait timeout.
    #[must_use]
    pub const fn with_wait(mut self, wait: Duration) -> Self {
        self.wait = wait;
        self
    }

    /// Hub this pump publishes into.
    #[must_use]
    pub const fn hub(&self) -> &AlertHub {
        &self.hub
    }

    /// Wait once for alerts and publish the drained batch.
    ///
    /// Returns the number of alerts published.
    pub fn drain_once(&self) -> usize {
        if !self.session.wait_for_alert(self.wait) {
            return 0;
        }
        let batch = self.session.pop_alerts();
        let count = batch.len();
        for native in batch {
            let alert = decode_alert(native);
            match self.hub.publish(alert) {
                Delivery::Delivered { subscribers } => {
                    self.metrics.inc_alert_published();
                    debug!(subscribers, "alert published");
                }
                Delivery::Closed => {
                    debug!("alert dropped after hub shutdown");
                }
            }
        }
        count
    }

    /// Poll until `shutdown` is raised, then shut the hub down.
    pub fn run_blocking(&self, shutdown: &ShutdownSignal) {
        info!(wait = ?self.wait, "alert pump started");
        while !is_shutdown_requested(shutdown) {
            self.drain_once();
        }
        self.hub.shutdown();
        info!("alert pump stopped");
    }

    /// Run the pump on a blocking thread.
    #[must_use]
    pub fn spawn(self, shutdown: ShutdownSignal) -> JoinHandle<()> {
        tokio::task::spawn_blocking(move || self.run_blocking(&shutdown))
    }
}
