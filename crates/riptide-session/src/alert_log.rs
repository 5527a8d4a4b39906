//! Re-logs engine alerts under the engine log target.

use riptide_telemetry::ENGINE_TARGET;
use riptide_torrent_core::AlertCategory;
use tokio::task::JoinHandle;
use tracing::{Level, debug, error, info, warn};

use crate::pump::AlertHub;

/// Log level for an alert category; the first matching bit wins in the order
/// error, debug, performance warning.
#[must_use]
pub const fn alert_level(category: AlertCategory) -> Level {
    if category.intersects(AlertCategory::ERROR) {
        Level::ERROR
    } else if category.intersects(AlertCategory::DEBUG) {
        Level::DEBUG
    } else if category.intersects(AlertCategory::PERFORMANCE_WARNING) {
        Level::WARN
    } else {
        Level::INFO
    }
}

/// Subscribe to `hub` and log every alert until the hub shuts down.
///
/// The subscription is registered before this returns, so no alert published
/// afterwards is missed.
#[must_use]
pub fn spawn_alert_logger(hub: &AlertHub) -> JoinHandle<()> {
    let (mut alerts, done) = hub.subscribe();
    tokio::spawn(async move {
        while let Some(alert) = alerts.recv().await {
            let what = alert.what.as_str();
            let message = alert.message.as_str();
            match alert_level(alert.category) {
                Level::ERROR => error!(target: ENGINE_TARGET, "{what}: {message}"),
                Level::DEBUG => debug!(target: ENGINE_TARGET, "{what}: {message}"),
                Level::WARN => warn!(target: ENGINE_TARGET, "{what}: {message}"),
                _ => info!(target: ENGINE_TARGET, "{what}: {message}"),
            }
        }
        done.close();
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use riptide_torrent_core::{Alert, AlertKind};

    #[test]
    fn level_follows_category_precedence() {
        let cases = [
            (AlertCategory::ERROR | AlertCategory::DEBUG, Level::ERROR),
            (AlertCategory::DEBUG | AlertCategory::PERFORMANCE_WARNING, Level::DEBUG),
            (AlertCategory::PERFORMANCE_WARNING, Level::WARN),
            (AlertCategory::STATUS | AlertCategory::STORAGE, Level::INFO),
            (AlertCategory::NONE, Level::INFO),
        ];
        for (category, level) in cases {
            assert_eq!(alert_level(category), level, "{category:?}");
        }
    }

    #[tokio::test]
    async fn logger_exits_when_hub_shuts_down() {
        let hub = AlertHub::new();
        let logger = spawn_alert_logger(&hub);
        assert_eq!(hub.subscriber_count(), 1);

        hub.publish(Alert::new(
            AlertKind::TorrentError,
            AlertCategory::ERROR,
            "torrent_error",
            "disk full",
        ));
        hub.shutdown();
        logger.await.expect("logger task");
    }
}
