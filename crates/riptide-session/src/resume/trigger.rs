//! Periodic half of resume persistence: asks the engine for resume data.

use std::sync::Arc;
use std::time::Duration;

use riptide_config::ConfigReceiver;
use riptide_torrent_core::{EngineSession, SaveResumeFlags, StatusQuery};
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::shutdown::{ShutdownSignal, wait_for_shutdown};

/// Requests resume data for every torrent with unsaved state.
pub struct SnapshotTrigger {
    session: Arc<dyn EngineSession>,
}

impl SnapshotTrigger {
    /// Trigger for `session`.
    #[must_use]
    pub fn new(session: Arc<dyn EngineSession>) -> Self {
        Self { session }
    }

    /// Ask the engine to serialize every valid torrent that has metadata and
    /// needs a save. Returns the number of requests made.
    ///
    /// Nothing is written here; results arrive later as resume-data alerts.
    pub fn request_snapshots(&self) -> usize {
        let mut requested = 0;
        for torrent in self.session.torrents() {
            if !torrent.is_valid() {
                continue;
            }
            let status = torrent.status(StatusQuery::NONE);
            if status.has_metadata && status.need_save_resume {
                torrent.save_resume_data(SaveResumeFlags::FLUSH_DISK_CACHE);
                requested += 1;
            }
        }
        if requested > 0 {
            debug!(requested, "resume data requested");
        }
        requested
    }

    /// Tick every `session_save` seconds until shutdown.
    ///
    /// The interval is rebuilt whenever the configuration changes; an interval
    /// of zero parks the trigger until the next change.
    #[must_use]
    pub fn spawn(self, mut config: ConfigReceiver, mut shutdown: ShutdownSignal) -> JoinHandle<()> {
        tokio::spawn(async move {
            info!("resume snapshot trigger started");
            'outer: loop {
                let seconds = config.borrow_and_update().session_save;
                if seconds == 0 {
                    warn!("session_save is 0; resume snapshots paused");
                    tokio::select! {
                        () = wait_for_shutdown(&mut shutdown) => break,
                        changed = config.changed() => {
                            if changed.is_err() {
                                break;
                            }
                            continue;
                        }
                    }
                }

                let period = Duration::from_secs(seconds);
                let mut ticker = time::interval_at(time::Instant::now() + period, period);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
                loop {
                    tokio::select! {
                        () = wait_for_shutdown(&mut shutdown) => break 'outer,
                        changed = config.changed() => {
                            if changed.is_err() {
                                break 'outer;
                            }
                            continue 'outer;
                        }
                        _ = ticker.tick() => {
                            self.request_snapshots();
                        }
                    }
                }
            }
            info!("resume snapshot trigger stopped");
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use riptide_config::{Configuration, config_channel};
    use riptide_test_support::{FakeSession, TorrentCall, downloading, info_hash};
    use riptide_torrent_core::TorrentStatus;

    fn needing_save(byte: u8) -> TorrentStatus {
        TorrentStatus {
            need_save_resume: true,
            ..downloading(info_hash(byte), "t", 0.5)
        }
    }

    #[test]
    fn only_valid_torrents_with_metadata_and_pending_state_are_asked() {
        let session = FakeSession::new();
        let eligible = session.insert_torrent(needing_save(1));
        let clean = session.insert_torrent(downloading(info_hash(2), "clean", 0.5));
        let no_metadata = session.insert_torrent(TorrentStatus {
            has_metadata: false,
            ..needing_save(3)
        });
        let invalid = session.insert_torrent(needing_save(4));
        invalid.invalidate();

        let trigger = SnapshotTrigger::new(session.clone());
        assert_eq!(trigger.request_snapshots(), 1);
        assert_eq!(
            eligible.calls(),
            vec![TorrentCall::SaveResumeData(SaveResumeFlags::FLUSH_DISK_CACHE)]
        );
        assert!(clean.calls().is_empty());
        assert!(no_metadata.calls().is_empty());
        assert!(invalid.calls().is_empty());

        assert_eq!(trigger.request_snapshots(), 0, "save clears the pending flag");
    }

    #[tokio::test(start_paused = true)]
    async fn ticks_on_the_configured_interval_until_shutdown() {
        let session = FakeSession::new();
        let torrent = session.insert_torrent(needing_save(1));
        let (_config_tx, config) = config_channel(Configuration {
            session_save: 10,
            ..Configuration::default()
        });
        let (stop, signal) = crate::shutdown::shutdown_channel();
        let task = SnapshotTrigger::new(session.clone()).spawn(config, signal);

        time::sleep(Duration::from_secs(5)).await;
        assert!(torrent.calls().is_empty());
        time::sleep(Duration::from_secs(6)).await;
        assert_eq!(torrent.calls().len(), 1);

        stop.send_replace(true);
        task.await.expect("trigger task");
    }

    #[tokio::test(start_paused = true)]
    async fn zero_interval_parks_until_reconfigured() {
        let session = FakeSession::new();
        let torrent = session.insert_torrent(needing_save(1));
        let (config_tx, config) = config_channel(Configuration {
            session_save: 0,
            ..Configuration::default()
        });
        let (stop, signal) = crate::shutdown::shutdown_channel();
        let task = SnapshotTrigger::new(session.clone()).spawn(config, signal);

        time::sleep(Duration::from_secs(60)).await;
        assert!(torrent.calls().is_empty());

        config_tx.send_replace(Arc::new(Configuration {
            session_save: 2,
            ..Configuration::default()
        }));
        time::sleep(Duration::from_secs(3)).await;
        assert_eq!(torrent.calls().len(), 1);

        stop.send_replace(true);
        task.await.expect("trigger task");
    }
}
