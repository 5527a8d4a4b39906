//! Seeding policy enforcement and the rotating progress display.
//!
//! # Design
//! - Every decision for a torrent reads one status snapshot fetched once per tick.
//! - Limits are checked in a fixed order (seed time, seed-time ratio, share
//!   ratio); the first configured limit that is reached pauses the torrent.
//! - The progress dialog is opened lazily and closed whenever nothing is
//!   downloading, the session is paused, or the configuration is replaced.

use std::sync::Arc;
use std::time::Duration;

use riptide_config::{ConfigReceiver, Configuration};
use riptide_session::{ShutdownSignal, wait_for_shutdown};
use riptide_telemetry::Metrics;
use riptide_torrent_core::{
    EngineSession, InfoHash, PauseMode, ProgressDialog, ProgressUi, StatusQuery, TorrentStatus,
};
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, info};

/// Interval between policy passes.
pub const POLICY_INTERVAL: Duration = Duration::from_secs(5);

/// Heading shown on the progress dialog.
pub const PROGRESS_HEADING: &str = "Riptide";

/// Label shown when the dialog displays the aggregate.
pub const TOTAL_LABEL: &str = "Total";

/// Seeding limit that caused a pause.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyLimit {
    /// Seconds spent seeding reached `seed_time_limit`.
    SeedTime,
    /// Seeding time relative to download time reached `seed_time_ratio_limit`.
    SeedTimeRatio,
    /// Upload relative to download reached `share_ratio_limit`.
    ShareRatio,
}

impl PolicyLimit {
    /// Stable label used in logs and metrics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SeedTime => "seed_time",
            Self::SeedTimeRatio => "seed_time_ratio",
            Self::ShareRatio => "share_ratio",
        }
    }
}

/// Upload over download as an integer percentage; 0 when nothing was downloaded.
#[must_use]
pub fn share_ratio(status: &TorrentStatus) -> i64 {
    if status.all_time_download > 0 {
        status.all_time_upload.saturating_mul(100) / status.all_time_download
    } else {
        0
    }
}

/// Seeding time over download time as an integer percentage.
///
/// `None` when the download time (`active_time - finished_time`) is at most
/// one second.
#[must_use]
pub fn time_ratio(status: &TorrentStatus) -> Option<i64> {
    let download_time = status.active_time.saturating_sub(status.finished_time);
    (download_time > 1).then(|| status.finished_time.saturating_mul(100) / download_time)
}

/// First seeding limit `status` has reached, if any. Limits set to 0 are off.
#[must_use]
pub fn evaluate(status: &TorrentStatus, config: &Configuration) -> Option<PolicyLimit> {
    let seed_time_limit = i64::try_from(config.seed_time_limit).unwrap_or(i64::MAX);
    if config.seed_time_limit > 0 && status.finished_time >= seed_time_limit {
        return Some(PolicyLimit::SeedTime);
    }
    if config.seed_time_ratio_limit > 0
        && time_ratio(status).is_some_and(|ratio| ratio >= i64::from(config.seed_time_ratio_limit))
    {
        return Some(PolicyLimit::SeedTimeRatio);
    }
    if config.share_ratio_limit > 0 && share_ratio(status) >= i64::from(config.share_ratio_limit) {
        return Some(PolicyLimit::ShareRatio);
    }
    None
}

/// A torrent still downloading, as shown on the progress dialog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveTorrent {
    /// Display name.
    pub name: String,
    /// Whole percent complete.
    pub percent: u8,
}

/// One line on the progress dialog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressLine {
    /// Percentage shown on the bar.
    pub percent: u8,
    /// `Total` or the torrent name.
    pub label: String,
}

/// Rotates the dialog between the aggregate and each active torrent.
///
/// Position 0 is the aggregate, positions `1..=n` the active torrents in
/// engine order; the cursor wraps after the last torrent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProgressCursor {
    position: usize,
}

impl ProgressCursor {
    /// Line to show for `active`, advancing the cursor. `None` when nothing is
    /// active, which also rewinds the cursor.
    pub fn advance(&mut self, active: &[ActiveTorrent]) -> Option<ProgressLine> {
        if active.is_empty() {
            self.position = 0;
            return None;
        }
        if self.position > active.len() {
            self.position = 0;
        }
        let line = match self.position.checked_sub(1) {
            None => ProgressLine {
                percent: mean_percent(active),
                label: TOTAL_LABEL.to_string(),
            },
            Some(index) => ProgressLine {
                percent: active[index].percent,
                label: active[index].name.clone(),
            },
        };
        self.position = (self.position + 1) % (active.len() + 1);
        Some(line)
    }
}

#[allow(clippy::cast_possible_truncation)]
fn mean_percent(active: &[ActiveTorrent]) -> u8 {
    let total: usize = active.iter().map(|torrent| usize::from(torrent.percent)).sum();
    // Mean of values in 0..=100 always fits.
    (total / active.len()) as u8
}

/// What one policy pass observed and did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PolicyPass {
    /// Torrents still downloading, in engine order.
    pub active: Vec<ActiveTorrent>,
    /// Torrents paused during this pass.
    pub paused: Vec<(InfoHash, PolicyLimit)>,
    /// Line pushed to the progress dialog, if any.
    pub shown: Option<ProgressLine>,
    /// The whole pass was skipped because the session is paused.
    pub skipped: bool,
}

/// Periodic seeding-policy loop with its progress dialog.
pub struct SeedingPolicy {
    session: Arc<dyn EngineSession>,
    ui: Arc<dyn ProgressUi>,
    metrics: Metrics,
    dialog: Option<Box<dyn ProgressDialog>>,
    cursor: ProgressCursor,
}

impl SeedingPolicy {
    /// Policy over `session`, reporting progress to `ui`.
    #[must_use]
    pub fn new(session: Arc<dyn EngineSession>, ui: Arc<dyn ProgressUi>, metrics: Metrics) -> Self {
        Self {
            session,
            ui,
            metrics,
            dialog: None,
            cursor: ProgressCursor::default(),
        }
    }

    /// Run one policy pass against `config`.
    pub fn tick(&mut self, config: &Configuration) -> PolicyPass {
        let mut pass = PolicyPass::default();
        if self.session.is_paused() {
            self.close_dialog();
            pass.skipped = true;
            return pass;
        }

        for torrent in self.session.torrents() {
            if !torrent.is_valid() {
                continue;
            }
            let status = torrent.status(StatusQuery::NAME);
            if !status.has_metadata || status.paused {
                continue;
            }

            let percent = status.progress_percent();
            if percent < 100 {
                pass.active.push(ActiveTorrent {
                    name: status.name,
                    percent,
                });
                continue;
            }

            if let Some(limit) = evaluate(&status, config) {
                info!(
                    info_hash = %status.info_hash,
                    name = %status.name,
                    limit = limit.as_str(),
                    "seeding limit reached; pausing torrent"
                );
                torrent.set_auto_managed(false);
                torrent.pause(PauseMode::Graceful);
                self.metrics.inc_policy_pause(limit.as_str());
                pass.paused.push((status.info_hash, limit));
            }
        }

        self.metrics
            .set_active_torrents(i64::try_from(pass.active.len()).unwrap_or(i64::MAX));
        pass.shown = self.cursor.advance(&pass.active);
        match &pass.shown {
            Some(line) => {
                let ui = &self.ui;
                let dialog = self
                    .dialog
                    .get_or_insert_with(|| ui.open(PROGRESS_HEADING));
                dialog.update(line.percent, PROGRESS_HEADING, &line.label);
            }
            None => self.close_dialog(),
        }
        pass
    }

    /// Close the progress dialog if it is open.
    pub fn close_dialog(&mut self) {
        if let Some(dialog) = self.dialog.take() {
            debug!("closing progress dialog");
            dialog.close();
        }
    }

    /// Run a pass every [`POLICY_INTERVAL`] until shutdown.
    ///
    /// A configuration change closes the dialog; the next pass uses the new
    /// limits.
    #[must_use]
    pub fn spawn(
        mut self,
        mut config: ConfigReceiver,
        mut shutdown: ShutdownSignal,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            info!("seeding policy loop started");
            let mut ticker =
                time::interval_at(time::Instant::now() + POLICY_INTERVAL, POLICY_INTERVAL);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    () = wait_for_shutdown(&mut shutdown) => break,
                    changed = config.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        self.close_dialog();
                    }
                    _ = ticker.tick() => {
                        let snapshot = Arc::clone(&config.borrow_and_update());
                        self.tick(&snapshot);
                    }
                }
            }
            self.close_dialog();
            info!("seeding policy loop stopped");
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use riptide_test_support::{
        FakeSession, RecordingProgressUi, TorrentCall, UiEvent, downloading, finished, info_hash,
    };

    fn seeded(finished_time: i64, active_time: i64, upload: i64, download: i64) -> TorrentStatus {
        TorrentStatus {
            finished_time,
            active_time,
            all_time_upload: upload,
            all_time_download: download,
            ..finished(info_hash(9), "seeded")
        }
    }

    fn policy(session: &Arc<FakeSession>, ui: &RecordingProgressUi) -> SeedingPolicy {
        SeedingPolicy::new(
            session.clone(),
            Arc::new(ui.clone()),
            Metrics::new().expect("metrics"),
        )
    }

    #[test]
    fn share_ratio_is_zero_without_download() {
        assert_eq!(share_ratio(&seeded(0, 0, 5_000, 0)), 0);
        assert_eq!(share_ratio(&seeded(0, 0, 250, 100)), 250);
    }

    #[test]
    fn time_ratio_needs_more_than_one_second_of_download() {
        assert_eq!(time_ratio(&seeded(100, 101, 0, 0)), None);
        assert_eq!(time_ratio(&seeded(100, 100, 0, 0)), None);
        assert_eq!(time_ratio(&seeded(100, 300, 0, 0)), Some(50));
    }

    #[test]
    fn limits_are_checked_in_order_and_first_match_wins() {
        let config = Configuration {
            share_ratio_limit: 200,
            seed_time_ratio_limit: 100,
            ..Configuration::default()
        };
        // time ratio 50, share ratio 250
        let status = seeded(100, 300, 250, 100);
        assert_eq!(evaluate(&status, &config), Some(PolicyLimit::ShareRatio));

        let with_time = Configuration {
            seed_time_limit: 60,
            ..config.clone()
        };
        assert_eq!(evaluate(&status, &with_time), Some(PolicyLimit::SeedTime));

        let ratio_hit = seeded(300, 400, 250, 100);
        assert_eq!(evaluate(&ratio_hit, &config), Some(PolicyLimit::SeedTimeRatio));

        assert_eq!(evaluate(&status, &Configuration::default()), None);
    }

    #[test]
    fn limits_compare_inclusively() {
        let config = Configuration {
            share_ratio_limit: 100,
            ..Configuration::default()
        };
        assert_eq!(
            evaluate(&seeded(0, 0, 100, 100), &config),
            Some(PolicyLimit::ShareRatio)
        );
        assert_eq!(evaluate(&seeded(0, 0, 99, 100), &config), None);
    }

    #[test]
    fn cursor_rotates_total_then_each_torrent() {
        let active: Vec<ActiveTorrent> = [("A", 10), ("B", 50), ("C", 90)]
            .into_iter()
            .map(|(name, percent)| ActiveTorrent {
                name: name.to_string(),
                percent,
            })
            .collect();
        let mut cursor = ProgressCursor::default();
        let shown: Vec<(u8, String)> = (0..5)
            .filter_map(|_| cursor.advance(&active))
            .map(|line| (line.percent, line.label))
            .collect();
        assert_eq!(
            shown,
            vec![
                (50, "Total".to_string()),
                (10, "A".to_string()),
                (50, "B".to_string()),
                (90, "C".to_string()),
                (50, "Total".to_string()),
            ]
        );
    }

    #[test]
    fn cursor_restarts_when_active_set_shrinks() {
        let one = vec![ActiveTorrent {
            name: "solo".into(),
            percent: 40,
        }];
        let mut cursor = ProgressCursor { position: 3 };
        assert_eq!(cursor.advance(&one).map(|line| line.label), Some("Total".into()));
        assert_eq!(cursor.advance(&one).map(|line| line.label), Some("solo".into()));
        assert_eq!(cursor.advance(&[]), None);
        assert_eq!(cursor, ProgressCursor::default());
    }

    #[test]
    fn finished_torrent_over_limit_is_unmanaged_then_paused() {
        let session = FakeSession::new();
        let ui = RecordingProgressUi::new();
        let over = session.insert_torrent(seeded(0, 0, 300, 100));
        let config = Configuration {
            share_ratio_limit: 200,
            ..Configuration::default()
        };

        let mut policy = policy(&session, &ui);
        let pass = policy.tick(&config);
        assert_eq!(pass.paused, vec![(info_hash(9), PolicyLimit::ShareRatio)]);
        assert_eq!(
            over.calls(),
            vec![
                TorrentCall::SetAutoManaged(false),
                TorrentCall::Pause(PauseMode::Graceful)
            ]
        );
        assert_eq!(policy.metrics.policy_pauses("share_ratio"), 1);

        // Paused torrents are skipped on later passes.
        assert!(policy.tick(&config).paused.is_empty());
        assert_eq!(over.status_reads(), 2);
        assert!(ui.events().is_empty());
    }

    #[test]
    fn each_torrent_is_read_once_per_pass() {
        let session = FakeSession::new();
        let ui = RecordingProgressUi::new();
        let torrents = [
            session.insert_torrent(downloading(info_hash(1), "one", 0.2)),
            session.insert_torrent(seeded(10, 20, 1, 1)),
        ];
        let mut policy = policy(&session, &ui);
        policy.tick(&Configuration::default());
        for torrent in &torrents {
            assert_eq!(torrent.status_reads(), 1);
        }
    }

    #[test]
    fn dialog_opens_lazily_and_closes_when_idle() {
        let session = FakeSession::new();
        let ui = RecordingProgressUi::new();
        let torrent = session.insert_torrent(downloading(info_hash(1), "movie", 0.42));
        session.insert_torrent(TorrentStatus {
            has_metadata: false,
            ..downloading(info_hash(2), "magnet only", 0.0)
        });
        let mut policy = policy(&session, &ui);

        let pass = policy.tick(&Configuration::default());
        assert_eq!(pass.active.len(), 1);
        policy.tick(&Configuration::default());
        assert_eq!(
            ui.events(),
            vec![
                UiEvent::Opened("Riptide".into()),
                UiEvent::Updated {
                    percent: 42,
                    heading: "Riptide".into(),
                    message: "Total".into(),
                },
                UiEvent::Updated {
                    percent: 42,
                    heading: "Riptide".into(),
                    message: "movie".into(),
                },
            ]
        );

        torrent.update(|status| status.progress = 1.0);
        policy.tick(&Configuration::default());
        assert!(!ui.is_open());
        assert_eq!(policy.metrics.snapshot().active_torrents, 0);
    }

    #[test]
    fn paused_session_skips_the_pass_and_closes_the_dialog() {
        let session = FakeSession::new();
        let ui = RecordingProgressUi::new();
        let torrent = session.insert_torrent(downloading(info_hash(1), "one", 0.5));
        let mut policy = policy(&session, &ui);
        policy.tick(&Configuration::default());
        assert!(ui.is_open());

        session.set_paused(true);
        let pass = policy.tick(&Configuration::default());
        assert!(pass.skipped);
        assert!(!ui.is_open());
        assert_eq!(torrent.status_reads(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn loop_closes_dialog_on_reconfigure_and_shutdown() {
        let session = FakeSession::new();
        let ui = RecordingProgressUi::new();
        session.insert_torrent(downloading(info_hash(1), "one", 0.5));
        let (config_tx, config) = riptide_config::config_channel(Configuration::default());
        let (stop, signal) = riptide_session::shutdown_channel();
        let task = policy(&session, &ui).spawn(config, signal);

        time::sleep(POLICY_INTERVAL + Duration::from_millis(10)).await;
        assert!(ui.is_open());

        config_tx.send_replace(Arc::new(Configuration {
            share_ratio_limit: 150,
            ..Configuration::default()
        }));
        time::sleep(Duration::from_millis(1)).await;
        assert!(!ui.is_open());

        time::sleep(POLICY_INTERVAL).await;
        assert!(ui.is_open());

        stop.send_replace(true);
        task.await.expect("policy task");
        assert!(!ui.is_open());
    }
}
