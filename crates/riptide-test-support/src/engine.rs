//! In-memory engine double implementing the session and handle traits.
//!
//! Torrents attached to a [`FakeSession`] answer `save_resume_data` by queuing
//! a resume-data alert on the session, exactly as a real engine would, so the
//! pump and writer can be exercised end to end.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use riptide_torrent_core::{
    AddTorrentParams, AlertCategory, AlertKind, EngineSession, InfoHash, NativeAlert, PauseMode,
    SaveResumeFlags, SettingsPack, StatusQuery, TorrentError, TorrentHandle, TorrentResult,
    TorrentStatus,
};

use crate::fixtures::resume_blob;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Default)]
struct AlertQueue {
    pending: Mutex<VecDeque<NativeAlert>>,
    ready: Condvar,
}

impl AlertQueue {
    fn push(&self, alert: NativeAlert) {
        lock(&self.pending).push_back(alert);
        self.ready.notify_all();
    }

    fn wait(&self, timeout: Duration) -> bool {
        let pending = lock(&self.pending);
        let (pending, _) = self
            .ready
            .wait_timeout_while(pending, timeout, |queue| queue.is_empty())
            .unwrap_or_else(PoisonError::into_inner);
        !pending.is_empty()
    }

    fn drain(&self) -> Vec<NativeAlert> {
        lock(&self.pending).drain(..).collect()
    }
}

/// Call observed on a [`FakeTorrent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TorrentCall {
    /// `pause`.
    Pause(PauseMode),
    /// `set_auto_managed`.
    SetAutoManaged(bool),
    /// `save_resume_data`.
    SaveResumeData(SaveResumeFlags),
}

/// In-memory torrent handle.
pub struct FakeTorrent {
    status: Mutex<TorrentStatus>,
    trackers: Vec<Vec<String>>,
    valid: AtomicBool,
    fail_resume: AtomicBool,
    status_reads: AtomicUsize,
    calls: Mutex<Vec<TorrentCall>>,
    alerts: Option<Arc<AlertQueue>>,
    this: Weak<Self>,
}

impl FakeTorrent {
    /// Torrent not attached to any session; resume requests are only recorded.
    #[must_use]
    pub fn new(status: TorrentStatus) -> Arc<Self> {
        Self::build(status, Vec::new(), None)
    }

    fn build(
        status: TorrentStatus,
        trackers: Vec<Vec<String>>,
        alerts: Option<Arc<AlertQueue>>,
    ) -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            status: Mutex::new(status),
            trackers,
            valid: AtomicBool::new(true),
            fail_resume: AtomicBool::new(false),
            status_reads: AtomicUsize::new(0),
            calls: Mutex::new(Vec::new()),
            alerts,
            this: this.clone(),
        })
    }

    /// Content hash of this torrent.
    #[must_use]
    pub fn info_hash(&self) -> InfoHash {
        lock(&self.status).info_hash
    }

    /// Current status without counting it as an engine read.
    #[must_use]
    pub fn snapshot(&self) -> TorrentStatus {
        lock(&self.status).clone()
    }

    /// Mutate the live status.
    pub fn update(&self, change: impl FnOnce(&mut TorrentStatus)) {
        change(&mut lock(&self.status));
    }

    /// Mark the handle as no longer referring to a live torrent.
    pub fn invalidate(&self) {
        self.valid.store(false, Ordering::SeqCst);
    }

    /// Make subsequent resume requests produce a failure alert.
    pub fn fail_resume_requests(&self) {
        self.fail_resume.store(true, Ordering::SeqCst);
    }

    /// Every mutating call so far, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<TorrentCall> {
        lock(&self.calls).clone()
    }

    /// Number of `status` calls served.
    #[must_use]
    pub fn status_reads(&self) -> usize {
        self.status_reads.load(Ordering::SeqCst)
    }

    fn record(&self, call: TorrentCall) {
        lock(&self.calls).push(call);
    }

    fn emit_resume_alert(&self, queue: &AlertQueue) {
        let torrent = self
            .this
            .upgrade()
            .map(|this| this as Arc<dyn TorrentHandle>);
        let hash = self.info_hash();
        let alert = if self.fail_resume.load(Ordering::SeqCst) {
            NativeAlert {
                type_code: AlertKind::SaveResumeDataFailed.code(),
                category: AlertCategory::STORAGE | AlertCategory::ERROR,
                what: "save_resume_data_failed".to_string(),
                message: format!("{hash}: resume data unavailable"),
                torrent,
                resume_data: None,
                error: Some("resume data unavailable".to_string()),
            }
        } else {
            let tiers: Vec<Vec<&str>> = self
                .trackers
                .iter()
                .map(|tier| tier.iter().map(String::as_str).collect())
                .collect();
            let tier_refs: Vec<&[&str]> = tiers.iter().map(Vec::as_slice).collect();
            lock(&self.status).need_save_resume = false;
            NativeAlert {
                type_code: AlertKind::SaveResumeData.code(),
                category: AlertCategory::STORAGE,
                what: "save_resume_data".to_string(),
                message: format!("{hash}: resume data generated"),
                torrent,
                resume_data: Some(resume_blob(&hash, &tier_refs)),
                error: None,
            }
        };
        queue.push(alert);
    }
}

impl TorrentHandle for FakeTorrent {
    fn is_valid(&self) -> bool {
        self.valid.load(Ordering::SeqCst)
    }

    fn status(&self, query: StatusQuery) -> TorrentStatus {
        self.status_reads.fetch_add(1, Ordering::SeqCst);
        let mut status = lock(&self.status).clone();
        if !query.contains(StatusQuery::NAME) {
            status.name.clear();
        }
        if !query.contains(StatusQuery::SAVE_PATH) {
            status.save_path.clear();
        }
        status
    }

    fn pause(&self, mode: PauseMode) {
        self.record(TorrentCall::Pause(mode));
        lock(&self.status).paused = true;
    }

    fn set_auto_managed(&self, managed: bool) {
        self.record(TorrentCall::SetAutoManaged(managed));
        lock(&self.status).auto_managed = managed;
    }

    fn save_resume_data(&self, flags: SaveResumeFlags) {
        self.record(TorrentCall::SaveResumeData(flags));
        if let Some(queue) = &self.alerts {
            self.emit_resume_alert(queue);
        }
    }
}

type SettingsFilter = Box<dyn Fn(&SettingsPack) -> bool + Send + Sync>;

/// In-memory engine session.
pub struct FakeSession {
    alerts: Arc<AlertQueue>,
    torrents: Mutex<Vec<Arc<FakeTorrent>>>,
    settings: Mutex<SettingsPack>,
    applied: Mutex<Vec<SettingsPack>>,
    added: Mutex<Vec<AddTorrentParams>>,
    state: Mutex<Vec<u8>>,
    paused: AtomicBool,
    reject_adds: Mutex<Option<String>>,
    reject_settings: Mutex<Option<SettingsFilter>>,
    waits: AtomicUsize,
}

impl Default for FakeSession {
    fn default() -> Self {
        Self {
            alerts: Arc::default(),
            torrents: Mutex::default(),
            settings: Mutex::default(),
            applied: Mutex::default(),
            added: Mutex::default(),
            state: Mutex::new(b"d8:settingsdee".to_vec()),
            paused: AtomicBool::new(false),
            reject_adds: Mutex::new(None),
            reject_settings: Mutex::new(None),
            waits: AtomicUsize::new(0),
        }
    }
}

impl FakeSession {
    /// Empty session.
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Attach a torrent with no trackers.
    pub fn insert_torrent(&self, status: TorrentStatus) -> Arc<FakeTorrent> {
        self.insert_torrent_with_trackers(status, Vec::new())
    }

    /// Attach a torrent whose resume records carry `trackers`.
    pub fn insert_torrent_with_trackers(
        &self,
        status: TorrentStatus,
        trackers: Vec<Vec<String>>,
    ) -> Arc<FakeTorrent> {
        let torrent = FakeTorrent::build(status, trackers, Some(Arc::clone(&self.alerts)));
        lock(&self.torrents).push(Arc::clone(&torrent));
        torrent
    }

    /// Queue a native alert as if the engine had emitted it.
    pub fn push_alert(&self, alert: NativeAlert) {
        self.alerts.push(alert);
    }

    /// Pause or resume the whole session.
    pub fn set_paused(&self, paused: bool) {
        self.paused.store(paused, Ordering::SeqCst);
    }

    /// Reject every later `add_torrent` with `reason`.
    pub fn reject_adds(&self, reason: &str) {
        *lock(&self.reject_adds) = Some(reason.to_string());
    }

    /// Reject every later `apply_settings`.
    pub fn reject_settings(&self) {
        self.reject_settings_when(|_| true);
    }

    /// Reject later `apply_settings` batches for which `filter` returns true.
    pub fn reject_settings_when(
        &self,
        filter: impl Fn(&SettingsPack) -> bool + Send + Sync + 'static,
    ) {
        *lock(&self.reject_settings) = Some(Box::new(filter));
    }

    /// Merged view of every applied settings pack.
    #[must_use]
    pub fn settings(&self) -> SettingsPack {
        lock(&self.settings).clone()
    }

    /// Each `apply_settings` batch, in order.
    #[must_use]
    pub fn applied(&self) -> Vec<SettingsPack> {
        lock(&self.applied).clone()
    }

    /// Every accepted add request, in order.
    #[must_use]
    pub fn added(&self) -> Vec<AddTorrentParams> {
        lock(&self.added).clone()
    }

    /// Number of `wait_for_alert` calls served.
    #[must_use]
    pub fn waits(&self) -> usize {
        self.waits.load(Ordering::SeqCst)
    }

    /// Current session-state blob.
    #[must_use]
    pub fn state_blob(&self) -> Vec<u8> {
        lock(&self.state).clone()
    }
}

fn hash_from_magnet(url: &str) -> Option<InfoHash> {
    let rest = url.strip_prefix("magnet:?xt=urn:btih:")?;
    let hex = rest.split('&').next()?;
    InfoHash::from_hex(hex).ok()
}

impl EngineSession for FakeSession {
    fn apply_settings(&self, pack: &SettingsPack) -> TorrentResult<()> {
        if lock(&self.reject_settings)
            .as_ref()
            .is_some_and(|filter| filter(pack))
        {
            return Err(TorrentError::Rejected {
                operation: "apply_settings",
                reason: "settings rejected".to_string(),
            });
        }
        lock(&self.settings).merge(pack);
        lock(&self.applied).push(pack.clone());
        Ok(())
    }

    fn torrents(&self) -> Vec<Arc<dyn TorrentHandle>> {
        lock(&self.torrents)
            .iter()
            .map(|torrent| Arc::clone(torrent) as Arc<dyn TorrentHandle>)
            .collect()
    }

    fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }

    fn wait_for_alert(&self, timeout: Duration) -> bool {
        self.waits.fetch_add(1, Ordering::SeqCst);
        self.alerts.wait(timeout)
    }

    fn pop_alerts(&self) -> Vec<NativeAlert> {
        self.alerts.drain()
    }

    fn add_torrent(&self, params: AddTorrentParams) -> TorrentResult<Arc<dyn TorrentHandle>> {
        if let Some(reason) = lock(&self.reject_adds).clone() {
            return Err(TorrentError::Rejected {
                operation: "add_torrent",
                reason,
            });
        }
        let hash = hash_from_magnet(&params.url).ok_or_else(|| TorrentError::Rejected {
            operation: "add_torrent",
            reason: format!("unsupported identifier {}", params.url),
        })?;
        let status = TorrentStatus {
            info_hash: hash,
            name: hash.to_hex(),
            save_path: params.save_path.display().to_string(),
            auto_managed: true,
            ..TorrentStatus::default()
        };
        lock(&self.added).push(params);
        let torrent = self.insert_torrent(status);
        Ok(torrent as Arc<dyn TorrentHandle>)
    }

    fn save_state(&self) -> TorrentResult<Vec<u8>> {
        Ok(self.state_blob())
    }

    fn load_state(&self, blob: &[u8]) -> TorrentResult<()> {
        if blob.first() != Some(&b'd') {
            return Err(TorrentError::Rejected {
                operation: "load_state",
                reason: "session state must be a bencoded dictionary".to_string(),
            });
        }
        *lock(&self.state) = blob.to_vec();
        Ok(())
    }
}
