//! Traits implemented by the engine collaborator and by progress-UI sinks.

use std::sync::Arc;
use std::time::Duration;

use crate::alert::NativeAlert;
use crate::error::TorrentResult;
use crate::model::{AddTorrentParams, PauseMode, SaveResumeFlags, StatusQuery, TorrentStatus};
use crate::settings::SettingsPack;

/// Handle to one torrent inside the engine session.
///
/// Handles may outlive the torrent they point at; callers check
/// [`TorrentHandle::is_valid`] before acting on one.
pub trait TorrentHandle: Send + Sync {
    /// Whether the handle still refers to a live torrent.
    fn is_valid(&self) -> bool;

    /// Fetch an immutable status snapshot. Optional fields are filled only
    /// when requested through `query`.
    fn status(&self, query: StatusQuery) -> TorrentStatus;

    /// Stop transferring.
    fn pause(&self, mode: PauseMode);

    /// Hand the torrent to, or take it away from, the engine's queue manager.
    fn set_auto_managed(&self, managed: bool);

    /// Ask the engine to emit a resume-data alert for this torrent later.
    fn save_resume_data(&self, flags: SaveResumeFlags);
}

/// The engine session: settings, torrents, the alert queue and session state.
///
/// Implementations must tolerate calls from several threads; the alert
/// methods are only ever called from the single pump thread.
pub trait EngineSession: Send + Sync {
    /// Apply every entry of `pack` to the live session.
    ///
    /// # Errors
    ///
    /// Returns an error when the engine rejects the settings.
    fn apply_settings(&self, pack: &SettingsPack) -> TorrentResult<()>;

    /// Handles for every torrent known to the session, in engine order.
    fn torrents(&self) -> Vec<Arc<dyn TorrentHandle>>;

    /// Whether the whole session is paused.
    fn is_paused(&self) -> bool;

    /// Block for up to `timeout` until an alert is pending; `true` if one is.
    fn wait_for_alert(&self, timeout: Duration) -> bool;

    /// Remove and return every pending alert in emission order.
    fn pop_alerts(&self) -> Vec<NativeAlert>;

    /// Add a torrent.
    ///
    /// # Errors
    ///
    /// Returns an error when the engine rejects the identifier or resume data.
    fn add_torrent(&self, params: AddTorrentParams) -> TorrentResult<Arc<dyn TorrentHandle>>;

    /// Serialize the opaque session-state blob.
    ///
    /// # Errors
    ///
    /// Returns an error when the engine cannot serialize its state.
    fn save_state(&self) -> TorrentResult<Vec<u8>>;

    /// Restore a blob produced by [`EngineSession::save_state`].
    ///
    /// # Errors
    ///
    /// Returns an error when the blob cannot be decoded.
    fn load_state(&self, blob: &[u8]) -> TorrentResult<()>;
}

/// Factory for progress dialogs shown by the seeding loop.
pub trait ProgressUi: Send + Sync {
    /// Open a dialog with the given heading.
    fn open(&self, heading: &str) -> Box<dyn ProgressDialog>;
}

/// An open progress dialog.
pub trait ProgressDialog: Send {
    /// Show `percent` with a heading and a message line.
    fn update(&mut self, percent: u8, heading: &str, message: &str);

    /// Dismiss the dialog.
    fn close(self: Box<Self>);
}
