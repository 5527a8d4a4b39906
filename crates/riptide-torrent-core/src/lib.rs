#![forbid(unsafe_code)]
#![warn(
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    missing_docs
)]

//! Engine-agnostic torrent interfaces and boundary types.
//!
//! The torrent engine (session, handles, alert queue) is an external
//! collaborator. This crate describes exactly what the orchestration layer
//! consumes from it and what it produces for a progress UI.
//!
//! Layout: `model/` (status snapshots, hashes, add requests), `alert.rs`
//! (native and decoded alerts), `settings.rs` (key-typed settings pack),
//! `service/` (engine and UI traits), `error.rs`.

pub mod alert;
pub mod error;
pub mod model;
pub mod service;
pub mod settings;

pub use alert::{Alert, AlertCategory, AlertKind, AlertPayload, NativeAlert};
pub use error::{TorrentError, TorrentResult};
pub use model::{
    AddTorrentParams, DEFAULT_TRACKERS, InfoHash, InvalidInfoHash, PauseMode, STATUS_STRINGS,
    SaveResumeFlags, StatusQuery, TorrentStatus,
};
pub use service::{EngineSession, ProgressDialog, ProgressUi, TorrentHandle};
pub use settings::{SettingValue, SettingsPack};
