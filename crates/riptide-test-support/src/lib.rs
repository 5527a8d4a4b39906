#![forbid(unsafe_code)]
#![warn(
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    missing_docs
)]

//! Shared test helpers used across unit and integration suites.
//! Layout: engine.rs (in-memory engine double), ui.rs (recording progress UI),
//! fixtures.rs (status snapshots and bencoded resume records).

pub mod engine;
pub mod fixtures;
pub mod ui;

pub use engine::{FakeSession, FakeTorrent, TorrentCall};
pub use fixtures::{downloading, finished, info_hash, native_alert, resume_blob};
pub use ui::{RecordingProgressUi, UiEvent};
