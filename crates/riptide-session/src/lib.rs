#![forbid(unsafe_code)]
#![warn(
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    missing_docs
)]

//! Engine-facing orchestration: settings, the alert pump, resume persistence
//! and the session-state blob.
//!
//! Layout: `configurator.rs` (settings plan and discovery services),
//! `pump.rs` (engine alert queue to broadcaster), `alert_log.rs`,
//! `resume/` (record codec, writer, snapshot trigger, startup loader),
//! `state.rs`, `shutdown.rs`, `error.rs`.

pub mod alert_log;
pub mod configurator;
pub mod error;
pub mod pump;
pub mod resume;
pub mod shutdown;
pub mod state;

pub use alert_log::{alert_level, spawn_alert_logger};
pub use configurator::{
    DHT_BOOTSTRAP_NODES, SessionConfigurator, SettingsPlan, bootstrap_nodes, build_settings,
    platform_connections_limit,
};
pub use error::{ResumeError, SessionError, SessionResult};
pub use pump::{AlertHub, AlertPump, decode_alert};
pub use resume::{
    LoadReport, RESUME_EXTENSION, RecordError, ResumeLoader, ResumeRecord, ResumeWriter,
    SnapshotTrigger, ensure_resume_dir, resume_file_path,
};
pub use shutdown::{ShutdownSignal, is_shutdown_requested, shutdown_channel, wait_for_shutdown};
pub use state::{load_state, write_state};
