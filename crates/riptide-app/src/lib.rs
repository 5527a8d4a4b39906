#![forbid(unsafe_code)]
#![warn(
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    missing_docs
)]

//! Riptide application wiring.
//!
//! Layout: `bootstrap.rs` (process wiring), `service.rs` (owned service
//! context and lifecycle), `seeding.rs` (seeding policy loop and progress
//! cursor), `error.rs`.

/// Application bootstrap.
pub mod bootstrap;
/// Application error types.
pub mod error;
/// Seeding policy enforcement.
pub mod seeding;
/// Service lifecycle.
pub mod service;

pub use bootstrap::{BootstrapDependencies, run_app, run_until};
pub use error::{AppError, AppResult};
pub use seeding::{
    ActiveTorrent, POLICY_INTERVAL, PROGRESS_HEADING, PolicyLimit, PolicyPass, ProgressCursor,
    ProgressLine, SeedingPolicy, TOTAL_LABEL, evaluate, share_ratio, time_ratio,
};
pub use service::{BtService, ServiceDependencies};
