//! Default values for configuration fields.
//!
//! # Design
//! - Every field of [`crate::Configuration`] takes its default from here so
//!   partial documents stay predictable.
//! - Zero means "unlimited" for rates and "disabled" for seeding limits.

/// Process background work (resume reload, seeding loop) by default.
pub const BACKGROUND_HANDLING: bool = true;
/// Bytes buffered before playback is considered ready.
pub const BUFFER_SIZE: u64 = 20 * 1024 * 1024;
/// Seconds between resume-data snapshot requests.
pub const SESSION_SAVE_SECS: u64 = 10;
/// Lower bound of the listen port range.
pub const LOWER_LISTEN_PORT: u16 = 6891;
/// Upper bound of the listen port range.
pub const UPPER_LISTEN_PORT: u16 = 6899;
/// Directory that receives downloaded data.
pub const DOWNLOAD_PATH: &str = "downloads";
/// Directory holding `<hash>.fastresume` files.
pub const RESUME_PATH: &str = "torrents";

/// `riptide/<version>` as advertised to trackers and peers.
#[must_use]
pub fn user_agent() -> String {
    format!("riptide/{}", env!("CARGO_PKG_VERSION"))
}
