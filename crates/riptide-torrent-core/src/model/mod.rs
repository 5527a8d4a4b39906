//! Core torrent domain types shared across the workspace.

use std::fmt;
use std::ops::BitOr;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Trackers appended to magnets built without any tracker list of their own.
pub const DEFAULT_TRACKERS: [&str; 5] = [
    "udp://tracker.opentrackr.org:1337/announce",
    "udp://tracker.coppersurfer.tk:6969/announce",
    "udp://tracker.leechers-paradise.org:6969/announce",
    "udp://tracker.openbittorrent.com:80/announce",
    "udp://explodie.org:6969",
];

/// Display labels for the engine's torrent state index.
pub const STATUS_STRINGS: [&str; 8] = [
    "Queued",
    "Checking",
    "Finding",
    "Buffering",
    "Finished",
    "Seeding",
    "Allocating",
    "Stalled",
];

/// 20-byte content hash identifying a torrent.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct InfoHash([u8; 20]);

/// Raised when bytes or text cannot form an [`InfoHash`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidInfoHash {
    /// Raw input did not contain exactly 20 bytes.
    #[error("info hash must be 20 bytes")]
    Length {
        /// Length of the rejected input.
        len: usize,
    },
    /// Text input was not a 40-character hex string.
    #[error("info hash is not valid hex")]
    Hex,
}

impl InfoHash {
    /// Length of the raw hash in bytes.
    pub const LEN: usize = 20;

    /// Wrap raw hash bytes.
    #[must_use]
    pub const fn new(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    /// Build a hash from a byte slice of exactly [`InfoHash::LEN`] bytes.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidInfoHash::Length`] for any other length.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, InvalidInfoHash> {
        <[u8; 20]>::try_from(bytes)
            .map(Self)
            .map_err(|_| InvalidInfoHash::Length { len: bytes.len() })
    }

    /// Parse a 40-character hex string (either case).
    ///
    /// # Errors
    ///
    /// Returns [`InvalidInfoHash::Hex`] when the text is not valid hex of the right length.
    pub fn from_hex(text: &str) -> Result<Self, InvalidInfoHash> {
        let mut bytes = [0_u8; 20];
        hex::decode_to_slice(text, &mut bytes).map_err(|_| InvalidInfoHash::Hex)?;
        Ok(Self(bytes))
    }

    /// Lowercase hex rendering, as used for resume file names and magnets.
    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Raw hash bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }
}

impl fmt::Display for InfoHash {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.to_hex())
    }
}

impl fmt::Debug for InfoHash {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "InfoHash({})", self.to_hex())
    }
}

impl FromStr for InfoHash {
    type Err = InvalidInfoHash;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        Self::from_hex(text)
    }
}

impl From<InfoHash> for String {
    fn from(hash: InfoHash) -> Self {
        hash.to_hex()
    }
}

impl TryFrom<String> for InfoHash {
    type Error = InvalidInfoHash;

    fn try_from(text: String) -> Result<Self, Self::Error> {
        Self::from_hex(&text)
    }
}

/// Flags selecting which optional fields a status query fills in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatusQuery(u32);

impl StatusQuery {
    /// Only the always-present counters.
    pub const NONE: Self = Self(0);
    /// Populate [`TorrentStatus::name`].
    pub const NAME: Self = Self(0x40);
    /// Populate [`TorrentStatus::save_path`].
    pub const SAVE_PATH: Self = Self(0x80);

    /// Raw engine bitmask.
    #[must_use]
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Whether every flag in `other` is set.
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for StatusQuery {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// Point-in-time status snapshot of one torrent.
///
/// A snapshot never changes after it is fetched; policy decisions read every
/// field they need from the same snapshot.
#[allow(clippy::struct_excessive_bools)]
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TorrentStatus {
    /// Content hash.
    pub info_hash: InfoHash,
    /// Display name; empty unless [`StatusQuery::NAME`] was requested.
    pub name: String,
    /// Save path; empty unless [`StatusQuery::SAVE_PATH`] was requested.
    pub save_path: String,
    /// Whether the torrent's metadata (info dictionary) is known.
    pub has_metadata: bool,
    /// Whether the engine holds resume state newer than the last save.
    pub need_save_resume: bool,
    /// Whether the torrent itself is paused.
    pub paused: bool,
    /// Whether the engine's queue manager controls this torrent.
    pub auto_managed: bool,
    /// Completion fraction in `0.0..=1.0`.
    pub progress: f32,
    /// Seconds spent seeding (complete).
    pub finished_time: i64,
    /// Seconds spent active (downloading or seeding).
    pub active_time: i64,
    /// Bytes uploaded over the torrent's lifetime.
    pub all_time_upload: i64,
    /// Bytes downloaded over the torrent's lifetime.
    pub all_time_download: i64,
}

impl TorrentStatus {
    /// Completion as a whole percentage, truncated toward zero.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    #[must_use]
    pub fn progress_percent(&self) -> u8 {
        // f32 arithmetic keeps values such as 0.9 at exactly 90.
        (self.progress * 100.0).clamp(0.0, 100.0) as u8
    }
}

/// Request to add a torrent to the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddTorrentParams {
    /// Magnet or URL identifying the torrent.
    pub url: String,
    /// Directory that receives downloaded data.
    pub save_path: PathBuf,
    /// Engine resume blob to attach; empty when starting fresh.
    pub resume_data: Vec<u8>,
}

/// How a torrent should stop when paused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PauseMode {
    /// Disconnect peers immediately.
    Immediate,
    /// Finish outstanding requests before disconnecting.
    Graceful,
}

/// Flags accompanying a resume-data save request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SaveResumeFlags(u8);

impl SaveResumeFlags {
    /// No extra behaviour.
    pub const NONE: Self = Self(0);
    /// Flush the disk cache before serialising.
    pub const FLUSH_DISK_CACHE: Self = Self(1);

    /// Raw engine bitmask.
    #[must_use]
    pub const fn bits(self) -> u8 {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn info_hash_round_trips_through_hex() {
        let hash = InfoHash::new([0xab; 20]);
        assert_eq!(hash.to_hex(), "ab".repeat(20));
        assert_eq!(InfoHash::from_hex(&hash.to_hex()), Ok(hash));
        assert_eq!("AB".repeat(20).parse::<InfoHash>(), Ok(hash));
        assert_eq!(format!("{hash:?}"), format!("InfoHash({})", "ab".repeat(20)));
    }

    #[test]
    fn info_hash_rejects_bad_input() {
        assert_eq!(
            InfoHash::from_slice(&[1, 2, 3]),
            Err(InvalidInfoHash::Length { len: 3 })
        );
        assert_eq!(InfoHash::from_hex("xyz"), Err(InvalidInfoHash::Hex));
        assert_eq!(InfoHash::from_hex(&"0".repeat(38)), Err(InvalidInfoHash::Hex));
    }

    #[test]
    fn info_hash_serializes_as_hex_string() {
        let hash = InfoHash::new([0x01; 20]);
        let json = serde_json::to_string(&hash).expect("serialize");
        assert_eq!(json, format!("\"{}\"", "01".repeat(20)));
        let back: InfoHash = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, hash);
    }

    #[test]
    fn progress_percent_truncates_and_clamps() {
        let mut status = TorrentStatus {
            progress: 0.9,
            ..TorrentStatus::default()
        };
        assert_eq!(status.progress_percent(), 90);
        status.progress = 0.999;
        assert_eq!(status.progress_percent(), 99);
        status.progress = 1.0;
        assert_eq!(status.progress_percent(), 100);
        status.progress = 1.5;
        assert_eq!(status.progress_percent(), 100);
        status.progress = -0.2;
        assert_eq!(status.progress_percent(), 0);
    }

    #[test]
    fn status_query_flags_combine() {
        let query = StatusQuery::NAME | StatusQuery::SAVE_PATH;
        assert!(query.contains(StatusQuery::NAME));
        assert!(query.contains(StatusQuery::SAVE_PATH));
        assert!(!StatusQuery::NAME.contains(StatusQuery::SAVE_PATH));
        assert_eq!(query.bits(), 0xC0);
    }
}
