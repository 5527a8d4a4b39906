//! Engine alerts: the raw envelope popped from the engine and the decoded form
//! handed to subscribers.

use std::fmt;
use std::ops::BitOr;
use std::sync::Arc;

use crate::model::InfoHash;
use crate::service::TorrentHandle;

/// Category bitmask attached to every alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct AlertCategory(u32);

impl AlertCategory {
    /// No category bits.
    pub const NONE: Self = Self(0);
    /// Failures reported by the engine.
    pub const ERROR: Self = Self(0x1);
    /// Peer lifecycle notices.
    pub const PEER: Self = Self(0x2);
    /// UPnP / NAT-PMP port mapping.
    pub const PORT_MAPPING: Self = Self(0x4);
    /// Disk and storage events, including resume-data results.
    pub const STORAGE: Self = Self(0x8);
    /// Tracker announces and replies.
    pub const TRACKER: Self = Self(0x10);
    /// Verbose diagnostic output.
    pub const DEBUG: Self = Self(0x20);
    /// Torrent state transitions.
    pub const STATUS: Self = Self(0x40);
    /// Per-piece progress.
    pub const PROGRESS: Self = Self(0x80);
    /// IP filter hits.
    pub const IP_BLOCK: Self = Self(0x100);
    /// Engine tuning hints.
    pub const PERFORMANCE_WARNING: Self = Self(0x200);

    /// Wrap a raw engine bitmask.
    #[must_use]
    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    /// Raw engine bitmask.
    #[must_use]
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Whether any bit of `other` is set.
    #[must_use]
    pub const fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }
}

impl BitOr for AlertCategory {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// Alert kinds the orchestration layer distinguishes; everything else is `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AlertKind {
    /// A torrent changed state (checking, downloading, seeding...).
    StateChanged,
    /// A torrent finished downloading.
    TorrentFinished,
    /// Resume data requested via `save_resume_data` is ready.
    SaveResumeData,
    /// A resume-data request failed.
    SaveResumeDataFailed,
    /// A torrent entered an error state.
    TorrentError,
    /// Any alert type without dedicated handling.
    Other(u32),
}

impl AlertKind {
    const STATE_CHANGED: u32 = 10;
    const TORRENT_FINISHED: u32 = 26;
    const SAVE_RESUME_DATA: u32 = 37;
    const SAVE_RESUME_DATA_FAILED: u32 = 38;
    const TORRENT_ERROR: u32 = 64;

    /// Map an engine alert type code to a kind.
    #[must_use]
    pub const fn from_code(code: u32) -> Self {
        match code {
            Self::STATE_CHANGED => Self::StateChanged,
            Self::TORRENT_FINISHED => Self::TorrentFinished,
            Self::SAVE_RESUME_DATA => Self::SaveResumeData,
            Self::SAVE_RESUME_DATA_FAILED => Self::SaveResumeDataFailed,
            Self::TORRENT_ERROR => Self::TorrentError,
            other => Self::Other(other),
        }
    }

    /// Engine alert type code for this kind.
    #[must_use]
    pub const fn code(self) -> u32 {
        match self {
            Self::StateChanged => Self::STATE_CHANGED,
            Self::TorrentFinished => Self::TORRENT_FINISHED,
            Self::SaveResumeData => Self::SAVE_RESUME_DATA,
            Self::SaveResumeDataFailed => Self::SAVE_RESUME_DATA_FAILED,
            Self::TorrentError => Self::TORRENT_ERROR,
            Self::Other(code) => code,
        }
    }
}

/// Alert exactly as popped from the engine.
///
/// The engine attaches kind-specific extras (the torrent the alert refers to,
/// the resume blob, an error string); they are only meaningful for the kinds
/// that carry them.
#[derive(Clone)]
pub struct NativeAlert {
    /// Engine alert type code.
    pub type_code: u32,
    /// Category bitmask.
    pub category: AlertCategory,
    /// Short alert name.
    pub what: String,
    /// Human-readable description.
    pub message: String,
    /// Torrent the alert refers to, if any.
    pub torrent: Option<Arc<dyn TorrentHandle>>,
    /// Serialized resume blob for resume-data alerts.
    pub resume_data: Option<Vec<u8>>,
    /// Error text for failure alerts.
    pub error: Option<String>,
}

impl fmt::Debug for NativeAlert {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("NativeAlert")
            .field("type_code", &self.type_code)
            .field("category", &self.category)
            .field("what", &self.what)
            .field("message", &self.message)
            .field("has_torrent", &self.torrent.is_some())
            .field("resume_bytes", &self.resume_data.as_ref().map(Vec::len))
            .field("error", &self.error)
            .finish()
    }
}

/// Kind-specific data decoded once at the engine boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AlertPayload {
    /// Nothing beyond the envelope.
    None,
    /// Serialized resume data for one torrent.
    ResumeData {
        /// Torrent the blob belongs to.
        info_hash: InfoHash,
        /// Display name at the time the blob was produced.
        name: String,
        /// Engine-native resume blob.
        data: Vec<u8>,
    },
    /// The engine could not produce resume data.
    ResumeDataFailed {
        /// Torrent the request was for.
        info_hash: InfoHash,
        /// Engine-provided reason.
        error: String,
    },
    /// A torrent entered an error state.
    TorrentError {
        /// Affected torrent.
        info_hash: InfoHash,
        /// Engine-provided reason.
        error: String,
    },
}

/// Decoded, immutable alert shared with every subscriber.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alert {
    /// Decoded kind.
    pub kind: AlertKind,
    /// Category bitmask.
    pub category: AlertCategory,
    /// Short alert name.
    pub what: String,
    /// Human-readable description.
    pub message: String,
    /// Kind-specific data.
    pub payload: AlertPayload,
}

impl Alert {
    /// Alert with no payload.
    #[must_use]
    pub fn new(
        kind: AlertKind,
        category: AlertCategory,
        what: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            category,
            what: what.into(),
            message: message.into(),
            payload: AlertPayload::None,
        }
    }

    /// Attach a payload.
    #[must_use]
    pub fn with_payload(mut self, payload: AlertPayload) -> Self {
        self.payload = payload;
        self
    }
}
