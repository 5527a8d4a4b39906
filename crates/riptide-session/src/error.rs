//! Error types for session orchestration and resume persistence.

use std::io;
use std::path::PathBuf;

use riptide_torrent_core::{InfoHash, TorrentError};
use thiserror::Error;

/// Errors raised while driving the engine session.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The engine rejected a settings batch.
    #[error("engine rejected settings")]
    ApplySettings {
        /// Operation that produced the batch.
        operation: &'static str,
        /// Engine failure.
        #[source]
        source: TorrentError,
    },
    /// Saving or restoring the session-state blob failed in the engine.
    #[error("session state operation failed")]
    State {
        /// Operation identifier.
        operation: &'static str,
        /// Engine failure.
        #[source]
        source: TorrentError,
    },
    /// Reading or writing the session-state blob failed.
    #[error("session state i/o failed")]
    StateIo {
        /// Operation identifier.
        operation: &'static str,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
    /// The resume directory could not be created.
    #[error("failed to prepare resume directory")]
    ResumeDir {
        /// Directory that could not be created.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
}

/// Convenience alias for session results.
pub type SessionResult<T> = Result<T, SessionError>;

/// Per-file errors from resume persistence and reload.
#[derive(Debug, Error)]
pub enum ResumeError {
    /// Filesystem access failed.
    #[error("resume file i/o failed")]
    Io {
        /// Operation identifier.
        operation: &'static str,
        /// Path involved in the failure.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
    /// The file is not valid bencode.
    #[error("failed to decode resume file")]
    Decode {
        /// Offending file.
        path: PathBuf,
        /// Bencode decoder error.
        #[source]
        source: serde_bencode::Error,
    },
    /// The file decoded but lacks the expected structure.
    #[error("invalid resume record")]
    InvalidRecord {
        /// Offending file.
        path: PathBuf,
        /// Machine-readable reason.
        reason: &'static str,
    },
    /// The engine refused to re-add the torrent.
    #[error("engine rejected resumed torrent")]
    AddRejected {
        /// Resume file the request was built from.
        path: PathBuf,
        /// Torrent that was rejected.
        info_hash: InfoHash,
        /// Engine failure.
        #[source]
        source: TorrentError,
    },
}

impl ResumeError {
    /// Path the error refers to.
    #[must_use]
    pub const fn path(&self) -> &PathBuf {
        match self {
            Self::Io { path, .. }
            | Self::Decode { path, .. }
            | Self::InvalidRecord { path, .. }
            | Self::AddRejected { path, .. } => path,
        }
    }
}
