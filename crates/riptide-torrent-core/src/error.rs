//! Error types reported by the engine collaborator.

use std::error::Error;

use thiserror::Error;

/// Primary error type for engine operations.
#[derive(Debug, Error)]
pub enum TorrentError {
    /// Operation is not supported by the underlying engine.
    #[error("torrent operation not supported")]
    Unsupported {
        /// Operation identifier.
        operation: &'static str,
    },
    /// The engine refused the request (for example a malformed magnet).
    #[error("engine rejected the request")]
    Rejected {
        /// Operation identifier.
        operation: &'static str,
        /// Reason reported by the engine.
        reason: String,
    },
    /// The torrent handle no longer refers to a live torrent.
    #[error("torrent handle is no longer valid")]
    InvalidHandle {
        /// Operation identifier.
        operation: &'static str,
    },
    /// Operation failed in the underlying engine.
    #[error("torrent operation failed")]
    OperationFailed {
        /// Operation identifier.
        operation: &'static str,
        /// Underlying failure.
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
}

impl TorrentError {
    /// Operation identifier carried by every variant.
    #[must_use]
    pub const fn operation(&self) -> &'static str {
        match self {
            Self::Unsupported { operation }
            | Self::Rejected { operation, .. }
            | Self::InvalidHandle { operation }
            | Self::OperationFailed { operation, .. } => operation,
        }
    }
}

/// Convenience alias for engine operation results.
pub type TorrentResult<T> = Result<T, TorrentError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn operation_is_exposed_for_every_variant() {
        let cases = [
            TorrentError::Unsupported { operation: "load_state" },
            TorrentError::Rejected {
                operation: "add_torrent",
                reason: "duplicate".into(),
            },
            TorrentError::InvalidHandle { operation: "pause" },
            TorrentError::OperationFailed {
                operation: "save_state",
                source: Box::new(io::Error::other("disk")),
            },
        ];
        let operations: Vec<_> = cases.iter().map(TorrentError::operation).collect();
        assert_eq!(
            operations,
            vec!["load_state", "add_torrent", "pause", "save_state"]
        );
        assert_eq!(cases[1].to_string(), "engine rejected the request");
        assert!(std::error::Error::source(&cases[3]).is_some());
    }
}
