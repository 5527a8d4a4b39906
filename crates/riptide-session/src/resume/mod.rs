//! Resume persistence: record codec, periodic snapshot trigger, alert-driven
//! writer and the startup loader.
//!
//! # Design
//! - Trigger and writer share nothing but the filesystem; the trigger only
//!   asks the engine for data, the writer only reacts to resume alerts.
//! - One file per torrent, named by lowercase hex hash, replaced atomically.
//! - The loader treats every file independently; one bad file never aborts
//!   the scan.

mod loader;
mod record;
mod trigger;
mod writer;

use std::path::{Path, PathBuf};

use riptide_torrent_core::InfoHash;
use tokio::fs;
use tracing::info;

use crate::error::{SessionError, SessionResult};

pub use loader::{LoadReport, ResumeLoader};
pub use record::{RecordError, ResumeRecord};
pub use trigger::SnapshotTrigger;
pub use writer::ResumeWriter;

/// File extension of resume records.
pub const RESUME_EXTENSION: &str = "fastresume";

/// `<dir>/<hex hash>.fastresume`.
#[must_use]
pub fn resume_file_path(dir: &Path, info_hash: &InfoHash) -> PathBuf {
    dir.join(format!("{}.{RESUME_EXTENSION}", info_hash.to_hex()))
}

/// Create the resume directory and any missing parents.
///
/// # Errors
///
/// Returns [`SessionError::ResumeDir`] when the directory cannot be created.
pub async fn ensure_resume_dir(path: &Path) -> SessionResult<()> {
    fs::create_dir_all(path)
        .await
        .map_err(|source| SessionError::ResumeDir {
            path: path.to_path_buf(),
            source,
        })?;
    info!(path = %path.display(), "resume directory ready");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use riptide_test_support::info_hash;
    use tempfile::TempDir;

    #[test]
    fn file_name_is_lowercase_hex() {
        let path = resume_file_path(Path::new("/resume"), &info_hash(0xAB));
        assert_eq!(
            path,
            PathBuf::from(format!("/resume/{}.fastresume", "ab".repeat(20)))
        );
    }

    #[tokio::test]
    async fn nested_resume_dir_is_created() {
        let temp = TempDir::new().expect("tempdir");
        let nested = temp.path().join("a").join("b");
        ensure_resume_dir(&nested).await.expect("create");
        ensure_resume_dir(&nested).await.expect("idempotent");
        assert!(nested.is_dir());
    }

    #[tokio::test]
    async fn blocked_resume_dir_reports_its_path() {
        let temp = TempDir::new().expect("tempdir");
        let file = temp.path().join("occupied");
        std::fs::write(&file, b"").expect("write");
        let err = ensure_resume_dir(&file.join("child"))
            .await
            .expect_err("parent is a file");
        assert!(matches!(err, SessionError::ResumeDir { path, .. } if path == file.join("child")));
    }
}
