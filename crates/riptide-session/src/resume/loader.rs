//! Startup reload of persisted resume files.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use riptide_telemetry::Metrics;
use riptide_torrent_core::{AddTorrentParams, EngineSession, InfoHash};
use tokio::fs;
use tracing::{debug, info, warn};

use super::RESUME_EXTENSION;
use super::record::ResumeRecord;
use crate::error::ResumeError;

/// Outcome of one reload pass.
#[derive(Debug, Default)]
pub struct LoadReport {
    /// Torrents re-added to the engine, in file-name order.
    pub loaded: Vec<InfoHash>,
    /// Files that were skipped, with the reason.
    pub failures: Vec<ResumeError>,
}

/// Re-adds every torrent found in the resume directory.
pub struct ResumeLoader {
    session: Arc<dyn EngineSession>,
    metrics: Metrics,
}

impl ResumeLoader {
    /// Loader feeding `session`.
    #[must_use]
    pub fn new(session: Arc<dyn EngineSession>, metrics: Metrics) -> Self {
        Self { session, metrics }
    }

    /// Scan `resume_dir` for `*.fastresume` files and re-add each torrent with
    /// `download_path` as its save location.
    ///
    /// Every failure is confined to its own file and reported in the
    /// returned [`LoadReport`]; the scan always runs to completion.
    pub async fn load(&self, resume_dir: &Path, download_path: &Path) -> LoadReport {
        let mut report = LoadReport::default();
        let files = match resume_files(resume_dir).await {
            Ok(files) => files,
            Err(err) => {
                warn!(
                    path = %resume_dir.display(),
                    error = %err,
                    "failed to scan resume directory"
                );
                report.failures.push(err);
                return report;
            }
        };

        for path in files {
            match self.load_file(&path, download_path).await {
                Ok(info_hash) => {
                    self.metrics.inc_resume_loaded();
                    debug!(info_hash = %info_hash, path = %path.display(), "torrent resumed");
                    report.loaded.push(info_hash);
                }
                Err(err) => {
                    self.metrics.inc_resume_load_failure();
                    warn!(path = %path.display(), error = %err, "skipping resume file");
                    report.failures.push(err);
                }
            }
        }

        info!(
            loaded = report.loaded.len(),
            failed = report.failures.len(),
            "resume reload complete"
        );
        report
    }

    async fn load_file(&self, path: &Path, download_path: &Path) -> Result<InfoHash, ResumeError> {
        let blob = fs::read(path).await.map_err(|source| ResumeError::Io {
            operation: "resume.read",
            path: path.to_path_buf(),
            source,
        })?;
        let record = ResumeRecord::decode(&blob).map_err(|err| err.at(path))?;
        let params = AddTorrentParams {
            url: record.magnet_uri(),
            save_path: download_path.to_path_buf(),
            resume_data: blob,
        };
        self.session
            .add_torrent(params)
            .map_err(|source| ResumeError::AddRejected {
                path: path.to_path_buf(),
                info_hash: record.info_hash,
                source,
            })?;
        Ok(record.info_hash)
    }
}

async fn resume_files(dir: &Path) -> Result<Vec<PathBuf>, ResumeError> {
    let scan_error = |source| ResumeError::Io {
        operation: "resume.scan",
        path: dir.to_path_buf(),
        source,
    };
    let mut entries = fs::read_dir(dir).await.map_err(scan_error)?;
    let mut files = Vec::new();
    while let Some(entry) = entries.next_entry().await.map_err(scan_error)? {
        let path = entry.path();
        let is_resume = path
            .extension()
            .is_some_and(|extension| extension == RESUME_EXTENSION);
        if is_resume && entry.file_type().await.is_ok_and(|kind| kind.is_file()) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resume::resume_file_path;
    use riptide_test_support::{FakeSession, info_hash, resume_blob};
    use tempfile::TempDir;

    fn loader(session: &Arc<FakeSession>) -> ResumeLoader {
        ResumeLoader::new(session.clone(), Metrics::new().expect("metrics"))
    }

    #[tokio::test]
    async fn reload_rebuilds_magnet_and_attaches_raw_blob() {
        let temp = TempDir::new().expect("tempdir");
        let hash = info_hash(0x11);
        let blob = resume_blob(
            &hash,
            &[&["udp://a/announce", "udp://b/announce"], &["udp://a/announce"]],
        );
        std::fs::write(resume_file_path(temp.path(), &hash), &blob).expect("write");
        std::fs::write(temp.path().join("notes.txt"), b"ignored").expect("write");

        let session = FakeSession::new();
        let report = loader(&session).load(temp.path(), Path::new("/data")).await;

        assert_eq!(report.loaded, vec![hash]);
        assert!(report.failures.is_empty());
        let added = session.added();
        assert_eq!(added.len(), 1);
        assert_eq!(
            added[0].url,
            format!(
                "magnet:?xt=urn:btih:{hash}&tr=udp%3A%2F%2Fa%2Fannounce&tr=udp%3A%2F%2Fb%2Fannounce"
            )
        );
        assert_eq!(added[0].save_path, Path::new("/data"));
        assert_eq!(added[0].resume_data, blob);
    }

    #[tokio::test]
    async fn corrupt_file_does_not_stop_the_scan() {
        let temp = TempDir::new().expect("tempdir");
        let good = info_hash(0x22);
        std::fs::write(
            temp.path().join(format!("{}.fastresume", "00".repeat(20))),
            b"garbage",
        )
        .expect("write");
        std::fs::write(resume_file_path(temp.path(), &good), resume_blob(&good, &[]))
            .expect("write");

        let session = FakeSession::new();
        let loader = loader(&session);
        let report = loader.load(temp.path(), Path::new("/data")).await;

        assert_eq!(report.loaded, vec![good]);
        assert_eq!(report.failures.len(), 1);
        assert!(matches!(report.failures[0], ResumeError::Decode { .. }));
        let snapshot = loader.metrics.snapshot();
        assert_eq!(snapshot.resume_loaded_total, 1);
        assert_eq!(snapshot.resume_load_failures_total, 1);
    }

    #[tokio::test]
    async fn engine_rejection_is_reported_per_file() {
        let temp = TempDir::new().expect("tempdir");
        for byte in [1, 2] {
            let hash = info_hash(byte);
            std::fs::write(resume_file_path(temp.path(), &hash), resume_blob(&hash, &[]))
                .expect("write");
        }
        let session = FakeSession::new();
        session.reject_adds("duplicate torrent");

        let report = loader(&session).load(temp.path(), Path::new("/data")).await;
        assert!(report.loaded.is_empty());
        assert_eq!(report.failures.len(), 2);
        assert!(report.failures.iter().all(|err| matches!(
            err,
            ResumeError::AddRejected { .. }
        )));
    }

    #[tokio::test]
    async fn missing_directory_yields_a_single_failure() {
        let temp = TempDir::new().expect("tempdir");
        let session = FakeSession::new();
        let report = loader(&session)
            .load(&temp.path().join("absent"), Path::new("/data"))
            .await;
        assert!(report.loaded.is_empty());
        assert!(matches!(
            report.failures.as_slice(),
            [ResumeError::Io { operation: "resume.scan", .. }]
        ));
    }
}
