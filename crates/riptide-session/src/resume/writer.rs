//! Event-driven half of resume persistence: writes resume blobs to disk.

use std::path::{Path, PathBuf};

use riptide_config::ConfigReceiver;
use riptide_telemetry::Metrics;
use riptide_torrent_core::{Alert, AlertPayload, InfoHash};
use tokio::fs;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::resume_file_path;
use crate::error::ResumeError;
use crate::pump::AlertHub;

/// Writes each resume-data alert to `<resume_path>/<hex>.fastresume`.
pub struct ResumeWriter {
    config: ConfigReceiver,
    metrics: Metrics,
}

impl ResumeWriter {
    /// Writer that reads the resume directory from the live configuration.
    #[must_use]
    pub const fn new(config: ConfigReceiver, metrics: Metrics) -> Self {
        Self { config, metrics }
    }

    /// Replace the resume file for `info_hash` with `blob`.
    ///
    /// The blob goes to a sibling temporary file first and is renamed over the
    /// target, so a failed write never truncates an existing record.
    ///
    /// # Errors
    ///
    /// Returns [`ResumeError::Io`] when the temporary file cannot be written
    /// or renamed.
    pub async fn write(&self, info_hash: &InfoHash, blob: &[u8]) -> Result<PathBuf, ResumeError> {
        let dir = self.config.borrow().resume_path.clone();
        let target = resume_file_path(&dir, info_hash);
        let staging = staging_path(&target);

        if let Err(source) = fs::write(&staging, blob).await {
            let _ = fs::remove_file(&staging).await;
            return Err(ResumeError::Io {
                operation: "resume.write",
                path: staging,
                source,
            });
        }
        if let Err(source) = fs::rename(&staging, &target).await {
            let _ = fs::remove_file(&staging).await;
            return Err(ResumeError::Io {
                operation: "resume.rename",
                path: target,
                source,
            });
        }
        Ok(target)
    }

    /// React to one alert; anything but resume results is ignored.
    pub async fn handle(&self, alert: &Alert) {
        match &alert.payload {
            AlertPayload::ResumeData {
                info_hash,
                name,
                data,
            } => match self.write(info_hash, data).await {
                Ok(path) => {
                    self.metrics.inc_resume_written();
                    debug!(
                        info_hash = %info_hash,
                        name = %name,
                        path = %path.display(),
                        bytes = data.len(),
                        "resume data written"
                    );
                }
                Err(err) => {
                    self.metrics.inc_resume_write_failure();
                    warn!(
                        info_hash = %info_hash,
                        path = %err.path().display(),
                        error = %err,
                        "failed to persist resume data"
                    );
                }
            },
            AlertPayload::ResumeDataFailed { info_hash, error } => {
                self.metrics.inc_resume_write_failure();
                warn!(
                    info_hash = %info_hash,
                    error = %error,
                    "engine could not produce resume data"
                );
            }
            _ => {}
        }
    }

    /// Subscribe to `hub` now and write resume data until the hub shuts down.
    #[must_use]
    pub fn spawn(self, hub: &AlertHub) -> JoinHandle<()> {
        let (mut alerts, done) = hub.subscribe();
        tokio::spawn(async move {
            info!("resume writer started");
            while let Some(alert) = alerts.recv().await {
                self.handle(&alert).await;
            }
            done.close();
            info!("resume writer stopped");
        })
    }
}

fn staging_path(target: &Path) -> PathBuf {
    let mut name = target.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use riptide_config::{Configuration, config_channel};
    use riptide_test_support::info_hash;
    use riptide_torrent_core::{AlertCategory, AlertKind};
    use tempfile::TempDir;

    fn writer(dir: &Path) -> ResumeWriter {
        let (_sender, receiver) = config_channel(Configuration {
            resume_path: dir.to_path_buf(),
            ..Configuration::default()
        });
        ResumeWriter::new(receiver, Metrics::new().expect("metrics"))
    }

    fn resume_alert(hash: InfoHash, data: &[u8]) -> Alert {
        Alert::new(
            AlertKind::SaveResumeData,
            AlertCategory::STORAGE,
            "save_resume_data",
            "resume data generated",
        )
        .with_payload(AlertPayload::ResumeData {
            info_hash: hash,
            name: "fixture".into(),
            data: data.to_vec(),
        })
    }

    #[tokio::test]
    async fn resume_blob_overwrites_previous_file() {
        let temp = TempDir::new().expect("tempdir");
        let writer = writer(temp.path());
        let hash = info_hash(0xcd);

        writer.handle(&resume_alert(hash, b"d1:ai1ee")).await;
        writer.handle(&resume_alert(hash, b"d1:ai2ee")).await;

        let path = temp.path().join(format!("{}.fastresume", "cd".repeat(20)));
        assert_eq!(std::fs::read(&path).expect("read"), b"d1:ai2ee");
        assert!(!staging_path(&path).exists());
        assert_eq!(writer.metrics.snapshot().resume_written_total, 2);
    }

    #[tokio::test]
    async fn missing_directory_is_counted_not_fatal() {
        let temp = TempDir::new().expect("tempdir");
        let writer = writer(&temp.path().join("absent"));

        writer.handle(&resume_alert(info_hash(1), b"de")).await;
        let err = writer.write(&info_hash(1), b"de").await.expect_err("no directory");
        assert!(matches!(err, ResumeError::Io { operation: "resume.write", .. }));
        assert_eq!(writer.metrics.snapshot().resume_write_failures_total, 1);
    }

    #[tokio::test]
    async fn spawned_writer_drains_until_hub_shutdown() {
        let temp = TempDir::new().expect("tempdir");
        let hub = AlertHub::new();
        let task = writer(temp.path()).spawn(&hub);

        hub.publish(resume_alert(info_hash(2), b"de"));
        hub.publish(Alert::new(
            AlertKind::StateChanged,
            AlertCategory::STATUS,
            "state_changed",
            "seeding",
        ));
        hub.shutdown();
        task.await.expect("writer task");

        let entries = std::fs::read_dir(temp.path()).expect("list").count();
        assert_eq!(entries, 1);
    }

    #[tokio::test]
    async fn failed_write_keeps_previous_record() {
        let temp = TempDir::new().expect("tempdir");
        let writer = writer(temp.path());
        let hash = info_hash(0xee);
        writer.handle(&resume_alert(hash, b"d1:ai1ee")).await;

        let target = resume_file_path(temp.path(), &hash);
        std::fs::create_dir(staging_path(&target)).expect("block staging path");
        writer.handle(&resume_alert(hash, b"d1:ai2ee")).await;
        let err = writer.write(&hash, b"d1:ai3ee").await.expect_err("staging blocked");

        assert!(matches!(err, ResumeError::Io { operation: "resume.write", .. }));
        assert_eq!(std::fs::read(&target).expect("read"), b"d1:ai1ee");
        assert!(staging_path(&target).is_dir());
        let snapshot = writer.metrics.snapshot();
        assert_eq!(snapshot.resume_written_total, 1);
        assert_eq!(snapshot.resume_write_failures_total, 1);
    }

    #[tokio::test]
    async fn failed_rename_removes_staged_blob() {
        let temp = TempDir::new().expect("tempdir");
        let writer = writer(temp.path());
        let hash = info_hash(0xef);
        let target = resume_file_path(temp.path(), &hash);
        std::fs::create_dir(&target).expect("occupy target");
        std::fs::write(target.join("keep"), b"x").expect("fill target");

        let err = writer.write(&hash, b"de").await.expect_err("target occupied");

        assert!(matches!(err, ResumeError::Io { operation: "resume.rename", .. }));
        assert!(!staging_path(&target).exists());
        assert_eq!(std::fs::read(target.join("keep")).expect("read"), b"x");
    }
}
