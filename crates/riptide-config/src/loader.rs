//! Loading configuration documents from disk.

use std::path::Path;

use tracing::info;

use crate::error::{ConfigError, ConfigResult};
use crate::model::Configuration;
use crate::validate::Validated;

impl Configuration {
    /// Read, parse and validate a JSON configuration document.
    ///
    /// Fields missing from the document take their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] when the file cannot be read,
    /// [`ConfigError::Parse`] when it is not a valid document, and any
    /// validation error from [`Configuration::validate`].
    pub async fn load(path: impl AsRef<Path>) -> ConfigResult<Validated> {
        let path = path.as_ref();
        let raw = tokio::fs::read(path).await.map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_json_slice(path, &raw)?;
        let validated = config.validate()?;
        info!(
            path = %path.display(),
            warnings = validated.warnings.len(),
            "configuration loaded"
        );
        Ok(validated)
    }

    fn from_json_slice(path: &Path, raw: &[u8]) -> ConfigResult<Self> {
        serde_json::from_slice(raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::EncryptionPolicy;
    use tempfile::TempDir;

    #[tokio::test]
    async fn load_reads_and_validates_document() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("config.json");
        tokio::fs::write(
            &path,
            br#"{"encryption": 0, "session_save": 30, "resume_path": "/var/lib/riptide"}"#,
        )
        .await
        .expect("write config");

        let validated = Configuration::load(&path).await.expect("load config");
        assert_eq!(validated.config.encryption, EncryptionPolicy::Disabled);
        assert_eq!(validated.config.session_save, 30);
        assert_eq!(
            validated.config.resume_path,
            std::path::PathBuf::from("/var/lib/riptide")
        );
    }

    #[tokio::test]
    async fn load_reports_missing_file_and_bad_json() {
        let dir = TempDir::new().expect("tempdir");
        let missing = dir.path().join("absent.json");
        assert!(matches!(
            Configuration::load(&missing).await,
            Err(ConfigError::Io { .. })
        ));

        let broken = dir.path().join("broken.json");
        tokio::fs::write(&broken, b"{not json")
            .await
            .expect("write broken");
        assert!(matches!(
            Configuration::load(&broken).await,
            Err(ConfigError::Parse { .. })
        ));
    }
}
