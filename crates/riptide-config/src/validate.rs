//! Validation and normalisation of configuration snapshots.
//!
//! # Design
//! - Hard violations return [`ConfigError::InvalidField`].
//! - Soft violations are corrected in place and reported as guard-rail warnings.

use tracing::warn;

use crate::error::{ConfigError, ConfigResult};
use crate::model::{Configuration, ProxyType};

/// A configuration that passed validation, plus the corrections applied to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Validated {
    /// Normalised configuration ready for use.
    pub config: Configuration,
    /// Guard-rail warnings describing each correction.
    pub warnings: Vec<String>,
}

impl Configuration {
    /// Check the configuration and normalise soft violations.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidField`] when the listen port range is
    /// inverted, a required path is empty, or a proxy has no endpoint.
    pub fn validate(mut self) -> ConfigResult<Validated> {
        let mut warnings = Vec::new();

        if self.upper_listen_port < self.lower_listen_port {
            return Err(ConfigError::InvalidField {
                field: "upper_listen_port",
                value: Some(self.upper_listen_port.to_string()),
                reason: "must not be below lower_listen_port",
            });
        }
        if self.lower_listen_port == 0 {
            return Err(ConfigError::InvalidField {
                field: "lower_listen_port",
                value: Some("0".to_string()),
                reason: "must be between 1 and 65535",
            });
        }
        if self.download_path.as_os_str().is_empty() {
            return Err(ConfigError::InvalidField {
                field: "download_path",
                value: None,
                reason: "must not be empty",
            });
        }
        if self.resume_path.as_os_str().is_empty() {
            return Err(ConfigError::InvalidField {
                field: "resume_path",
                value: None,
                reason: "must not be empty",
            });
        }

        if self
            .proxy
            .as_ref()
            .is_some_and(|proxy| proxy.proxy_type == ProxyType::None)
        {
            warnings.push("proxy block with type 'none' ignored".to_string());
            self.proxy = None;
        }
        if let Some(proxy) = self.proxy.as_mut() {
            if proxy.host.trim().is_empty() {
                return Err(ConfigError::InvalidField {
                    field: "proxy.host",
                    value: None,
                    reason: "must not be empty",
                });
            }
            if proxy.port == 0 {
                return Err(ConfigError::InvalidField {
                    field: "proxy.port",
                    value: Some("0".to_string()),
                    reason: "must be between 1 and 65535",
                });
            }
            if proxy.has_credentials() && !proxy.proxy_type.supports_auth() {
                warnings.push(format!(
                    "proxy credentials dropped; type '{}' does not authenticate",
                    proxy.proxy_type.as_str()
                ));
                proxy.username.clear();
                proxy.password.clear();
            }
        }

        if self.session_save == 0 {
            warnings.push("session_save is 0; periodic resume snapshots disabled".to_string());
        }
        if self.user_agent.trim().is_empty() {
            warnings.push("empty user_agent replaced with default".to_string());
            self.user_agent = crate::defaults::user_agent();
        }

        for message in &warnings {
            warn!(warning = %message, "configuration guard rail applied");
        }

        Ok(Validated {
            config: self,
            warnings,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ProxySettings;

    fn proxy(proxy_type: ProxyType) -> ProxySettings {
        ProxySettings {
            proxy_type,
            host: "proxy.local".into(),
            port: 1080,
            username: "user".into(),
            password: "secret".into(),
        }
    }

    #[test]
    fn defaults_validate_cleanly() {
        let validated = Configuration::default().validate().expect("defaults valid");
        assert!(validated.warnings.is_empty());
        assert_eq!(validated.config, Configuration::default());
    }

    #[test]
    fn inverted_port_range_is_rejected() {
        let config = Configuration {
            lower_listen_port: 7000,
            upper_listen_port: 6000,
            ..Configuration::default()
        };
        let err = config.validate().expect_err("inverted range");
        assert!(matches!(
            err,
            ConfigError::InvalidField {
                field: "upper_listen_port",
                ..
            }
        ));
    }

    #[test]
    fn proxy_without_host_is_rejected() {
        let mut settings = proxy(ProxyType::Socks5);
        settings.host.clear();
        let config = Configuration {
            proxy: Some(settings),
            ..Configuration::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidField {
                field: "proxy.host",
                ..
            })
        ));
    }

    #[test]
    fn credentials_dropped_for_types_without_auth() {
        let config = Configuration {
            proxy: Some(proxy(ProxyType::Socks4)),
            ..Configuration::default()
        };
        let validated = config.validate().expect("socks4 proxy valid");
        let kept = validated.config.proxy.expect("proxy kept");
        assert!(!kept.has_credentials());
        assert_eq!(validated.warnings.len(), 1);

        let config = Configuration {
            proxy: Some(proxy(ProxyType::HttpPassword)),
            ..Configuration::default()
        };
        let validated = config.validate().expect("http proxy valid");
        assert!(validated.config.proxy.expect("proxy kept").has_credentials());
        assert!(validated.warnings.is_empty());
    }

    #[test]
    fn zero_session_save_warns() {
        let config = Configuration {
            session_save: 0,
            ..Configuration::default()
        };
        let validated = config.validate().expect("valid");
        assert_eq!(validated.config.session_save, 0);
        assert!(validated.warnings[0].contains("session_save"));
    }
}
