//! Configuration snapshot and proxy settings.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::defaults;
use crate::error::ConfigError;

/// Operator intent for one engine session.
///
/// A value is never mutated while in use; reconfiguration replaces it
/// wholesale.
#[allow(clippy::struct_excessive_bools)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Configuration {
    /// Run the resume reload and the seeding loop.
    pub background_handling: bool,
    /// Bytes buffered before playback is considered ready.
    pub buffer_size: u64,
    /// Upload cap in bytes per second; 0 is unlimited.
    pub max_upload_rate: u64,
    /// Download cap in bytes per second; 0 is unlimited.
    pub max_download_rate: u64,
    /// Defer rate limits until buffering completes.
    pub limit_after_buffering: bool,
    /// Peer connection cap; 0 picks a platform default.
    pub connections_limit: u32,
    /// Seconds between resume-data snapshot requests; 0 disables them.
    pub session_save: u64,
    /// Upload/download percentage at which a finished torrent is paused; 0 disables.
    pub share_ratio_limit: u32,
    /// Seeding-time/active-time percentage at which a finished torrent is paused; 0 disables.
    pub seed_time_ratio_limit: u32,
    /// Seconds of seeding after which a finished torrent is paused; 0 disables.
    pub seed_time_limit: u64,
    /// Keep the DHT off.
    pub disable_dht: bool,
    /// Keep UPnP and NAT-PMP off.
    pub disable_upnp: bool,
    /// Peer encryption policy.
    pub encryption: EncryptionPolicy,
    /// Lower bound of the listen port range.
    pub lower_listen_port: u16,
    /// Upper bound of the listen port range.
    pub upper_listen_port: u16,
    /// Directory that receives downloaded data.
    pub download_path: PathBuf,
    /// Directory holding resume files.
    pub resume_path: PathBuf,
    /// Optional proxy for tracker, peer and hostname traffic.
    pub proxy: Option<ProxySettings>,
    /// User agent advertised to trackers and peers.
    pub user_agent: String,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            background_handling: defaults::BACKGROUND_HANDLING,
            buffer_size: defaults::BUFFER_SIZE,
            max_upload_rate: 0,
            max_download_rate: 0,
            limit_after_buffering: false,
            connections_limit: 0,
            session_save: defaults::SESSION_SAVE_SECS,
            share_ratio_limit: 0,
            seed_time_ratio_limit: 0,
            seed_time_limit: 0,
            disable_dht: false,
            disable_upnp: false,
            encryption: EncryptionPolicy::default(),
            lower_listen_port: defaults::LOWER_LISTEN_PORT,
            upper_listen_port: defaults::UPPER_LISTEN_PORT,
            download_path: PathBuf::from(defaults::DOWNLOAD_PATH),
            resume_path: PathBuf::from(defaults::RESUME_PATH),
            proxy: None,
            user_agent: defaults::user_agent(),
        }
    }
}

/// Peer encryption policy, written as `0`, `1` or `2` in configuration documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum EncryptionPolicy {
    /// Plaintext connections only.
    Disabled,
    /// Encryption allowed, plaintext preferred.
    #[default]
    Enabled,
    /// Encrypted connections only, RC4 preferred.
    Forced,
}

impl TryFrom<u8> for EncryptionPolicy {
    type Error = ConfigError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Disabled),
            1 => Ok(Self::Enabled),
            2 => Ok(Self::Forced),
            other => Err(ConfigError::InvalidEncryptionPolicy { value: other }),
        }
    }
}

impl From<EncryptionPolicy> for u8 {
    fn from(policy: EncryptionPolicy) -> Self {
        match policy {
            EncryptionPolicy::Disabled => 0,
            EncryptionPolicy::Enabled => 1,
            EncryptionPolicy::Forced => 2,
        }
    }
}

/// Proxy protocols the engine understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProxyType {
    /// No proxy.
    #[default]
    None,
    /// SOCKS4 without authentication.
    Socks4,
    /// SOCKS5 without authentication.
    Socks5,
    /// SOCKS5 with username and password.
    Socks5Password,
    /// HTTP CONNECT without authentication.
    Http,
    /// HTTP CONNECT with username and password.
    HttpPassword,
    /// I2P SAM bridge.
    I2pSam,
}

impl ProxyType {
    /// Integer code written to the engine's `proxy_type` setting.
    #[must_use]
    pub const fn engine_code(self) -> i64 {
        match self {
            Self::None => 0,
            Self::Socks4 => 1,
            Self::Socks5 => 2,
            Self::Socks5Password => 3,
            Self::Http => 4,
            Self::HttpPassword => 5,
            Self::I2pSam => 6,
        }
    }

    /// Whether credentials are sent for this proxy type.
    #[must_use]
    pub const fn supports_auth(self) -> bool {
        matches!(self, Self::Socks5Password | Self::HttpPassword)
    }

    /// Canonical string form, matching the serialized name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Socks4 => "socks4",
            Self::Socks5 => "socks5",
            Self::Socks5Password => "socks5_password",
            Self::Http => "http",
            Self::HttpPassword => "http_password",
            Self::I2pSam => "i2p_sam",
        }
    }
}

/// Proxy endpoint and optional credentials.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxySettings {
    /// Proxy protocol.
    #[serde(rename = "type")]
    pub proxy_type: ProxyType,
    /// Proxy host name or address.
    pub host: String,
    /// Proxy port.
    pub port: u16,
    /// Username for auth-capable proxy types.
    pub username: String,
    /// Password for auth-capable proxy types.
    pub password: String,
}

impl ProxySettings {
    /// Whether any credential field is filled in.
    #[must_use]
    pub fn has_credentials(&self) -> bool {
        !self.username.is_empty() || !self.password.is_empty()
    }
}
