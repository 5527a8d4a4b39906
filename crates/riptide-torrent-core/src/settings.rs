//! Key-typed settings pack written to the engine in one batch.

use std::collections::BTreeMap;

/// Value accepted by an engine setting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettingValue {
    /// String setting.
    Str(String),
    /// Integer setting.
    Int(i64),
    /// Boolean setting.
    Bool(bool),
}

/// Ordered collection of engine settings; later writes to a key replace earlier ones.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SettingsPack {
    values: BTreeMap<&'static str, SettingValue>,
}

impl SettingsPack {
    /// Empty pack.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Write a string setting.
    pub fn set_str(&mut self, key: &'static str, value: impl Into<String>) {
        self.values.insert(key, SettingValue::Str(value.into()));
    }

    /// Write an integer setting.
    pub fn set_int(&mut self, key: &'static str, value: i64) {
        self.values.insert(key, SettingValue::Int(value));
    }

    /// Write a boolean setting.
    pub fn set_bool(&mut self, key: &'static str, value: bool) {
        self.values.insert(key, SettingValue::Bool(value));
    }

    /// String value for `key`, if set to a string.
    #[must_use]
    pub fn get_str(&self, key: &str) -> Option<&str> {
        match self.values.get(key) {
            Some(SettingValue::Str(value)) => Some(value),
            _ => None,
        }
    }

    /// Integer value for `key`, if set to an integer.
    #[must_use]
    pub fn get_int(&self, key: &str) -> Option<i64> {
        match self.values.get(key) {
            Some(SettingValue::Int(value)) => Some(*value),
            _ => None,
        }
    }

    /// Boolean value for `key`, if set to a boolean.
    #[must_use]
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        match self.values.get(key) {
            Some(SettingValue::Bool(value)) => Some(*value),
            _ => None,
        }
    }

    /// Copy every entry of `other` into this pack, replacing existing keys.
    pub fn merge(&mut self, other: &Self) {
        for (key, value) in &other.values {
            self.values.insert(key, value.clone());
        }
    }
}

/// Setting names understood by the engine.
pub mod keys {
    #![allow(missing_docs)]

    pub const USER_AGENT: &str = "user_agent";
    pub const REQUEST_TIMEOUT: &str = "request_timeout";
    pub const PEER_CONNECT_TIMEOUT: &str = "peer_connect_timeout";
    pub const STRICT_END_GAME_MODE: &str = "strict_end_game_mode";
    pub const ANNOUNCE_TO_ALL_TRACKERS: &str = "announce_to_all_trackers";
    pub const ANNOUNCE_TO_ALL_TIERS: &str = "announce_to_all_tiers";
    pub const CONNECTION_SPEED: &str = "connection_speed";
    pub const PEER_TOS: &str = "peer_tos";
    pub const TORRENT_CONNECT_BOOST: &str = "torrent_connect_boost";
    pub const RATE_LIMIT_IP_OVERHEAD: &str = "rate_limit_ip_overhead";
    pub const NO_ATIME_STORAGE: &str = "no_atime_storage";
    pub const ANNOUNCE_DOUBLE_NAT: &str = "announce_double_nat";
    pub const PRIORITIZE_PARTIAL_PIECES: &str = "prioritize_partial_pieces";
    pub const FREE_TORRENT_HASHES: &str = "free_torrent_hashes";
    pub const USE_PAROLE_MODE: &str = "use_parole_mode";
    pub const SEED_CHOKING_ALGORITHM: &str = "seed_choking_algorithm";
    pub const UPNP_IGNORE_NONROUTERS: &str = "upnp_ignore_nonrouters";
    pub const LAZY_BITFIELDS: &str = "lazy_bitfields";
    pub const STOP_TRACKER_TIMEOUT: &str = "stop_tracker_timeout";
    pub const AUTO_SCRAPE_INTERVAL: &str = "auto_scrape_interval";
    pub const AUTO_SCRAPE_MIN_INTERVAL: &str = "auto_scrape_min_interval";
    pub const IGNORE_LIMITS_ON_LOCAL_NETWORK: &str = "ignore_limits_on_local_network";
    pub const RATE_LIMIT_UTP: &str = "rate_limit_utp";
    pub const MIXED_MODE_ALGORITHM: &str = "mixed_mode_algorithm";
    pub const ALERT_MASK: &str = "alert_mask";

    pub const CONNECTIONS_LIMIT: &str = "connections_limit";
    pub const UPLOAD_RATE_LIMIT: &str = "upload_rate_limit";
    pub const DOWNLOAD_RATE_LIMIT: &str = "download_rate_limit";
    pub const CHOKING_ALGORITHM: &str = "choking_algorithm";
    pub const SHARE_RATIO_LIMIT: &str = "share_ratio_limit";
    pub const SEED_TIME_RATIO_LIMIT: &str = "seed_time_ratio_limit";
    pub const SEED_TIME_LIMIT: &str = "seed_time_limit";
    pub const LISTEN_INTERFACES: &str = "listen_interfaces";
    pub const MAX_RETRY_PORT_BIND: &str = "max_retry_port_bind";

    pub const OUT_ENC_POLICY: &str = "out_enc_policy";
    pub const IN_ENC_POLICY: &str = "in_enc_policy";
    pub const ALLOWED_ENC_LEVEL: &str = "allowed_enc_level";
    pub const PREFER_RC4: &str = "prefer_rc4";

    pub const PROXY_TYPE: &str = "proxy_type";
    pub const PROXY_HOSTNAME: &str = "proxy_hostname";
    pub const PROXY_PORT: &str = "proxy_port";
    pub const PROXY_USERNAME: &str = "proxy_username";
    pub const PROXY_PASSWORD: &str = "proxy_password";
    pub const PROXY_HOSTNAMES: &str = "proxy_hostnames";
    pub const PROXY_PEER_CONNECTIONS: &str = "proxy_peer_connections";
    pub const PROXY_TRACKER_CONNECTIONS: &str = "proxy_tracker_connections";
    pub const FORCE_PROXY: &str = "force_proxy";
    pub const I2P_HOSTNAME: &str = "i2p_hostname";
    pub const I2P_PORT: &str = "i2p_port";
    pub const ALLOW_I2P_MIXED: &str = "allow_i2p_mixed";

    pub const ENABLE_LSD: &str = "enable_lsd";
    pub const ENABLE_DHT: &str = "enable_dht";
    pub const ENABLE_UPNP: &str = "enable_upnp";
    pub const ENABLE_NATPMP: &str = "enable_natpmp";
    pub const DHT_BOOTSTRAP_NODES: &str = "dht_bootstrap_nodes";
}

/// Integer codes the engine expects for enumerated settings.
pub mod codes {
    /// `choking_algorithm`: throughput-optimised unchoking.
    pub const CHOKER_BITTYRANT: i64 = 3;
    /// `seed_choking_algorithm`: unchoke the fastest uploaders.
    pub const SEED_CHOKER_FASTEST_UPLOAD: i64 = 1;
    /// `mixed_mode_algorithm`: prefer TCP over uTP.
    pub const MIXED_MODE_PREFER_TCP: i64 = 0;
    /// `peer_tos`: low-cost DSCP marking.
    pub const PEER_TOS_LOW_COST: i64 = 0x10;

    /// `*_enc_policy`: only encrypted connections.
    pub const ENC_POLICY_FORCED: i64 = 0;
    /// `*_enc_policy`: encrypted connections allowed.
    pub const ENC_POLICY_ENABLED: i64 = 1;
    /// `*_enc_policy`: encryption disabled.
    pub const ENC_POLICY_DISABLED: i64 = 2;
    /// `allowed_enc_level`: plaintext only.
    pub const ENC_LEVEL_PLAINTEXT: i64 = 1;
    /// `allowed_enc_level`: RC4 only.
    pub const ENC_LEVEL_RC4: i64 = 2;
    /// `allowed_enc_level`: either.
    pub const ENC_LEVEL_BOTH: i64 = 3;
}
