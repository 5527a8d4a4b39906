//! Translates a [`Configuration`] into engine settings and owns the
//! discovery-service toggles.
//!
//! # Design
//! - `build_settings` is pure: it produces the full settings pack plus
//!   guard-rail warnings for values the engine cannot represent.
//! - Discovery services (LSD, DHT, UPnP, NAT-PMP) are off in a freshly built
//!   pack and only switched on by `start_services`.
//! - Every mutation of the live settings goes through one mutex, so
//!   `reconfigure` (stop, replace, configure, start) is never interleaved with
//!   another writer.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use riptide_config::{Configuration, EncryptionPolicy, ProxyType};
use riptide_torrent_core::settings::{codes, keys};
use riptide_torrent_core::{AlertCategory, EngineSession, SettingsPack};
use tracing::{info, warn};

use crate::error::{SessionError, SessionResult};

/// DHT routers contacted when the DHT starts.
pub const DHT_BOOTSTRAP_NODES: [&str; 4] = [
    "router.bittorrent.com",
    "router.utorrent.com",
    "dht.transmissionbt.com",
    "dht.aelitis.com",
];

const DHT_BOOTSTRAP_PORT: u16 = 6881;

/// Largest value the engine accepts for an integer setting.
const ENGINE_INT_MAX: i64 = i32::MAX as i64;

/// Bootstrap router list in the engine's `host:port,host:port` form.
#[must_use]
pub fn bootstrap_nodes() -> String {
    DHT_BOOTSTRAP_NODES
        .iter()
        .map(|host| format!("{host}:{DHT_BOOTSTRAP_PORT}"))
        .collect::<Vec<_>>()
        .join(",")
}

/// Connection cap used when the configuration leaves it at 0.
#[must_use]
pub const fn platform_connections_limit() -> i64 {
    if cfg!(target_os = "android") {
        50
    } else if cfg!(target_pointer_width = "32") {
        100
    } else {
        200
    }
}

/// Engine settings derived from a configuration, plus guard-rail warnings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettingsPlan {
    /// Settings ready to apply.
    pub pack: SettingsPack,
    /// Corrections applied while building the pack.
    pub warnings: Vec<String>,
}

/// Build the complete settings pack for `config`, with discovery services off.
#[must_use]
pub fn build_settings(config: &Configuration) -> SettingsPlan {
    let mut pack = SettingsPack::new();
    let mut warnings = Vec::new();

    apply_baseline(&mut pack, config);
    apply_limits(&mut pack, config, &mut warnings);
    apply_listen_ports(&mut pack, config);
    apply_encryption(&mut pack, config.encryption);
    apply_proxy(&mut pack, config);
    set_services(&mut pack, false, false, false);

    SettingsPlan { pack, warnings }
}

fn apply_baseline(pack: &mut SettingsPack, config: &Configuration) {
    pack.set_str(keys::USER_AGENT, config.user_agent.clone());
    pack.set_int(keys::REQUEST_TIMEOUT, 2);
    pack.set_int(keys::PEER_CONNECT_TIMEOUT, 2);
    pack.set_bool(keys::STRICT_END_GAME_MODE, true);
    pack.set_bool(keys::ANNOUNCE_TO_ALL_TRACKERS, true);
    pack.set_bool(keys::ANNOUNCE_TO_ALL_TIERS, true);
    pack.set_int(keys::CONNECTION_SPEED, 500);
    pack.set_int(keys::PEER_TOS, codes::PEER_TOS_LOW_COST);
    pack.set_int(keys::TORRENT_CONNECT_BOOST, 0);
    pack.set_bool(keys::RATE_LIMIT_IP_OVERHEAD, true);
    pack.set_bool(keys::NO_ATIME_STORAGE, true);
    pack.set_bool(keys::ANNOUNCE_DOUBLE_NAT, true);
    pack.set_bool(keys::PRIORITIZE_PARTIAL_PIECES, false);
    pack.set_bool(keys::FREE_TORRENT_HASHES, true);
    pack.set_bool(keys::USE_PAROLE_MODE, true);
    pack.set_int(keys::SEED_CHOKING_ALGORITHM, codes::SEED_CHOKER_FASTEST_UPLOAD);
    pack.set_bool(keys::UPNP_IGNORE_NONROUTERS, true);
    pack.set_bool(keys::LAZY_BITFIELDS, true);
    pack.set_int(keys::STOP_TRACKER_TIMEOUT, 1);
    pack.set_int(keys::AUTO_SCRAPE_INTERVAL, 1200);
    pack.set_int(keys::AUTO_SCRAPE_MIN_INTERVAL, 900);
    pack.set_bool(keys::IGNORE_LIMITS_ON_LOCAL_NETWORK, true);
    pack.set_bool(keys::RATE_LIMIT_UTP, true);
    pack.set_int(keys::MIXED_MODE_ALGORITHM, codes::MIXED_MODE_PREFER_TCP);
    pack.set_int(
        keys::ALERT_MASK,
        i64::from((AlertCategory::STATUS | AlertCategory::STORAGE).bits()),
    );

    // Engine defaults for everything `apply_limits` may override.
    pack.set_int(keys::DOWNLOAD_RATE_LIMIT, 0);
    pack.set_int(keys::UPLOAD_RATE_LIMIT, 0);
    pack.set_int(keys::CHOKING_ALGORITHM, 0);
    pack.set_int(keys::SHARE_RATIO_LIMIT, 0);
    pack.set_int(keys::SEED_TIME_RATIO_LIMIT, 0);
    pack.set_int(keys::SEED_TIME_LIMIT, 0);
}

fn clamp_engine_int(field: &str, value: u64, warnings: &mut Vec<String>) -> i64 {
    match i64::try_from(value) {
        Ok(value) if value <= ENGINE_INT_MAX => value,
        _ => {
            warnings.push(format!(
                "{field} {value} exceeds the engine maximum; clamping to {ENGINE_INT_MAX}"
            ));
            ENGINE_INT_MAX
        }
    }
}

fn apply_limits(pack: &mut SettingsPack, config: &Configuration, warnings: &mut Vec<String>) {
    if config.connections_limit > 0 {
        pack.set_int(keys::CONNECTIONS_LIMIT, i64::from(config.connections_limit));
    } else {
        pack.set_int(keys::CONNECTIONS_LIMIT, platform_connections_limit());
    }

    if config.limit_after_buffering {
        if config.max_download_rate > 0 || config.max_upload_rate > 0 {
            info!("rate limits deferred until buffering completes");
        }
    } else {
        if config.max_download_rate > 0 {
            let rate = clamp_engine_int("max_download_rate", config.max_download_rate, warnings);
            info!(kib_per_sec = rate / 1024, "rate limiting download");
            pack.set_int(keys::DOWNLOAD_RATE_LIMIT, rate);
        }
        if config.max_upload_rate > 0 {
            let rate = clamp_engine_int("max_upload_rate", config.max_upload_rate, warnings);
            info!(kib_per_sec = rate / 1024, "rate limiting upload");
            pack.set_int(keys::UPLOAD_RATE_LIMIT, rate);
            pack.set_int(keys::CHOKING_ALGORITHM, codes::CHOKER_BITTYRANT);
        }
    }

    if config.share_ratio_limit > 0 {
        pack.set_int(keys::SHARE_RATIO_LIMIT, i64::from(config.share_ratio_limit));
    }
    if config.seed_time_ratio_limit > 0 {
        pack.set_int(
            keys::SEED_TIME_RATIO_LIMIT,
            i64::from(config.seed_time_ratio_limit),
        );
    }
    if config.seed_time_limit > 0 {
        let limit = clamp_engine_int("seed_time_limit", config.seed_time_limit, warnings);
        pack.set_int(keys::SEED_TIME_LIMIT, limit);
    }
}

fn apply_listen_ports(pack: &mut SettingsPack, config: &Configuration) {
    pack.set_str(
        keys::LISTEN_INTERFACES,
        format!(
            "0.0.0.0:{port},[::]:{port}",
            port = config.lower_listen_port
        ),
    );
    let retries = config
        .upper_listen_port
        .saturating_sub(config.lower_listen_port);
    pack.set_int(keys::MAX_RETRY_PORT_BIND, i64::from(retries));
}

fn apply_encryption(pack: &mut SettingsPack, policy: EncryptionPolicy) {
    let (enc_policy, level, prefer_rc4) = match policy {
        EncryptionPolicy::Disabled => (
            codes::ENC_POLICY_DISABLED,
            codes::ENC_LEVEL_PLAINTEXT,
            false,
        ),
        EncryptionPolicy::Enabled => (codes::ENC_POLICY_ENABLED, codes::ENC_LEVEL_BOTH, false),
        EncryptionPolicy::Forced => (codes::ENC_POLICY_FORCED, codes::ENC_LEVEL_RC4, true),
    };
    pack.set_int(keys::OUT_ENC_POLICY, enc_policy);
    pack.set_int(keys::IN_ENC_POLICY, enc_policy);
    pack.set_int(keys::ALLOWED_ENC_LEVEL, level);
    pack.set_bool(keys::PREFER_RC4, prefer_rc4);
}

fn apply_proxy(pack: &mut SettingsPack, config: &Configuration) {
    let Some(proxy) = config
        .proxy
        .as_ref()
        .filter(|proxy| proxy.proxy_type != ProxyType::None)
    else {
        pack.set_int(keys::PROXY_TYPE, ProxyType::None.engine_code());
        return;
    };

    info!(proxy_type = proxy.proxy_type.as_str(), host = %proxy.host, "applying proxy settings");
    pack.set_int(keys::PROXY_TYPE, proxy.proxy_type.engine_code());
    pack.set_str(keys::PROXY_HOSTNAME, proxy.host.clone());
    pack.set_int(keys::PROXY_PORT, i64::from(proxy.port));
    pack.set_str(keys::PROXY_USERNAME, proxy.username.clone());
    pack.set_str(keys::PROXY_PASSWORD, proxy.password.clone());
    pack.set_bool(keys::PROXY_TRACKER_CONNECTIONS, true);
    pack.set_bool(keys::PROXY_PEER_CONNECTIONS, true);
    pack.set_bool(keys::PROXY_HOSTNAMES, true);
    pack.set_bool(keys::FORCE_PROXY, true);

    if proxy.proxy_type == ProxyType::I2pSam {
        pack.set_str(keys::I2P_HOSTNAME, proxy.host.clone());
        pack.set_int(keys::I2P_PORT, i64::from(proxy.port));
        pack.set_bool(keys::ALLOW_I2P_MIXED, true);
    }
}

fn set_services(pack: &mut SettingsPack, lsd: bool, dht: bool, port_mapping: bool) {
    pack.set_bool(keys::ENABLE_LSD, lsd);
    pack.set_bool(keys::ENABLE_DHT, dht);
    pack.set_bool(keys::ENABLE_UPNP, port_mapping);
    pack.set_bool(keys::ENABLE_NATPMP, port_mapping);
}

struct ConfiguratorState {
    config: Arc<Configuration>,
    pack: SettingsPack,
}

/// Owns the live settings pack of one engine session.
pub struct SessionConfigurator {
    session: Arc<dyn EngineSession>,
    state: Mutex<ConfiguratorState>,
}

impl SessionConfigurator {
    /// Build settings for `config` and apply them to `session`.
    ///
    /// Discovery services stay off until [`SessionConfigurator::start_services`].
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::ApplySettings`] when the engine rejects the pack.
    pub fn configure(
        session: Arc<dyn EngineSession>,
        config: Arc<Configuration>,
    ) -> SessionResult<Self> {
        let configurator = Self {
            session,
            state: Mutex::new(ConfiguratorState {
                config: Arc::clone(&config),
                pack: SettingsPack::new(),
            }),
        };
        {
            let mut state = configurator.lock();
            configurator.apply_config(&mut state, config)?;
        }
        Ok(configurator)
    }

    /// Switch on LSD, plus DHT and port mapping unless the configuration disables them.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::ApplySettings`] when the engine rejects the change.
    pub fn start_services(&self) -> SessionResult<()> {
        let mut state = self.lock();
        self.start_locked(&mut state)
    }

    /// Switch off LSD, DHT, UPnP and NAT-PMP.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::ApplySettings`] when the engine rejects the change.
    pub fn stop_services(&self) -> SessionResult<()> {
        let mut state = self.lock();
        self.stop_locked(&mut state)
    }

    /// Stop services, replace the configuration, re-apply settings and start
    /// services again, all under one lock.
    ///
    /// When the engine rejects the new settings the previous configuration is
    /// kept and its services are started again.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::ApplySettings`] from whichever step the engine rejected.
    pub fn reconfigure(&self, config: Arc<Configuration>) -> SessionResult<()> {
        let mut state = self.lock();
        self.stop_locked(&mut state)?;
        if let Err(err) = self.apply_config(&mut state, config) {
            warn!(error = %err, "new settings rejected; restoring previous services");
            if let Err(restore) = self.start_locked(&mut state) {
                warn!(error = %restore, "failed to restore discovery services");
            }
            return Err(err);
        }
        self.start_locked(&mut state)
    }

    /// Configuration currently applied.
    #[must_use]
    pub fn config(&self) -> Arc<Configuration> {
        Arc::clone(&self.lock().config)
    }

    /// Settings pack currently applied.
    #[must_use]
    pub fn settings(&self) -> SettingsPack {
        self.lock().pack.clone()
    }

    /// Engine session being configured.
    #[must_use]
    pub const fn session(&self) -> &Arc<dyn EngineSession> {
        &self.session
    }

    fn lock(&self) -> MutexGuard<'_, ConfiguratorState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn apply_config(
        &self,
        state: &mut ConfiguratorState,
        config: Arc<Configuration>,
    ) -> SessionResult<()> {
        info!(user_agent = %config.user_agent, "applying session settings");
        let plan = build_settings(&config);
        for warning in &plan.warnings {
            warn!(warning = %warning, "session settings guard rail applied");
        }
        self.session
            .apply_settings(&plan.pack)
            .map_err(|source| SessionError::ApplySettings {
                operation: "configure",
                source,
            })?;
        state.config = config;
        state.pack = plan.pack;
        Ok(())
    }

    fn start_locked(&self, state: &mut ConfiguratorState) -> SessionResult<()> {
        let dht = !state.config.disable_dht;
        let port_mapping = !state.config.disable_upnp;
        info!(
            lsd = true,
            dht,
            upnp = port_mapping,
            natpmp = port_mapping,
            "starting discovery services"
        );
        if dht {
            state.pack.set_str(keys::DHT_BOOTSTRAP_NODES, bootstrap_nodes());
        }
        set_services(&mut state.pack, true, dht, port_mapping);
        self.apply(state, "start_services")
    }

    fn stop_locked(&self, state: &mut ConfiguratorState) -> SessionResult<()> {
        info!("stopping discovery services");
        set_services(&mut state.pack, false, false, false);
        self.apply(state, "stop_services")
    }

    fn apply(&self, state: &ConfiguratorState, operation: &'static str) -> SessionResult<()> {
        self.session
            .apply_settings(&state.pack)
            .map_err(|source| SessionError::ApplySettings { operation, source })
    }
}
