//! Prometheus-backed metrics registry and snapshot helpers.
//!
//! # Design
//! - Encapsulates collector registration to keep the public API small.
//! - Counts the orchestration layer's observable work: alerts fanned out,
//!   resume files written and reloaded, and torrents paused by seeding policy.

use std::sync::Arc;

use prometheus::{IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};
use serde::Serialize;

use crate::error::{Result, TelemetryError};

/// Prometheus-backed metrics registry shared by every background loop.
#[derive(Clone)]
pub struct Metrics {
    inner: Arc<MetricsInner>,
}

struct MetricsInner {
    registry: Registry,
    alerts_published_total: IntCounter,
    resume_written_total: IntCounter,
    resume_write_failures_total: IntCounter,
    resume_loaded_total: IntCounter,
    resume_load_failures_total: IntCounter,
    policy_pauses_total: IntCounterVec,
    active_torrents: IntGauge,
}

/// Snapshot of selected gauges and counters for health reporting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    /// Alerts published to subscribers.
    pub alerts_published_total: u64,
    /// Resume files written successfully.
    pub resume_written_total: u64,
    /// Resume writes that failed.
    pub resume_write_failures_total: u64,
    /// Resume files re-added at startup.
    pub resume_loaded_total: u64,
    /// Resume files skipped at startup.
    pub resume_load_failures_total: u64,
    /// Torrents still downloading at the last seeding-loop tick.
    pub active_torrents: i64,
}

fn counter(name: &'static str, help: &str) -> Result<IntCounter> {
    IntCounter::with_opts(Opts::new(name, help))
        .map_err(|source| TelemetryError::metric("metrics.build", name, source))
}

fn register<C>(registry: &Registry, name: &'static str, collector: &C) -> Result<()>
where
    C: prometheus::core::Collector + Clone + 'static,
{
    registry
        .register(Box::new(collector.clone()))
        .map_err(|source| TelemetryError::metric("metrics.register", name, source))
}

impl Metrics {
    /// Construct a new metrics registry with the standard collectors registered.
    ///
    /// # Errors
    ///
    /// Returns an error if any of the Prometheus collectors cannot be
    /// built or registered.
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let alerts_published_total = counter(
            "alerts_published_total",
            "Engine alerts published to subscribers",
        )?;
        let resume_written_total = counter(
            "resume_written_total",
            "Resume files written to the resume directory",
        )?;
        let resume_write_failures_total = counter(
            "resume_write_failures_total",
            "Resume data that could not be persisted",
        )?;
        let resume_loaded_total = counter(
            "resume_loaded_total",
            "Resume files re-added to the engine at startup",
        )?;
        let resume_load_failures_total = counter(
            "resume_load_failures_total",
            "Resume files skipped at startup",
        )?;
        let policy_pauses_total = IntCounterVec::new(
            Opts::new(
                "policy_pauses_total",
                "Finished torrents paused by seeding policy, by limit",
            ),
            &["limit"],
        )
        .map_err(|source| TelemetryError::metric("metrics.build", "policy_pauses_total", source))?;
        let active_torrents = IntGauge::with_opts(Opts::new(
            "active_torrents",
            "Torrents still downloading at the last policy tick",
        ))
        .map_err(|source| TelemetryError::metric("metrics.build", "active_torrents", source))?;

        register(&registry, "alerts_published_total", &alerts_published_total)?;
        register(&registry, "resume_written_total", &resume_written_total)?;
        register(
            &registry,
            "resume_write_failures_total",
            &resume_write_failures_total,
        )?;
        register(&registry, "resume_loaded_total", &resume_loaded_total)?;
        register(
            &registry,
            "resume_load_failures_total",
            &resume_load_failures_total,
        )?;
        register(&registry, "policy_pauses_total", &policy_pauses_total)?;
        register(&registry, "active_torrents", &active_torrents)?;

        Ok(Self {
            inner: Arc::new(MetricsInner {
                registry,
                alerts_published_total,
                resume_written_total,
                resume_write_failures_total,
                resume_loaded_total,
                resume_load_failures_total,
                policy_pauses_total,
                active_torrents,
            }),
        })
    }

    /// Count one alert published through the broadcaster.
    pub fn inc_alert_published(&self) {
        self.inner.alerts_published_total.inc();
    }

    /// Count one resume file written.
    pub fn inc_resume_written(&self) {
        self.inner.resume_written_total.inc();
    }

    /// Count one failed resume write (or failed resume-data request).
    pub fn inc_resume_write_failure(&self) {
        self.inner.resume_write_failures_total.inc();
    }

    /// Count one resume file re-added at startup.
    pub fn inc_resume_loaded(&self) {
        self.inner.resume_loaded_total.inc();
    }

    /// Count one resume file skipped at startup.
    pub fn inc_resume_load_failure(&self) {
        self.inner.resume_load_failures_total.inc();
    }

    /// Count a policy pause triggered by the named limit.
    pub fn inc_policy_pause(&self, limit: &str) {
        self.inner
            .policy_pauses_total
            .with_label_values(&[limit])
            .inc();
    }

    /// Read the policy pause counter for the named limit.
    #[must_use]
    pub fn policy_pauses(&self, limit: &str) -> u64 {
        self.inner
            .policy_pauses_total
            .with_label_values(&[limit])
            .get()
    }

    /// Set the active torrent gauge.
    pub fn set_active_torrents(&self, count: i64) {
        self.inner.active_torrents.set(count);
    }

    /// Render the metrics registry using the Prometheus text exposition format.
    ///
    /// # Errors
    ///
    /// Returns [`TelemetryError::Metrics`] if the metrics cannot be encoded.
    pub fn render(&self) -> Result<String> {
        TextEncoder::new()
            .encode_to_string(&self.inner.registry.gather())
            .map_err(|source| TelemetryError::Metrics {
                operation: "metrics.render",
                metric: None,
                source,
            })
    }

    /// Take a point-in-time snapshot of the counters and gauges.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            alerts_published_total: self.inner.alerts_published_total.get(),
            resume_written_total: self.inner.resume_written_total.get(),
            resume_write_failures_total: self.inner.resume_write_failures_total.get(),
            resume_loaded_total: self.inner.resume_loaded_total.get(),
            resume_load_failures_total: self.inner.resume_load_failures_total.get(),
            active_torrents: self.inner.active_torrents.get(),
        }
    }
}
