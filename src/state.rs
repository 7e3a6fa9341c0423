//! Application state management for the exporter.
//!
//! This module defines the shared application state that is passed
//! to HTTP handlers and used by the background poller.

use haproxy_stats_exporter::{Collector, StatsSocket};
use prometheus::Registry;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;

use crate::cache::MetricsCache;
use crate::config::Config;
use crate::metrics::HaproxyMetrics;

/// Type alias for shared application state.
pub type SharedState = Arc<AppState>;

/// Global application state shared across requests and background tasks.
pub struct AppState {
    pub registry: Registry,
    pub metrics: HaproxyMetrics,
    /// Collector with read-only settings, run on the blocking pool.
    pub collector: Arc<Collector<StatsSocket>>,
    pub cache: Arc<RwLock<MetricsCache>>,
    pub config: Arc<Config>,
    /// Server start time for uptime calculation.
    pub start_time: Instant,
}

impl AppState {
    /// Builds state with a fresh registry and an empty cache.
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let registry = Registry::new();
        let metrics = HaproxyMetrics::new(&registry)?;
        let collector = Collector::from_settings(config.collector_settings());

        Ok(Self {
            registry,
            metrics,
            collector: Arc::new(collector),
            cache: Arc::new(RwLock::new(MetricsCache::default())),
            config: Arc::new(config),
            start_time: Instant::now(),
        })
    }
}
