//! Snapshot of the last collection cycle.
//!
//! The poller replaces the snapshot after every cycle; handlers only read it.

use chrono::{DateTime, Utc};
use haproxy_stats_exporter::EmittedMetric;
use std::time::Instant;

/// Last-cycle state with update timing information.
#[derive(Debug, Clone, Default)]
pub struct MetricsCache {
    pub metrics: Vec<EmittedMetric>,
    pub last_updated: Option<Instant>,
    pub last_updated_at: Option<DateTime<Utc>>,
    pub update_duration_seconds: f64,
    pub update_success: bool,
    pub is_updating: bool,
    pub cycles_total: u64,
    pub empty_cycles_total: u64,
}

impl MetricsCache {
    /// Records a finished cycle. A cycle that emitted nothing counts as failed.
    pub fn record_cycle(&mut self, metrics: Vec<EmittedMetric>, duration_seconds: f64) {
        self.update_success = !metrics.is_empty();
        if !self.update_success {
            self.empty_cycles_total += 1;
        }
        self.cycles_total += 1;
        self.metrics = metrics;
        self.last_updated = Some(Instant::now());
        self.last_updated_at = Some(Utc::now());
        self.update_duration_seconds = duration_seconds;
        self.is_updating = false;
    }
}
