//! Prometheus metrics definitions for haproxy-stats-exporter.
//!
//! Collected HAProxy values are exposed as three labelled families, one per
//! value kind, with the dotted metric name as the `metric` label. The exporter
//! also reports on its own collection cycles.

use haproxy_stats_exporter::{EmittedMetric, MetricSink, ValueKind};
use prometheus::proto::MetricFamily;
use prometheus::{Gauge, IntCounterVec, IntGauge, IntGaugeVec, Opts, Registry};
use std::sync::{Arc, RwLock as StdRwLock};
use tracing::trace;

/// Collection of Prometheus metrics exposed on `/metrics`.
#[derive(Clone)]
pub struct HaproxyMetrics {
    // ========== Collected Values ==========
    pub gauge: IntGaugeVec,     // labels: metric
    pub counter: IntCounterVec, // labels: metric
    pub derive: IntCounterVec,  // labels: metric

    // ========== Exporter Metrics ==========
    pub collect_duration_seconds: Gauge,
    pub collect_success: IntGauge,
    pub metrics_emitted: IntGauge,
    pub scrape_duration_seconds: Gauge,

    /// Held for writing while a cycle is replayed, for reading while gathering,
    /// so a scrape never sees a half-published cycle.
    cycle_lock: Arc<StdRwLock<()>>,
}

impl HaproxyMetrics {
    /// Creates all metric families and registers them with `registry`.
    pub fn new(registry: &Registry) -> Result<Self, prometheus::Error> {
        let gauge = IntGaugeVec::new(
            Opts::new("haproxy_gauge", "HAProxy values that can go up and down"),
            &["metric"],
        )?;
        let counter = IntCounterVec::new(
            Opts::new("haproxy_counter", "HAProxy cumulative counters"),
            &["metric"],
        )?;
        let derive = IntCounterVec::new(
            Opts::new(
                "haproxy_derive",
                "HAProxy cumulative values meant to be read as a rate",
            ),
            &["metric"],
        )?;

        let collect_duration_seconds = Gauge::new(
            "haproxy_exporter_collect_duration_seconds",
            "Time spent in the last collection cycle",
        )?;
        let collect_success = IntGauge::new(
            "haproxy_exporter_collect_success",
            "Whether the last collection cycle produced metrics (1) or not (0)",
        )?;
        let metrics_emitted = IntGauge::new(
            "haproxy_exporter_metrics_emitted",
            "Number of metrics emitted by the last collection cycle",
        )?;
        let scrape_duration_seconds = Gauge::new(
            "haproxy_exporter_scrape_duration_seconds",
            "Time spent encoding the /metrics response",
        )?;

        registry.register(Box::new(gauge.clone()))?;
        registry.register(Box::new(counter.clone()))?;
        registry.register(Box::new(derive.clone()))?;
        registry.register(Box::new(collect_duration_seconds.clone()))?;
        registry.register(Box::new(collect_success.clone()))?;
        registry.register(Box::new(metrics_emitted.clone()))?;
        registry.register(Box::new(scrape_duration_seconds.clone()))?;

        Ok(Self {
            gauge,
            counter,
            derive,
            collect_duration_seconds,
            collect_success,
            metrics_emitted,
            scrape_duration_seconds,
            cycle_lock: Arc::new(StdRwLock::new(())),
        })
    }

    /// Drops every labelled series so metrics that vanished from HAProxy
    /// do not linger with stale values.
    pub fn reset_collected(&self) {
        self.gauge.reset();
        self.counter.reset();
        self.derive.reset();
    }

    /// Publishes one cycle's worth of metrics, replacing the previous cycle.
    pub fn publish(&self, metrics: &[EmittedMetric]) {
        let _guard = self.cycle_lock.write().unwrap_or_else(|e| e.into_inner());
        self.reset_collected();
        let mut sink = PrometheusSink::new(self);
        for metric in metrics {
            sink.emit(haproxy_stats_exporter::PLUGIN_NAME, metric);
        }
    }

    /// Gathers `registry` without interleaving with [`HaproxyMetrics::publish`].
    pub fn gather(&self, registry: &Registry) -> Vec<MetricFamily> {
        let _guard = self.cycle_lock.read().unwrap_or_else(|e| e.into_inner());
        registry.gather()
    }
}

/// Sink writing straight into the registered families.
pub struct PrometheusSink<'a> {
    metrics: &'a HaproxyMetrics,
}

impl<'a> PrometheusSink<'a> {
    pub fn new(metrics: &'a HaproxyMetrics) -> Self {
        Self { metrics }
    }
}

impl MetricSink for PrometheusSink<'_> {
    fn emit(&mut self, _plugin: &str, metric: &EmittedMetric) {
        let labels = [metric.name.as_str()];
        match metric.kind {
            ValueKind::Gauge => self.metrics.gauge.with_label_values(&labels).set(metric.value),
            ValueKind::Counter | ValueKind::Derive => {
                // Counters are freshly reset each cycle; a negative value cannot be represented.
                let Ok(value) = u64::try_from(metric.value) else {
                    trace!("Skipping negative {} value for {}", metric.kind, metric.name);
                    return;
                };
                let family = if metric.kind == ValueKind::Counter {
                    &self.metrics.counter
                } else {
                    &self.metrics.derive
                };
                family.with_label_values(&labels).inc_by(value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metric(name: &str, kind: ValueKind, value: i64) -> EmittedMetric {
        EmittedMetric {
            name: name.into(),
            kind,
            value,
        }
    }

    #[test]
    fn test_publish_routes_by_kind() {
        let registry = Registry::new();
        let metrics = HaproxyMetrics::new(&registry).unwrap();

        metrics.publish(&[
            metric("frontend.web.session_current", ValueKind::Gauge, 5),
            metric("frontend.web.session_total", ValueKind::Counter, 100),
            metric("frontend.web.bytes_in", ValueKind::Derive, 2048),
        ]);

        assert_eq!(
            metrics.gauge.with_label_values(&["frontend.web.session_current"]).get(),
            5
        );
        assert_eq!(
            metrics.counter.with_label_values(&["frontend.web.session_total"]).get(),
            100
        );
        assert_eq!(
            metrics.derive.with_label_values(&["frontend.web.bytes_in"]).get(),
            2048
        );
    }

    #[test]
    fn test_publish_replaces_previous_cycle() {
        let registry = Registry::new();
        let metrics = HaproxyMetrics::new(&registry).unwrap();

        metrics.publish(&[metric("uptime_seconds", ValueKind::Counter, 100)]);
        metrics.publish(&[metric("uptime_seconds", ValueKind::Counter, 160)]);

        assert_eq!(metrics.counter.with_label_values(&["uptime_seconds"]).get(), 160);
    }

    #[test]
    fn test_negative_counter_is_skipped() {
        let registry = Registry::new();
        let metrics = HaproxyMetrics::new(&registry).unwrap();

        metrics.publish(&[metric("backend.app.denied_request", ValueKind::Derive, -1)]);

        let text = prometheus::TextEncoder::new()
            .encode_to_string(&registry.gather())
            .unwrap();
        assert!(!text.contains("denied_request"));
    }

    #[test]
    fn test_gather_never_sees_partial_cycle() {
        let registry = Registry::new();
        let metrics = HaproxyMetrics::new(&registry).unwrap();
        let cycle: Vec<_> = (0..200)
            .map(|i| metric(&format!("backend.app{i}.session_current"), ValueKind::Gauge, i))
            .collect();
        metrics.publish(&cycle);

        let publisher = {
            let metrics = metrics.clone();
            let cycle = cycle.clone();
            std::thread::spawn(move || {
                for _ in 0..200 {
                    metrics.publish(&cycle);
                }
            })
        };

        for _ in 0..200 {
            let text = prometheus::TextEncoder::new()
                .encode_to_string(&metrics.gather(&registry))
                .unwrap();
            let series = text.lines().filter(|l| l.starts_with("haproxy_gauge{")).count();
            assert_eq!(series, cycle.len());
        }
        publisher.join().unwrap();
    }
}
