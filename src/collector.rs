//! Collection cycle orchestration.
//!
//! One cycle fetches `show info` and `show stat`, keeps the monitored rows,
//! flattens every integer field into a sample and resolves the samples into
//! typed metrics for a [`MetricSink`]. Nothing is carried over between cycles.

use std::time::Instant;
use tracing::{debug, info, instrument, warn};

use crate::report::HaproxyClient;
use crate::resolver::{flatten_info, flatten_row, resolve, EmittedMetric, Samples};
use crate::settings::CollectorSettings;
use crate::transport::{ControlSocket, StatsSocket};

/// Plugin name reported with every emitted metric.
pub const PLUGIN_NAME: &str = "haproxy";

/// Receiver of the metrics produced by a cycle.
pub trait MetricSink {
    fn emit(&mut self, plugin: &str, metric: &EmittedMetric);
}

impl MetricSink for Vec<EmittedMetric> {
    fn emit(&mut self, _plugin: &str, metric: &EmittedMetric) {
        self.push(metric.clone());
    }
}

/// Runs collection cycles against one control socket.
#[derive(Debug, Clone)]
pub struct Collector<S> {
    client: HaproxyClient<S>,
    settings: CollectorSettings,
}

impl Collector<StatsSocket> {
    /// Collector talking to the Unix socket named in `settings`.
    pub fn from_settings(settings: CollectorSettings) -> Self {
        Self::new(settings.stats_socket(), settings)
    }
}

impl<S: ControlSocket> Collector<S> {
    pub fn new(socket: S, settings: CollectorSettings) -> Self {
        Self {
            client: HaproxyClient::new(socket),
            settings,
        }
    }

    pub fn settings(&self) -> &CollectorSettings {
        &self.settings
    }

    pub fn client(&self) -> &HaproxyClient<S> {
        &self.client
    }

    fn verbose(&self, msg: &str) {
        if self.settings.verbose {
            info!("{}: {}", PLUGIN_NAME, msg);
        } else {
            debug!("{}: {}", PLUGIN_NAME, msg);
        }
    }

    /// Fetches both reports and flattens them into samples.
    ///
    /// An unreachable socket yields an empty result after a warning.
    pub fn collect(&self) -> Samples {
        let mut samples = Samples::new();

        let reports = self
            .client
            .get_server_info()
            .and_then(|info| Ok((info, self.client.get_server_stats()?)));
        let (info, stats) = match reports {
            Ok(reports) => reports,
            Err(e) => {
                warn!(
                    "{}: status err Unable to connect to HAProxy socket at {}: {}",
                    PLUGIN_NAME,
                    self.settings.socket.display(),
                    e
                );
                return samples;
            }
        };

        let filter = &self.settings.filter;
        if filter.monitors_server() {
            flatten_info(&info, &mut samples);
        }

        let mut kept = 0usize;
        for row in stats.rows.iter().filter(|row| filter.should_keep(row)) {
            flatten_row(row, &mut samples);
            kept += 1;
        }

        debug!(
            "Kept {}/{} stat rows ({} rejected), {} samples",
            kept,
            stats.rows.len(),
            stats.rejected.len(),
            samples.len()
        );

        samples
    }

    /// Resolves the samples of one cycle into typed metrics.
    pub fn collect_metrics(&self) -> Vec<EmittedMetric> {
        self.collect()
            .iter()
            .filter_map(|(key, value)| resolve(key, *value))
            .collect()
    }

    /// Runs one cycle and hands every resolved metric to `sink`.
    ///
    /// Returns the number of metrics emitted.
    #[instrument(skip_all)]
    pub fn run_cycle(&self, sink: &mut dyn MetricSink) -> usize {
        let start = Instant::now();
        self.verbose("beginning read_callback");

        let samples = self.collect();
        if samples.is_empty() {
            warn!("{}: No data received", PLUGIN_NAME);
            return 0;
        }

        let mut emitted = 0usize;
        for (key, value) in &samples {
            if let Some(metric) = resolve(key, *value) {
                sink.emit(PLUGIN_NAME, &metric);
                emitted += 1;
            }
        }

        self.verbose(&format!(
            "emitted {} of {} samples in {:.2}ms",
            emitted,
            samples.len(),
            start.elapsed().as_secs_f64() * 1000.0
        ));

        emitted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::UnavailableError;
    use crate::resolver::ValueKind;
    use std::path::PathBuf;

    struct CannedSocket {
        info: &'static str,
        stat: &'static str,
    }

    impl ControlSocket for CannedSocket {
        fn communicate(&self, command: &str) -> Result<String, UnavailableError> {
            match command {
                "show info" => Ok(self.info.to_string()),
                "show stat" => Ok(self.stat.to_string()),
                other => panic!("unexpected command {other}"),
            }
        }
    }

    struct DeadSocket;

    impl ControlSocket for DeadSocket {
        fn communicate(&self, _command: &str) -> Result<String, UnavailableError> {
            Err(UnavailableError::Connect {
                path: PathBuf::from("/nonexistent"),
                source: std::io::Error::from(std::io::ErrorKind::ConnectionRefused),
            })
        }
    }

    fn collector(info: &'static str, stat: &'static str) -> Collector<CannedSocket> {
        Collector::new(CannedSocket { info, stat }, CollectorSettings::default())
    }

    #[test]
    fn test_collect_merges_info_and_stats() {
        let c = collector(
            "Uptime_sec: 86400\nName: HAProxy\n",
            "# pxname,svname,scur,stot,\nweb,FRONTEND,5,100,\n",
        );
        let samples = c.collect();

        assert_eq!(samples.len(), 3);
        assert_eq!(samples["Uptime_sec"], 86400);
        assert_eq!(samples["frontend.web.scur"], 5);
        assert_eq!(samples["frontend.web.stot"], 100);
    }

    #[test]
    fn test_info_skipped_without_server_class() {
        let settings = CollectorSettings {
            filter: crate::filter::MonitorFilter::new(["frontend"], Vec::<String>::new()),
            ..Default::default()
        };
        let c = Collector::new(
            CannedSocket {
                info: "Uptime_sec: 1\n",
                stat: "# pxname,svname,scur,\nweb,FRONTEND,5,\n",
            },
            settings,
        );

        let samples = c.collect();
        assert_eq!(samples.len(), 1);
        assert!(samples.contains_key("frontend.web.scur"));
    }

    #[test]
    fn test_unavailable_socket_yields_nothing() {
        let c = Collector::new(DeadSocket, CollectorSettings::default());
        let mut sink: Vec<EmittedMetric> = Vec::new();

        assert!(c.collect().is_empty());
        assert_eq!(c.run_cycle(&mut sink), 0);
        assert!(sink.is_empty());
    }

    #[test]
    fn test_run_cycle_emits_resolved_metrics_only() {
        let c = collector(
            "Uptime_sec: 10\nNbproc: 1\n",
            "# pxname,svname,scur,pid,\nweb,FRONTEND,5,1,\n",
        );
        let mut sink: Vec<EmittedMetric> = Vec::new();

        assert_eq!(c.run_cycle(&mut sink), 2);
        sink.sort_by(|a, b| a.name.cmp(&b.name));
        assert_eq!(sink[0].name, "frontend.web.session_current");
        assert_eq!(sink[0].kind, ValueKind::Gauge);
        assert_eq!(sink[1].name, "uptime_seconds");
    }
}
