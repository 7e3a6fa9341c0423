//! HAProxy Stats Collector Library
//!
//! This library talks to the HAProxy admin control socket, parses the
//! `show info` and `show stat` reports and turns their numeric fields into
//! typed, namespaced metrics. It is host-agnostic: the caller decides how often
//! to run a cycle and where the metrics go by implementing [`MetricSink`].
//!
//! # Features
//!
//! - **Socket Transport**: one short-lived Unix socket exchange per command, bounded by a timeout
//! - **Report Parsing**: flat key/value info report and CSV stats table as distinct types
//! - **Entity Filtering**: monitored classes/names and an ignore list of proxies
//! - **Metric Resolution**: static table mapping raw fields to canonical names and kinds
//!
//! # Usage
//!
//! ```no_run
//! use haproxy_stats_exporter::{Collector, CollectorSettings, ConfigOption, EmittedMetric};
//!
//! let settings = CollectorSettings::from_options(vec![
//!     ConfigOption::new("Socket", "/run/haproxy/admin.sock"),
//!     ConfigOption::new("ProxyIgnore", "stats"),
//! ]);
//! let collector = Collector::from_settings(settings);
//!
//! let mut metrics: Vec<EmittedMetric> = Vec::new();
//! collector.run_cycle(&mut metrics);
//!
//! for metric in &metrics {
//!     println!("{} ({}) = {}", metric.name, metric.kind, metric.value);
//! }
//! ```

pub mod collector;
pub mod error;
pub mod filter;
pub mod report;
pub mod resolver;
pub mod settings;
pub mod transport;

// Re-export main types for convenience
pub use collector::{Collector, MetricSink, PLUGIN_NAME};
pub use error::{ParseError, UnavailableError};
pub use filter::MonitorFilter;
pub use report::{HaproxyClient, InfoReport, StatRow, StatsReport};
pub use resolver::{EmittedMetric, Samples, ValueKind};
pub use settings::{CollectorSettings, ConfigOption, SettingsError};
pub use transport::{ControlSocket, StatsSocket};
