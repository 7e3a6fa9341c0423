//! Metric naming and typing.
//!
//! Raw report fields are first flattened into integer samples keyed by
//! `<svname>.<pxname>.<field>` (or the bare key for `show info` values), then
//! resolved against a static table that maps the raw field name to a canonical
//! short name and a value kind. Fields missing from the table are dropped.

use ahash::AHashMap as HashMap;
use once_cell::sync::Lazy;
use serde::Serialize;
use std::fmt;

use crate::report::{InfoReport, StatRow};

/// Separator between the entity prefix and the field name of a sample key.
pub const METRIC_DELIM: char = '.';

/// Flattened samples of one collection cycle, keyed by sample key.
pub type Samples = HashMap<String, i64>;

/// Accumulation semantics of a metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    /// Point-in-time value.
    Gauge,
    /// Monotonic counter; wraps are possible.
    Counter,
    /// Monotonic counter meant to be turned into a rate.
    Derive,
}

impl ValueKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ValueKind::Gauge => "gauge",
            ValueKind::Counter => "counter",
            ValueKind::Derive => "derive",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw field name, canonical short name and kind.
type MetricTypeEntry = (&'static str, &'static str, ValueKind);

const METRIC_TYPE_ENTRIES: [MetricTypeEntry; 28] = [
    ("bin", "bytes_in", ValueKind::Derive),
    ("bout", "bytes_out", ValueKind::Derive),
    ("chkfail", "failed_checks", ValueKind::Counter),
    ("CurrConns", "connections", ValueKind::Gauge),
    ("downtime", "downtime", ValueKind::Counter),
    ("dresp", "denied_response", ValueKind::Derive),
    ("dreq", "denied_request", ValueKind::Derive),
    ("econ", "error_connection", ValueKind::Derive),
    ("ereq", "error_request", ValueKind::Derive),
    ("eresp", "error_response", ValueKind::Derive),
    ("hrsp_1xx", "response_1xx", ValueKind::Derive),
    ("hrsp_2xx", "response_2xx", ValueKind::Derive),
    ("hrsp_3xx", "response_3xx", ValueKind::Derive),
    ("hrsp_4xx", "response_4xx", ValueKind::Derive),
    ("hrsp_5xx", "response_5xx", ValueKind::Derive),
    ("hrsp_other", "response_other", ValueKind::Derive),
    ("PipesUsed", "pipes_used", ValueKind::Gauge),
    ("PipesFree", "pipes_free", ValueKind::Gauge),
    ("qcur", "queue_current", ValueKind::Gauge),
    ("Tasks", "tasks", ValueKind::Gauge),
    ("Run_queue", "run_queue", ValueKind::Gauge),
    ("rate", "session_rate", ValueKind::Gauge),
    ("req_rate", "request_rate", ValueKind::Gauge),
    ("stot", "session_total", ValueKind::Counter),
    ("scur", "session_current", ValueKind::Gauge),
    ("wredis", "redistributed", ValueKind::Derive),
    ("wretr", "retries", ValueKind::Counter),
    ("Uptime_sec", "uptime_seconds", ValueKind::Counter),
];

/// Raw field name → (canonical short name, kind).
pub static METRIC_TYPES: Lazy<HashMap<&'static str, (&'static str, ValueKind)>> =
    Lazy::new(|| {
        METRIC_TYPE_ENTRIES
            .iter()
            .map(|&(raw, name, kind)| (raw, (name, kind)))
            .collect()
    });

/// A resolved, typed metric ready for emission.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct EmittedMetric {
    pub name: String,
    pub kind: ValueKind,
    pub value: i64,
}

/// Parses a report value as an integer. Blank and non-numeric values yield `None`.
fn parse_int(value: &str) -> Option<i64> {
    value.trim().parse().ok()
}

/// Builds the per-entity sample key `<svname>.<pxname>.<field>` (lower-cased entity).
pub fn composite_key(svname: &str, pxname: &str, field: &str) -> String {
    format!(
        "{}{METRIC_DELIM}{}{METRIC_DELIM}{}",
        svname.to_lowercase(),
        pxname.to_lowercase(),
        field
    )
}

/// Adds every integer-valued `show info` entry under its bare key.
pub fn flatten_info(info: &InfoReport, samples: &mut Samples) {
    for (key, value) in info.iter() {
        if let Some(v) = parse_int(value) {
            samples.insert(key.to_string(), v);
        }
    }
}

/// Adds every integer-valued field of a stats row under its composite key.
pub fn flatten_row(row: &StatRow, samples: &mut Samples) {
    let (svname, pxname) = (row.svname(), row.pxname());
    for (field, value) in row.iter() {
        if let Some(v) = parse_int(value) {
            samples.insert(composite_key(svname, pxname, field), v);
        }
    }
}

/// Splits a sample key into entity prefix and raw field name.
///
/// A key that is itself a table entry has no prefix. Otherwise the key is
/// split at its last delimiter, so a delimiter inside a proxy or server name
/// ends up in the prefix.
pub fn split_key(key: &str) -> (&str, &str) {
    if METRIC_TYPES.contains_key(key) {
        return ("", key);
    }
    key.rsplit_once(METRIC_DELIM).unwrap_or(("", key))
}

/// Resolves a sample to its canonical metric, or `None` if the field is unmapped.
pub fn resolve(key: &str, value: i64) -> Option<EmittedMetric> {
    let (prefix, root) = split_key(key);
    let &(short_name, kind) = METRIC_TYPES.get(root)?;

    let name = if prefix.is_empty() {
        short_name.to_string()
    } else {
        format!("{prefix}{METRIC_DELIM}{short_name}")
    };

    Some(EmittedMetric { name, kind, value })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::{parse_info, parse_stats};

    #[test]
    fn test_metric_table_is_complete() {
        assert_eq!(METRIC_TYPES.len(), METRIC_TYPE_ENTRIES.len());
        assert_eq!(METRIC_TYPES["Uptime_sec"], ("uptime_seconds", ValueKind::Counter));
        assert_eq!(METRIC_TYPES["bin"], ("bytes_in", ValueKind::Derive));
        assert_eq!(METRIC_TYPES["scur"], ("session_current", ValueKind::Gauge));
    }

    #[test]
    fn test_resolve_bare_info_key() {
        let metric = resolve("Uptime_sec", 86400).unwrap();
        assert_eq!(
            metric,
            EmittedMetric {
                name: "uptime_seconds".into(),
                kind: ValueKind::Counter,
                value: 86400,
            }
        );
    }

    #[test]
    fn test_resolve_prefixed_key() {
        let metric = resolve("frontend.web.stot", 100).unwrap();
        assert_eq!(metric.name, "frontend.web.session_total");
        assert_eq!(metric.kind, ValueKind::Counter);
    }

    #[test]
    fn test_resolve_unknown_field_is_dropped() {
        assert!(resolve("frontend.web.pid", 1).is_none());
        assert!(resolve("Nbproc", 4).is_none());
        assert!(resolve("", 0).is_none());
    }

    #[test]
    fn test_split_key_uses_last_delimiter() {
        let key = composite_key("srv.eu-1", "api.v2", "bout");
        assert_eq!(key, "srv.eu-1.api.v2.bout");
        assert_eq!(split_key(&key), ("srv.eu-1.api.v2", "bout"));
    }

    #[test]
    fn test_flatten_info_drops_non_integers() {
        let info = parse_info("Name: HAProxy\nUptime_sec: 10\nIdle_pct: \nTasks: -3\nVersion: 2.8.1\n");
        let mut samples = Samples::new();
        flatten_info(&info, &mut samples);

        assert_eq!(samples.len(), 2);
        assert_eq!(samples["Uptime_sec"], 10);
        assert_eq!(samples["Tasks"], -3);
    }

    #[test]
    fn test_flatten_row_lowercases_entity() {
        let report = parse_stats("# pxname,svname,scur,status,qcur,\nWeb,FRONTEND,5,OPEN,,\n");
        let mut samples = Samples::new();
        flatten_row(&report.rows[0], &mut samples);

        assert_eq!(samples.len(), 1);
        assert_eq!(samples["frontend.web.scur"], 5);
    }

    #[test]
    fn test_value_kind_display() {
        assert_eq!(ValueKind::Derive.to_string(), "derive");
        assert_eq!(ValueKind::Gauge.as_str(), "gauge");
    }
}
