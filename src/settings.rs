//! Collector settings and host option handling.
//!
//! The host hands over its configuration as a flat list of key/value options
//! (`ProxyMonitor`, `ProxyIgnore`, `Socket`, `Verbose`, `Timeout`). They are
//! folded into a read-only [`CollectorSettings`] once at startup.

use std::path::PathBuf;
use std::time::Duration;
use tracing::warn;

use crate::filter::{MonitorFilter, DEFAULT_PROXY_MONITORS};
use crate::transport::{StatsSocket, DEFAULT_SOCKET, DEFAULT_TIMEOUT};

/// One host configuration entry: a key and its values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigOption {
    pub key: String,
    pub values: Vec<String>,
}

impl ConfigOption {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            values: vec![value.into()],
        }
    }
}

/// A host option that could not be applied. None of these are fatal.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SettingsError {
    #[error("Unknown config key: {0}")]
    UnknownKey(String),

    #[error("Config key {0} has no value")]
    MissingValue(String),

    #[error("Invalid value {value:?} for config key {key}")]
    InvalidValue { key: String, value: String },
}

/// Read-only settings shared by every collection cycle.
#[derive(Debug, Clone)]
pub struct CollectorSettings {
    pub socket: PathBuf,
    pub filter: MonitorFilter,
    pub verbose: bool,
    pub timeout: Duration,
}

impl Default for CollectorSettings {
    fn default() -> Self {
        Self {
            socket: PathBuf::from(DEFAULT_SOCKET),
            filter: MonitorFilter::default(),
            verbose: false,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl CollectorSettings {
    /// Applies host options, logging a warning for each one that is rejected.
    pub fn from_options<I>(options: I) -> Self
    where
        I: IntoIterator<Item = ConfigOption>,
    {
        let (settings, errors) = Self::try_from_options(options);
        for err in errors {
            warn!("{}", err);
        }
        settings
    }

    /// Applies host options and returns the rejected ones alongside the settings.
    ///
    /// `ProxyMonitor` and `ProxyIgnore` may repeat. Without any `ProxyMonitor`
    /// the default classes (server, frontend, backend) are monitored.
    pub fn try_from_options<I>(options: I) -> (Self, Vec<SettingsError>)
    where
        I: IntoIterator<Item = ConfigOption>,
    {
        let mut pending = PendingSettings::default();
        let errors = options
            .into_iter()
            .filter_map(|opt| pending.apply(&opt).err())
            .collect();
        (pending.finish(), errors)
    }

    /// Socket transport configured with these settings.
    pub fn stats_socket(&self) -> StatsSocket {
        StatsSocket::new(&self.socket).with_timeout(self.timeout)
    }
}

#[derive(Default)]
struct PendingSettings {
    monitors: Vec<String>,
    ignore: Vec<String>,
    socket: Option<PathBuf>,
    verbose: bool,
    timeout: Option<Duration>,
}

impl PendingSettings {
    fn apply(&mut self, opt: &ConfigOption) -> Result<(), SettingsError> {
        let value = || {
            opt.values
                .first()
                .cloned()
                .ok_or_else(|| SettingsError::MissingValue(opt.key.clone()))
        };
        let invalid = |value: String| SettingsError::InvalidValue {
            key: opt.key.clone(),
            value,
        };

        match opt.key.as_str() {
            "ProxyMonitor" => self.monitors.push(value()?),
            "ProxyIgnore" => self.ignore.push(value()?),
            "Socket" => self.socket = Some(PathBuf::from(value()?)),
            "Verbose" => {
                let raw = value()?;
                self.verbose = parse_bool(&raw).ok_or_else(|| invalid(raw))?;
            }
            "Timeout" => {
                let raw = value()?;
                let ms = raw
                    .trim()
                    .parse::<u64>()
                    .ok()
                    .filter(|ms| *ms > 0)
                    .ok_or_else(|| invalid(raw))?;
                self.timeout = Some(Duration::from_millis(ms));
            }
            other => return Err(SettingsError::UnknownKey(other.to_string())),
        }
        Ok(())
    }

    fn finish(self) -> CollectorSettings {
        let filter = if self.monitors.is_empty() {
            MonitorFilter::new(DEFAULT_PROXY_MONITORS, self.ignore)
        } else {
            MonitorFilter::new(self.monitors, self.ignore)
        };

        CollectorSettings {
            socket: self.socket.unwrap_or_else(|| PathBuf::from(DEFAULT_SOCKET)),
            filter,
            verbose: self.verbose,
            timeout: self.timeout.unwrap_or(DEFAULT_TIMEOUT),
        }
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Some(true),
        "false" | "no" | "off" | "0" => Some(false),
        _ => None,
    }
}
