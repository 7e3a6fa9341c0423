//! Configuration management for haproxy-stats-exporter.
//!
//! This module handles loading, merging, and validating configuration from files
//! and CLI arguments. It supports YAML, JSON, and TOML formats. The collector
//! part of the configuration is handed to the library as host options so that
//! unknown keys are reported the same way regardless of where they came from.

use anyhow::{bail, Context};
use haproxy_stats_exporter::transport::{DEFAULT_SOCKET, DEFAULT_TIMEOUT};
use haproxy_stats_exporter::{CollectorSettings, ConfigOption};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::cli::{Args, ConfigFormat};

// Default configuration constants
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 9101;
pub const DEFAULT_INTERVAL_SECONDS: u64 = 10;

const LOG_LEVELS: [&str; 6] = ["off", "error", "warn", "info", "debug", "trace"];

/// Exporter configuration as read from a config file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    // Server configuration
    pub port: Option<u16>,
    pub bind: Option<String>,

    // Logging
    #[serde(alias = "log-level")]
    pub log_level: Option<String>,

    // Collection schedule
    #[serde(alias = "interval-seconds", alias = "Interval")]
    pub interval_seconds: Option<u64>,
    #[serde(alias = "timeout-ms")]
    pub timeout_ms: Option<u64>,

    // Collector options
    #[serde(alias = "Socket")]
    pub socket: Option<PathBuf>,
    /// Entity classes or proxy/server names to monitor (empty = server, frontend, backend)
    #[serde(default, alias = "ProxyMonitor", alias = "proxy-monitor")]
    pub proxy_monitor: Vec<String>,
    /// Proxy names to skip (exact case)
    #[serde(default, alias = "ProxyIgnore", alias = "proxy-ignore")]
    pub proxy_ignore: Vec<String>,
    #[serde(alias = "Verbose")]
    pub verbose: Option<bool>,

    // Feature flags
    #[serde(alias = "enable-health")]
    pub enable_health: Option<bool>,

    // TLS/SSL Configuration
    #[serde(alias = "enable-tls")]
    pub enable_tls: Option<bool>,
    #[serde(alias = "tls-cert-path")]
    pub tls_cert_path: Option<String>,
    #[serde(alias = "tls-key-path")]
    pub tls_key_path: Option<String>,

    /// Keys this exporter does not know; reported as warnings at startup.
    #[serde(flatten)]
    pub unknown: BTreeMap<String, serde_json::Value>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: Some(DEFAULT_PORT),
            bind: Some(DEFAULT_BIND_ADDR.to_string()),
            log_level: Some("info".into()),
            interval_seconds: Some(DEFAULT_INTERVAL_SECONDS),
            timeout_ms: Some(DEFAULT_TIMEOUT.as_millis() as u64),
            socket: Some(PathBuf::from(DEFAULT_SOCKET)),
            proxy_monitor: Vec::new(),
            proxy_ignore: Vec::new(),
            verbose: Some(false),
            enable_health: Some(true),
            enable_tls: Some(false),
            tls_cert_path: None,
            tls_key_path: None,
            unknown: BTreeMap::new(),
        }
    }
}

impl Config {
    /// Host options for the collector, in file order: known keys first, then
    /// unrecognized ones so they get reported.
    pub fn collector_options(&self) -> Vec<ConfigOption> {
        let mut options = Vec::new();

        for monitor in &self.proxy_monitor {
            options.push(ConfigOption::new("ProxyMonitor", monitor.as_str()));
        }
        for ignore in &self.proxy_ignore {
            options.push(ConfigOption::new("ProxyIgnore", ignore.as_str()));
        }
        if let Some(socket) = &self.socket {
            options.push(ConfigOption::new("Socket", socket.to_string_lossy()));
        }
        if let Some(verbose) = self.verbose {
            options.push(ConfigOption::new("Verbose", verbose.to_string()));
        }
        if let Some(timeout_ms) = self.timeout_ms {
            options.push(ConfigOption::new("Timeout", timeout_ms.to_string()));
        }

        for (key, value) in &self.unknown {
            let value = match value {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            options.push(ConfigOption::new(key.as_str(), value));
        }

        options
    }

    /// Read-only collector settings derived from this configuration.
    pub fn collector_settings(&self) -> CollectorSettings {
        CollectorSettings::from_options(self.collector_options())
    }

    pub fn interval_seconds(&self) -> u64 {
        self.interval_seconds.unwrap_or(DEFAULT_INTERVAL_SECONDS)
    }

    pub fn verbose(&self) -> bool {
        self.verbose.unwrap_or(false)
    }
}

/// Validate effective config (used by --check-config and at startup)
pub fn validate_effective_config(cfg: &Config) -> anyhow::Result<()> {
    let interval = cfg.interval_seconds();
    if interval == 0 {
        bail!("interval_seconds must be greater than 0");
    }

    if let Some(timeout_ms) = cfg.timeout_ms {
        if timeout_ms == 0 {
            bail!("timeout_ms must be greater than 0");
        }
        if timeout_ms >= interval.saturating_mul(1000) {
            bail!(
                "timeout_ms ({}) must be shorter than the collection interval ({}s)",
                timeout_ms,
                interval
            );
        }
    }

    if let Some(level) = cfg.log_level.as_deref() {
        if !LOG_LEVELS.contains(&level) {
            bail!(
                "Invalid log_level '{}', expected one of: {}",
                level,
                LOG_LEVELS.join(", ")
            );
        }
    }

    if cfg.socket.as_ref().is_some_and(|s| s.as_os_str().is_empty()) {
        bail!("socket path must not be empty");
    }

    // TLS validation
    if cfg.enable_tls.unwrap_or(false) {
        match (cfg.tls_cert_path.as_deref(), cfg.tls_key_path.as_deref()) {
            (None, None) => {
                bail!("TLS is enabled but neither tls_cert_path nor tls_key_path are set")
            }
            (Some(_), None) => bail!("TLS is enabled but tls_key_path is not set"),
            (None, Some(_)) => bail!("TLS is enabled but tls_cert_path is not set"),
            (Some(cert), Some(key)) => {
                for (what, path) in [("certificate", cert), ("private key", key)] {
                    let meta = fs::metadata(path)
                        .with_context(|| format!("TLS {} file is not readable: {}", what, path))?;
                    if meta.len() == 0 {
                        bail!("TLS {} file is empty: {}", what, path);
                    }
                }
            }
        }
    }

    Ok(())
}

/// Resolves configuration from CLI args, config file, and defaults.
/// This enforces precedence: CLI (if provided) > config file > default.
pub fn resolve_config(args: &Args) -> anyhow::Result<Config> {
    let mut config = if args.no_config {
        Config::default()
    } else {
        load_config(args.config.as_deref())?
    };

    // Override with CLI args
    if let Some(bind_ip) = args.bind {
        config.bind = Some(bind_ip.to_string());
    }
    if let Some(cli_port) = args.port {
        config.port = Some(cli_port);
    }
    if let Some(level) = &args.log_level {
        config.log_level = Some(level.as_str().to_string());
    }

    // Collector options: CLI lists replace file lists when given
    if let Some(socket) = &args.socket {
        config.socket = Some(socket.clone());
    }
    if !args.proxy_monitor.is_empty() {
        config.proxy_monitor = args.proxy_monitor.clone();
    }
    if !args.proxy_ignore.is_empty() {
        config.proxy_ignore = args.proxy_ignore.clone();
    }
    if args.verbose {
        config.verbose = Some(true);
    }
    if let Some(interval) = args.interval {
        config.interval_seconds = Some(interval);
    }
    if let Some(timeout_ms) = args.timeout_ms {
        config.timeout_ms = Some(timeout_ms);
    }

    // TLS configuration: CLI wins if provided
    if args.enable_tls {
        config.enable_tls = Some(true);
    }
    if let Some(cert_path) = &args.tls_cert {
        config.tls_cert_path = Some(cert_path.to_string_lossy().to_string());
    }
    if let Some(key_path) = &args.tls_key {
        config.tls_key_path = Some(key_path.to_string_lossy().to_string());
    }

    Ok(config)
}

/// Configuration loading with multiple format support.
///
/// Without an explicit path the default locations are tried in order; if none
/// exists the built-in defaults are used.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => {
            let defaults = [
                "/etc/haproxy-stats-exporter/config.yaml",
                "/etc/haproxy-stats-exporter/config.yml",
                "/etc/haproxy-stats-exporter/config.json",
                "./haproxy-stats-exporter.yaml",
                "./haproxy-stats-exporter.yml",
                "./haproxy-stats-exporter.json",
            ];

            match defaults.iter().find(|p| Path::new(p).exists()) {
                Some(p) => PathBuf::from(p),
                None => return Ok(Config::default()),
            }
        }
    };

    let content = fs::read_to_string(&path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;

    let config = parse_config(&content, &path)?;
    info!("Loaded configuration from: {}", path.display());
    Ok(config)
}

/// Parses config text, choosing the format from the file extension (YAML by default).
fn parse_config(content: &str, path: &Path) -> anyhow::Result<Config> {
    let config = match path.extension().and_then(|s| s.to_str()) {
        Some("json") => serde_json::from_str(content)
            .with_context(|| format!("Invalid JSON in {}", path.display()))?,
        Some("toml") => {
            toml::from_str(content).with_context(|| format!("Invalid TOML in {}", path.display()))?
        }
        _ => serde_yaml::from_str(content)
            .with_context(|| format!("Invalid YAML in {}", path.display()))?,
    };
    Ok(config)
}

/// Renders configuration in the requested format.
pub fn render_config(config: &Config, format: &ConfigFormat) -> anyhow::Result<String> {
    let output = match format {
        ConfigFormat::Json => serde_json::to_string_pretty(config)?,
        ConfigFormat::Toml => toml::to_string_pretty(config)?,
        ConfigFormat::Yaml => serde_yaml::to_string(config)?,
    };
    Ok(output)
}

/// Shows configuration in requested format
pub fn show_config(config: &Config, format: ConfigFormat) -> anyhow::Result<()> {
    println!("{}", render_config(config, &format)?);
    Ok(())
}
