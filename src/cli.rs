//! CLI arguments and subcommands for haproxy-stats-exporter.
//!
//! This module defines the command-line interface structure using the clap library,
//! including all flags, options, and subcommands.

use clap::{Parser, Subcommand, ValueEnum};
use std::net::IpAddr;
use std::path::PathBuf;

/// Log level options for CLI parsing
#[derive(Debug, Clone, ValueEnum)]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Off => "off",
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

/// Configuration format options for output
#[derive(Debug, Clone, ValueEnum)]
pub enum ConfigFormat {
    Yaml,
    Json,
    Toml,
}

/// Output format for collected metrics
#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
    Yaml,
}

/// Main CLI arguments structure
#[derive(Parser, Debug)]
#[command(
    name = "haproxy-stats-exporter",
    about = "Prometheus exporter for HAProxy control-socket statistics",
    long_about = "Prometheus exporter for HAProxy control-socket statistics.\n\n\
                  Periodically queries the HAProxy admin socket with `show info` and \
                  `show stat`, keeps the monitored frontends, backends and servers, and \
                  exposes their counters as typed gauge, counter and derive metrics.",
    version,
    propagate_version = true
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// HTTP listen port
    #[arg(short = 'p', long)]
    pub port: Option<u16>,

    /// Bind to specific interface/IP
    #[arg(long)]
    pub bind: Option<IpAddr>,

    /// Log level (overrides the config file, default: info)
    #[arg(long, value_enum)]
    pub log_level: Option<LogLevel>,

    /// Config file (YAML/JSON/TOML)
    #[arg(short = 'c', long)]
    pub config: Option<PathBuf>,

    /// Disable all config file loading
    #[arg(long)]
    pub no_config: bool,

    /// Print effective merged config and exit
    #[arg(long)]
    pub show_config: bool,

    /// Output format for --show-config
    #[arg(long, value_enum, default_value = "yaml")]
    pub config_format: ConfigFormat,

    /// Validate config and exit (return code 1 on error)
    #[arg(long)]
    pub check_config: bool,

    /// Path of the HAProxy admin socket
    #[arg(short = 's', long)]
    pub socket: Option<PathBuf>,

    /// Entity class (server, frontend, backend) or proxy/server name to monitor (repeatable)
    #[arg(long = "proxy-monitor", value_name = "NAME")]
    pub proxy_monitor: Vec<String>,

    /// Proxy name to skip, matched case-sensitively (repeatable)
    #[arg(long = "proxy-ignore", value_name = "NAME")]
    pub proxy_ignore: Vec<String>,

    /// Log each collection cycle at info level
    #[arg(long)]
    pub verbose: bool,

    /// Seconds between collection cycles
    #[arg(long)]
    pub interval: Option<u64>,

    /// Socket exchange timeout in milliseconds
    #[arg(long)]
    pub timeout_ms: Option<u64>,

    /// Enable TLS/SSL for HTTPS
    #[arg(long)]
    pub enable_tls: bool,

    /// Path to TLS certificate file (PEM format)
    #[arg(long)]
    pub tls_cert: Option<PathBuf>,

    /// Path to TLS private key file (PEM format)
    #[arg(long)]
    pub tls_key: Option<PathBuf>,
}

/// Subcommands for additional functionality
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Validate configuration and probe the control socket
    Check,

    /// Generate configuration files
    Config {
        /// Output file path ("-" for stdout)
        #[arg(short = 'o', long)]
        output: Option<PathBuf>,

        /// Output format
        #[arg(long, value_enum, default_value = "yaml")]
        format: ConfigFormat,

        /// Include comments and examples
        #[arg(long)]
        commented: bool,
    },

    /// Run collection cycles once and print the emitted metrics
    Collect {
        /// Number of cycles
        #[arg(short = 'n', long, default_value_t = 1)]
        iterations: usize,

        /// Output format
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repeatable_monitor_flags() {
        let args = Args::parse_from([
            "haproxy-stats-exporter",
            "--proxy-monitor",
            "frontend",
            "--proxy-monitor",
            "api",
            "--proxy-ignore",
            "stats",
            "-s",
            "/run/haproxy/admin.sock",
        ]);

        assert_eq!(args.proxy_monitor, vec!["frontend", "api"]);
        assert_eq!(args.proxy_ignore, vec!["stats"]);
        assert_eq!(args.socket, Some(PathBuf::from("/run/haproxy/admin.sock")));
        assert!(args.command.is_none());
    }

    #[test]
    fn test_collect_subcommand() {
        let args = Args::parse_from(["haproxy-stats-exporter", "collect", "-n", "3", "--format", "json"]);

        match args.command {
            Some(Commands::Collect { iterations, format }) => {
                assert_eq!(iterations, 3);
                assert!(matches!(format, OutputFormat::Json));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
