//! Config command implementation.
//!
//! Generates configuration files in various formats.

use std::fs;
use std::path::PathBuf;

use crate::cli::ConfigFormat;
use crate::config::{render_config, Config};

/// Generates configuration files.
pub fn command_config(
    output: Option<PathBuf>,
    format: ConfigFormat,
    commented: bool,
) -> anyhow::Result<()> {
    let config = Config::default();
    let output = match output {
        Some(path) => path,
        None => PathBuf::from("haproxy-stats-exporter.yaml"),
    };

    let mut content = render_config(&config, &format)?;
    if commented && matches!(format, ConfigFormat::Yaml) {
        content = add_config_comments(content);
    }

    if output.to_string_lossy() == "-" {
        print!("{}", content);
    } else {
        fs::write(&output, content)?;
        println!("✅ Configuration written to: {}", output.display());
    }

    Ok(())
}

/// Adds comments to YAML configuration.
fn add_config_comments(yaml: String) -> String {
    let comments = r#"# HAProxy Stats Exporter Configuration
# =====================================
#
# Server Configuration
# --------------------
# bind: "0.0.0.0"              # Bind IP (0.0.0.0 = all interfaces)
# port: 9101                   # HTTP port
#
# Collection
# ----------
# interval_seconds: 10         # Seconds between collection cycles
# timeout_ms: 5000             # Bound on one socket exchange, must be below the interval
#
# HAProxy
# -------
# socket: /var/lib/haproxy/stats   # Admin socket (stats socket ... level admin)
# proxy_monitor:                   # Classes (server, frontend, backend) or proxy/server names
#   - frontend                     # Empty list = server, frontend, backend
#   - backend
# proxy_ignore:                    # Proxy names to skip, case-sensitive
#   - stats
# verbose: false                   # Log each cycle at info level
#
# The keys Socket, ProxyMonitor, ProxyIgnore and Verbose are accepted as well.
#
# Feature Flags
# -------------
# enable_health: true          # Enable /health endpoint
#
# Logging
# -------
# log_level: "info"            # off, error, warn, info, debug, trace
#
# TLS/SSL Configuration
# ---------------------
# enable_tls: false            # Enable HTTPS (default: false)
# tls_cert_path: null          # Path to TLS certificate (PEM format)
# tls_key_path: null           # Path to TLS private key (PEM format)
"#;

    format!("{comments}\n{yaml}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_commented_config_is_still_valid_yaml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("exporter.yaml");

        command_config(Some(path.clone()), ConfigFormat::Yaml, true).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("# HAProxy Stats Exporter Configuration"));
        let parsed: Config = serde_yaml::from_str(&content).unwrap();
        assert_eq!(parsed.interval_seconds, Some(10));
        assert!(parsed.unknown.is_empty());
    }
}
