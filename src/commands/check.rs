//! Check command implementation.
//!
//! Validates the configuration and probes the HAProxy control socket.

use haproxy_stats_exporter::HaproxyClient;

use crate::config::{validate_effective_config, Config};

/// Validates configuration and checks that HAProxy answers `show info`.
pub fn command_check(config: &Config) -> anyhow::Result<()> {
    println!("🔍 HAProxy Stats Exporter - System Check");
    println!("=========================================");

    let mut all_ok = true;

    println!("\n⚙️  Checking configuration...");
    match validate_effective_config(config) {
        Ok(()) => println!("   ✅ Configuration is valid"),
        Err(e) => {
            println!("   ❌ Configuration invalid: {}", e);
            all_ok = false;
        }
    }

    let settings = config.collector_settings();
    let mut monitors: Vec<_> = settings.filter.monitors().iter().cloned().collect();
    monitors.sort();
    println!("   ├─ Monitors: {}", monitors.join(", "));
    if !settings.filter.ignore().is_empty() {
        let mut ignore: Vec<_> = settings.filter.ignore().iter().cloned().collect();
        ignore.sort();
        println!("   ├─ Ignored proxies: {}", ignore.join(", "));
    }
    println!("   └─ Timeout: {:?}", settings.timeout);

    println!("\n🔌 Checking control socket {}...", settings.socket.display());
    if !settings.socket.exists() {
        println!("   ❌ Socket path does not exist");
        all_ok = false;
    } else {
        let client = HaproxyClient::new(settings.stats_socket());
        match client.get_server_info() {
            Ok(info) if info.is_empty() => {
                println!("   ❌ HAProxy returned no `show info` fields");
                all_ok = false;
            }
            Ok(info) => {
                println!("   ✅ HAProxy answered `show info` ({} fields)", info.len());
                for key in ["Name", "Version", "Uptime_sec"] {
                    if let Some(value) = info.get(key) {
                        println!("      ├─ {}: {}", key, value);
                    }
                }
            }
            Err(e) => {
                println!("   ❌ {}", e);
                all_ok = false;
            }
        }
    }

    if all_ok {
        println!("\n✅ All checks passed");
        Ok(())
    } else {
        anyhow::bail!("one or more checks failed")
    }
}
