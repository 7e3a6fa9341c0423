//! Collect command implementation.
//!
//! Runs collection cycles in the foreground and prints what would be exported.

use haproxy_stats_exporter::{Collector, EmittedMetric};
use std::time::{Duration, Instant};

use crate::cli::OutputFormat;
use crate::config::Config;

/// Runs `iterations` cycles, waiting one interval between them.
pub fn command_collect(
    iterations: usize,
    format: OutputFormat,
    config: &Config,
) -> anyhow::Result<()> {
    let collector = Collector::from_settings(config.collector_settings());
    let interval = Duration::from_secs(config.interval_seconds());

    for iteration in 1..=iterations {
        if iteration > 1 {
            std::thread::sleep(interval);
        }

        let start = Instant::now();
        let mut metrics: Vec<EmittedMetric> = Vec::new();
        collector.run_cycle(&mut metrics);
        metrics.sort_by(|a, b| a.name.cmp(&b.name));

        match format {
            OutputFormat::Text => {
                println!(
                    "\n🔄 Cycle {}/{}: {} metrics in {:.1} ms",
                    iteration,
                    iterations,
                    metrics.len(),
                    start.elapsed().as_secs_f64() * 1000.0
                );
                print!("{}", render_text(&metrics));
            }
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&metrics)?),
            OutputFormat::Yaml => print!("{}", serde_yaml::to_string(&metrics)?),
        }
    }

    Ok(())
}

/// One `name kind value` line per metric, names padded to a common width.
fn render_text(metrics: &[EmittedMetric]) -> String {
    let width = metrics.iter().map(|m| m.name.len()).max().unwrap_or(0);
    metrics
        .iter()
        .map(|m| format!("   {:width$}  {:7}  {}\n", m.name, m.kind.as_str(), m.value))
        .collect()
}
