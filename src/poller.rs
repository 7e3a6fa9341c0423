//! Background collection loop.
//!
//! Runs one collector cycle per interval tick on the blocking pool, publishes
//! the result to the Prometheus families and replaces the last-cycle snapshot.
//! Ticks are awaited sequentially, so cycles never overlap.

use haproxy_stats_exporter::EmittedMetric;
use std::time::{Duration, Instant};
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, error, info, instrument, warn};

use crate::state::SharedState;

/// Runs a single collection cycle and updates shared state.
///
/// Returns the number of metrics emitted.
#[instrument(skip(state))]
pub async fn update_cache(state: &SharedState) -> anyhow::Result<usize> {
    {
        let mut cache = state.cache.write().await;
        cache.is_updating = true;
    }

    let start = Instant::now();
    let collector = state.collector.clone();
    let result = tokio::task::spawn_blocking(move || {
        let mut metrics: Vec<EmittedMetric> = Vec::new();
        collector.run_cycle(&mut metrics);
        metrics
    })
    .await;

    let metrics = match result {
        Ok(metrics) => metrics,
        Err(e) => {
            state.cache.write().await.is_updating = false;
            state.metrics.collect_success.set(0);
            return Err(anyhow::anyhow!("collection task failed: {}", e));
        }
    };

    let duration = start.elapsed().as_secs_f64();
    let emitted = metrics.len();

    state.metrics.publish(&metrics);
    state.metrics.collect_duration_seconds.set(duration);
    state.metrics.metrics_emitted.set(emitted as i64);
    state.metrics.collect_success.set(i64::from(emitted > 0));

    state.cache.write().await.record_cycle(metrics, duration);

    debug!("Collection cycle finished: {} metrics in {:.3}s", emitted, duration);
    Ok(emitted)
}

/// Polls HAProxy every `interval` until the task is dropped.
pub async fn run(state: SharedState, interval: Duration) {
    info!("Starting collection loop every {:?}", interval);

    let mut ticker = time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        match update_cache(&state).await {
            Ok(0) => warn!("Collection cycle emitted no metrics"),
            Ok(_) => {}
            Err(e) => error!("Collection cycle failed: {}", e),
        }
    }
}
