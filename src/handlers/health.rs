//! Health check endpoint handler.
//!
//! Reports whether the last collection cycle produced any metrics.

use axum::{extract::State, http::StatusCode, response::IntoResponse};
use std::fmt::Write as FmtWrite;
use tracing::{debug, instrument};

use crate::state::SharedState;

/// Footer text for human-readable HTTP endpoints.
pub const FOOTER_TEXT: &str = "haproxy-stats-exporter: HAProxy control-socket statistics for Prometheus";

/// Handler for the /health endpoint.
#[instrument(skip(state))]
pub async fn health_handler(State(state): State<SharedState>) -> impl IntoResponse {
    debug!("Processing /health request");

    let cache = state.cache.read().await;

    let status = if cache.update_success && cache.last_updated.is_some() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let message = if cache.is_updating && cache.last_updated.is_none() {
        "First collection cycle in progress"
    } else if cache.last_updated.is_none() {
        "Waiting for first collection cycle"
    } else if cache.update_success {
        "OK"
    } else {
        "No data received from HAProxy"
    };

    let mut body = String::new();
    writeln!(body, "{message}").ok();
    writeln!(body).ok();
    writeln!(body, "{:25} {}", "Socket", state.collector.settings().socket.display()).ok();
    writeln!(
        body,
        "{:25} {}",
        "Last cycle",
        cache
            .last_updated_at
            .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
            .unwrap_or_else(|| "never".into())
    )
    .ok();
    writeln!(body, "{:25} {:.3}s", "Cycle duration", cache.update_duration_seconds).ok();
    writeln!(body, "{:25} {}", "Metrics emitted", cache.metrics.len()).ok();
    writeln!(body, "{:25} {}", "Cycles", cache.cycles_total).ok();
    writeln!(body, "{:25} {}", "Empty cycles", cache.empty_cycles_total).ok();
    writeln!(body, "{:25} {}s", "Uptime", state.start_time.elapsed().as_secs()).ok();
    writeln!(body).ok();
    write!(body, "{FOOTER_TEXT}").ok();

    debug!("Health check: {} - {}", status, message);
    (
        status,
        [("Content-Type", "text/plain; charset=utf-8")],
        body,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::state::AppState;
    use haproxy_stats_exporter::{EmittedMetric, ValueKind};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_health_reflects_last_cycle() {
        let state = Arc::new(AppState::new(Config::default()).unwrap());

        let response = health_handler(State(state.clone())).await.into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        state.cache.write().await.record_cycle(
            vec![EmittedMetric {
                name: "connections".into(),
                kind: ValueKind::Gauge,
                value: 3,
            }],
            0.005,
        );

        let response = health_handler(State(state)).await.into_response();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
