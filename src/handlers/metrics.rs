//! Metrics endpoint handler for Prometheus scraping.
//!
//! Serves whatever the last collection cycle published. Scrapes never talk to
//! the HAProxy socket themselves.

use axum::{extract::State, http::StatusCode, response::IntoResponse};
use prometheus::{Encoder, TextEncoder};
use std::time::Instant;
use tracing::{debug, error, instrument};

use crate::state::SharedState;

/// Buffer capacity for metrics encoding.
const BUFFER_CAP: usize = 64 * 1024;

/// Error type for metrics endpoint failures.
#[derive(Debug)]
pub enum MetricsError {
    EncodingFailed,
}

impl IntoResponse for MetricsError {
    fn into_response(self) -> axum::response::Response {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to encode metrics",
        )
            .into_response()
    }
}

/// Handler for the /metrics endpoint.
#[instrument(skip(state))]
pub async fn metrics_handler(State(state): State<SharedState>) -> Result<String, MetricsError> {
    let start = Instant::now();
    debug!("Processing /metrics request");

    // The exposed scrape duration is that of the previous request.
    let families = state.metrics.gather(&state.registry);

    let mut buffer = Vec::with_capacity(BUFFER_CAP);
    let encoder = TextEncoder::new();

    if encoder.encode(&families, &mut buffer).is_err() {
        error!("Failed to encode Prometheus metrics");
        return Err(MetricsError::EncodingFailed);
    }

    state
        .metrics
        .scrape_duration_seconds
        .set(start.elapsed().as_secs_f64());

    debug!(
        "Metrics request completed: {} families, {} bytes",
        families.len(),
        buffer.len()
    );

    String::from_utf8(buffer).map_err(|_| MetricsError::EncodingFailed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::state::AppState;
    use haproxy_stats_exporter::{EmittedMetric, ValueKind};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_metrics_handler_exposes_published_values() {
        let state = Arc::new(AppState::new(Config::default()).unwrap());
        state.metrics.publish(&[EmittedMetric {
            name: "backend.app.bytes_out".into(),
            kind: ValueKind::Derive,
            value: 4096,
        }]);

        let body = metrics_handler(State(state)).await.unwrap();

        assert!(body.contains("haproxy_derive{metric=\"backend.app.bytes_out\"} 4096"));
        assert!(body.contains("haproxy_exporter_collect_success"));
    }
}
