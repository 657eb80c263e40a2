//! Prometheus metrics endpoint.

use std::sync::Arc;

use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::IntoResponse;
use metrics_exporter_prometheus::PrometheusHandle;

use crate::IndexerState;
use crate::error::Result;

/// State behind `/metrics`: the recorder handle plus the projections whose
/// positions are exported as gauges.
#[derive(Clone)]
pub struct MetricsState {
    pub handle: PrometheusHandle,
    pub indexer: Arc<IndexerState>,
}

/// GET /metrics — refreshes `projection_slot` and renders every metric.
pub async fn get(State(state): State<MetricsState>) -> Result<impl IntoResponse> {
    for (name, slot) in state.indexer.processor.positions().await? {
        if let Some(slot) = slot {
            metrics::gauge!("projection_slot", "projection" => name).set(slot.as_u64() as f64);
        }
    }

    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
        state.handle.render(),
    ))
}
