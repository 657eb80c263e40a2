//! Health check endpoint.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use serde::Serialize;

use crate::IndexerState;
use crate::error::Result;

#[derive(Serialize)]
pub struct ProjectionHealth {
    pub name: &'static str,
    pub slot: Option<u64>,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub projections: Vec<ProjectionHealth>,
}

/// GET /health — returns status and the slot each projection has reached.
pub async fn check(State(state): State<Arc<IndexerState>>) -> Result<Json<HealthResponse>> {
    let projections = state
        .processor
        .positions()
        .await?
        .into_iter()
        .map(|(name, slot)| ProjectionHealth {
            name,
            slot: slot.map(|s| s.as_u64()),
        })
        .collect();

    Ok(Json(HealthResponse {
        status: "ok",
        projections,
    }))
}
