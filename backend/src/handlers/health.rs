//! Health check handlers

use axum::{extract::State, Json};
use serde::Serialize;

use crate::store::InventoryStore;
use crate::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub database: String,
}

/// Health check endpoint handler
pub async fn health_check<S: InventoryStore>(
    State(state): State<AppState<S>>,
) -> Json<HealthResponse> {
    // Opening a transaction proves the store is reachable
    let db_status = match state.store.begin().await {
        Ok(_) => "connected".to_string(),
        Err(_) => "disconnected".to_string(),
    };

    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        database: db_status,
    })
}
