//! HTTP handlers for adjustments

use axum::{extract::State, http::StatusCode, Json};

use shared::Adjustment;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::adjustment::{AdjustmentService, CreateAdjustmentInput};
use crate::store::InventoryStore;
use crate::AppState;

/// Create a draft adjustment from a physical count
pub async fn create_adjustment<S: InventoryStore>(
    State(state): State<AppState<S>>,
    current_user: CurrentUser,
    Json(input): Json<CreateAdjustmentInput>,
) -> AppResult<(StatusCode, Json<Adjustment>)> {
    let service = AdjustmentService::new(state.store);
    let adjustment = service.create(input, current_user.0.user_id).await?;
    Ok((StatusCode::CREATED, Json(adjustment)))
}
