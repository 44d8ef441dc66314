//! HTTP handlers for transfers

use axum::{extract::State, http::StatusCode, Json};

use shared::Transfer;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::transfer::{CreateTransferInput, TransferService};
use crate::store::InventoryStore;
use crate::AppState;

/// Create a transfer between two warehouses
pub async fn create_transfer<S: InventoryStore>(
    State(state): State<AppState<S>>,
    current_user: CurrentUser,
    Json(input): Json<CreateTransferInput>,
) -> AppResult<(StatusCode, Json<Transfer>)> {
    let service = TransferService::new(state.store);
    let transfer = service.create(input, current_user.0.user_id).await?;
    Ok((StatusCode::CREATED, Json(transfer)))
}
