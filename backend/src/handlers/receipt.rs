//! HTTP handlers for receipts

use axum::{extract::State, http::StatusCode, Json};

use shared::Receipt;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::receipt::{CreateReceiptInput, ReceiptService};
use crate::store::InventoryStore;
use crate::AppState;

/// Create a receipt
pub async fn create_receipt<S: InventoryStore>(
    State(state): State<AppState<S>>,
    current_user: CurrentUser,
    Json(input): Json<CreateReceiptInput>,
) -> AppResult<(StatusCode, Json<Receipt>)> {
    let service = ReceiptService::new(state.store);
    let receipt = service.create(input, current_user.0.user_id).await?;
    Ok((StatusCode::CREATED, Json(receipt)))
}
