//! HTTP handlers for deliveries

use axum::{extract::State, http::StatusCode, Json};

use shared::Delivery;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::delivery::{CreateDeliveryInput, DeliveryService};
use crate::store::InventoryStore;
use crate::AppState;

/// Create a delivery; leave out the warehouse to ship from all of them
pub async fn create_delivery<S: InventoryStore>(
    State(state): State<AppState<S>>,
    current_user: CurrentUser,
    Json(input): Json<CreateDeliveryInput>,
) -> AppResult<(StatusCode, Json<Delivery>)> {
    let service = DeliveryService::new(state.store);
    let delivery = service.create(input, current_user.0.user_id).await?;
    Ok((StatusCode::CREATED, Json(delivery)))
}
