//! HTTP handlers shared by receipts, deliveries, transfers and adjustments
//!
//! Each handler is generic over an [`OperationResource`] marker, so one
//! definition serves all four route groups.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use shared::{DateRange, Operation, OperationFilter, OperationKind, Pagination};

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::operations::UpdateOperationInput;
use crate::services::{NumberingService, OperationService, ValidationOutcome};
use crate::store::InventoryStore;
use crate::AppState;

/// Marker for an operation route group
pub trait OperationResource: Send + Sync + 'static {
    const KIND: OperationKind;
}

pub struct Receipts;
pub struct Deliveries;
pub struct Transfers;
pub struct Adjustments;

impl OperationResource for Receipts {
    const KIND: OperationKind = OperationKind::Receipt;
}

impl OperationResource for Deliveries {
    const KIND: OperationKind = OperationKind::Delivery;
}

impl OperationResource for Transfers {
    const KIND: OperationKind = OperationKind::Transfer;
}

impl OperationResource for Adjustments {
    const KIND: OperationKind = OperationKind::Adjustment;
}

/// List query parameters
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationListQuery {
    pub status: Option<String>,
    pub warehouse: Option<Uuid>,
    pub product: Option<Uuid>,
    pub search: Option<String>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct StatusUpdateInput {
    pub status: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NextNumberResponse {
    pub next_number: String,
}

/// List operations
pub async fn list<S: InventoryStore, R: OperationResource>(
    State(state): State<AppState<S>>,
    _user: CurrentUser,
    Query(query): Query<OperationListQuery>,
) -> AppResult<Json<Vec<Operation>>> {
    let status = query
        .status
        .as_deref()
        .map(crate::services::operations::parse_status)
        .transpose()?;
    let inventory = &state.config.inventory;
    let filter = OperationFilter {
        status,
        warehouse_id: query.warehouse,
        product_id: query.product,
        search: query.search.filter(|s| !s.trim().is_empty()),
        dates: DateRange {
            from: query.date_from,
            to: query.date_to,
        },
        page: Pagination::from_query(
            query.limit,
            query.offset,
            inventory.default_page_size,
            inventory.max_page_size,
        ),
    };

    let service = OperationService::new(state.store, R::KIND);
    let operations = service.list(&filter).await?;
    Ok(Json(operations))
}

/// Get one operation with its items
pub async fn get<S: InventoryStore, R: OperationResource>(
    State(state): State<AppState<S>>,
    _user: CurrentUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Operation>> {
    let service = OperationService::new(state.store, R::KIND);
    let operation = service.get(id).await?;
    Ok(Json(operation))
}

/// Edit the header of an operation
pub async fn update<S: InventoryStore, R: OperationResource>(
    State(state): State<AppState<S>>,
    _user: CurrentUser,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateOperationInput>,
) -> AppResult<Json<Operation>> {
    let service = OperationService::new(state.store, R::KIND);
    let operation = service.update(id, input).await?;
    Ok(Json(operation))
}

/// Change the status of an operation
pub async fn update_status<S: InventoryStore, R: OperationResource>(
    State(state): State<AppState<S>>,
    _user: CurrentUser,
    Path(id): Path<Uuid>,
    Json(input): Json<StatusUpdateInput>,
) -> AppResult<Json<Operation>> {
    let service = OperationService::new(state.store, R::KIND);
    let operation = service.set_status(id, &input.status).await?;
    Ok(Json(operation))
}

/// Delete a draft or cancelled operation
pub async fn delete<S: InventoryStore, R: OperationResource>(
    State(state): State<AppState<S>>,
    _user: CurrentUser,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    let service = OperationService::new(state.store, R::KIND);
    service.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Validate an operation, applying its stock movements
pub async fn validate<S: InventoryStore, R: OperationResource>(
    State(state): State<AppState<S>>,
    current_user: CurrentUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ValidationOutcome>> {
    let service = OperationService::new(state.store, R::KIND);
    let outcome = service.validate(id, current_user.0.user_id).await?;
    Ok(Json(outcome))
}

/// Suggest the next reference number
pub async fn next_number<S: InventoryStore, R: OperationResource>(
    State(state): State<AppState<S>>,
    _user: CurrentUser,
) -> Json<NextNumberResponse> {
    let service = NumberingService::new(state.store);
    Json(NextNumberResponse {
        next_number: service.next_number(R::KIND).await,
    })
}
