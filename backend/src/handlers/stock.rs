//! HTTP handlers for product stock and the stock ledger

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;
use uuid::Uuid;

use shared::{
    DateRange, LedgerFilter, LedgerOperationType, Pagination, Product, StockDrift,
    StockLedgerEntry,
};

use crate::error::{AppError, AppResult};
use crate::middleware::CurrentUser;
use crate::services::product::ProductStock;
use crate::services::{LedgerService, ProductService};
use crate::store::InventoryStore;
use crate::AppState;

/// Ledger query parameters
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerQuery {
    pub product: Option<Uuid>,
    pub warehouse: Option<Uuid>,
    pub operation_type: Option<String>,
    pub reference: Option<String>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

pub async fn get_product<S: InventoryStore>(
    State(state): State<AppState<S>>,
    _user: CurrentUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Product>> {
    let service = ProductService::new(state.store);
    Ok(Json(service.get(id).await?))
}

/// Per-warehouse stock of a product
pub async fn get_product_stock<S: InventoryStore>(
    State(state): State<AppState<S>>,
    _user: CurrentUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ProductStock>> {
    let service = ProductService::new(state.store);
    Ok(Json(service.stock(id).await?))
}

/// Stock ledger history
pub async fn list_ledger<S: InventoryStore>(
    State(state): State<AppState<S>>,
    _user: CurrentUser,
    Query(query): Query<LedgerQuery>,
) -> AppResult<Json<Vec<StockLedgerEntry>>> {
    let operation_type = query
        .operation_type
        .as_deref()
        .map(|t| {
            t.parse::<LedgerOperationType>()
                .map_err(|e| AppError::validation("operationType", e.to_string()))
        })
        .transpose()?;
    let inventory = &state.config.inventory;

    let filter = LedgerFilter {
        product_id: query.product,
        warehouse_id: query.warehouse,
        operation_type,
        reference_number: query.reference.filter(|r| !r.trim().is_empty()),
        dates: DateRange {
            from: query.date_from,
            to: query.date_to,
        },
        page: Pagination::from_query(
            query.limit,
            query.offset,
            inventory.ledger_page_size,
            inventory.max_page_size,
        ),
    };

    let service = LedgerService::new(state.store);
    Ok(Json(service.history(&filter).await?))
}

/// Products whose aggregate stock drifted from their warehouse rows
pub async fn stock_consistency<S: InventoryStore>(
    State(state): State<AppState<S>>,
    _user: CurrentUser,
) -> AppResult<Json<Vec<StockDrift>>> {
    let service = LedgerService::new(state.store);
    Ok(Json(service.consistency().await?))
}
