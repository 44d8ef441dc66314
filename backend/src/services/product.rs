//! Product stock reads

use std::sync::Arc;

use serde::Serialize;
use uuid::Uuid;

use shared::{Product, WarehouseStockLevel};

use crate::error::{AppError, AppResult};
use crate::store::{InventoryStore, StoreTx};

/// A product with its per-warehouse breakdown
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductStock {
    pub product_id: Uuid,
    pub sku: String,
    pub current_stock: i32,
    pub is_low_stock: bool,
    pub warehouses: Vec<WarehouseStockLevel>,
}

pub struct ProductService<S> {
    store: Arc<S>,
}

impl<S: InventoryStore> ProductService<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub async fn get(&self, id: Uuid) -> AppResult<Product> {
        let mut tx = self.store.begin().await?;
        tx.product(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Product".to_string()))
    }

    /// Stock of a product in every warehouse, ordered by warehouse name
    pub async fn stock(&self, id: Uuid) -> AppResult<ProductStock> {
        let mut tx = self.store.begin().await?;
        let product = tx
            .product(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Product".to_string()))?;
        let warehouses = tx.stock_levels(id).await?;

        Ok(ProductStock {
            product_id: product.id,
            is_low_stock: product.is_low_stock(),
            sku: product.sku,
            current_stock: product.current_stock,
            warehouses,
        })
    }
}
