//! Stock mutator and ledger writer
//!
//! The only code that writes `products.current_stock`, `product_stock` and
//! `stock_ledger`. Both run inside the caller's transaction; the caller is
//! responsible for locking the product first and for checking sufficiency.

use serde::Serialize;
use uuid::Uuid;

use shared::{checked_quantity, DeltaScope, NewLedgerEntry, PlannedMovement, StockLedgerEntry};

use crate::error::{AppError, AppResult};
use crate::store::StoreTx;

/// Quantities before and after one delta
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StockChange {
    pub product_before: i32,
    pub product_after: i32,
    pub warehouse_before: i32,
    pub warehouse_after: i32,
}

/// Applies signed deltas to the aggregate and warehouse stock
pub struct StockMutator;

impl StockMutator {
    /// Apply `delta` to a (product, warehouse) pair
    ///
    /// The warehouse row is created at zero when missing. With
    /// [`DeltaScope::WarehouseOnly`] the product aggregate is read but not
    /// written.
    pub async fn apply_delta<T: StoreTx>(
        tx: &mut T,
        product_id: Uuid,
        warehouse_id: Uuid,
        delta: i32,
        scope: DeltaScope,
    ) -> AppResult<StockChange> {
        let product = tx
            .product(product_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Product".to_string()))?;
        let warehouse_before = tx
            .stock_level(product_id, warehouse_id)
            .await?
            .map_or(0, |level| level.quantity);

        let warehouse_after =
            checked_quantity(warehouse_before, delta).map_err(|e| AppError::Internal(e.into()))?;
        tx.upsert_stock_level(product_id, warehouse_id, warehouse_after)
            .await?;

        let product_before = product.current_stock;
        let product_after = match scope {
            DeltaScope::ProductAndWarehouse => {
                let after = checked_quantity(product_before, delta)
                    .map_err(|e| AppError::Internal(e.into()))?;
                tx.set_product_stock(product_id, after).await?;
                after
            }
            DeltaScope::WarehouseOnly => product_before,
        };

        tracing::debug!(
            product_id = %product_id,
            warehouse_id = %warehouse_id,
            delta,
            warehouse_after,
            product_after,
            "Stock delta applied"
        );

        Ok(StockChange {
            product_before,
            product_after,
            warehouse_before,
            warehouse_after,
        })
    }
}

/// Appends immutable ledger entries
pub struct LedgerWriter;

impl LedgerWriter {
    pub async fn append<T: StoreTx>(
        tx: &mut T,
        entry: NewLedgerEntry,
    ) -> AppResult<StockLedgerEntry> {
        tx.insert_ledger_entry(entry).await
    }

    /// Ledger entry for a movement, using the warehouse quantity the mutator
    /// returned
    pub fn entry_for(
        movement: &PlannedMovement,
        change: &StockChange,
        reference_number: &str,
        actor_id: Uuid,
    ) -> NewLedgerEntry {
        NewLedgerEntry {
            product_id: movement.product_id,
            warehouse_id: movement.warehouse_id,
            operation_type: movement.entry_type,
            reference_number: reference_number.to_string(),
            quantity_change: movement.delta,
            quantity_after: change.warehouse_after,
            created_by: actor_id,
            notes: movement.note.clone(),
        }
    }
}
