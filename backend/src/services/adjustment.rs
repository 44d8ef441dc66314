//! Adjustments: bring a warehouse row in line with a physical count

use std::sync::Arc;

use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use shared::{Adjustment, NewAdjustment, NewOperation, Operation, OperationKind};

use crate::error::{AppError, AppResult};
use crate::services::operations::{clean_text, ensure_warehouse, resolve_reference};
use crate::store::{InventoryStore, StoreTx};

/// Input for creating an adjustment
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateAdjustmentInput {
    pub adjustment_number: Option<String>,
    pub warehouse_id: Uuid,
    pub product_id: Uuid,
    #[validate(range(min = 0))]
    pub counted_quantity: i32,
    pub reason: Option<String>,
}

/// Adjustment creation
pub struct AdjustmentService<S> {
    store: Arc<S>,
}

impl<S: InventoryStore> AdjustmentService<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Create a draft adjustment, snapshotting the current warehouse quantity
    pub async fn create(
        &self,
        input: CreateAdjustmentInput,
        actor_id: Uuid,
    ) -> AppResult<Adjustment> {
        input.validate()?;

        let mut tx = self.store.begin().await?;
        let adjustment_number = resolve_reference(
            &mut tx,
            OperationKind::Adjustment,
            input.adjustment_number.as_deref(),
        )
        .await?;
        ensure_warehouse(&mut tx, input.warehouse_id).await?;
        if tx.product(input.product_id).await?.is_none() {
            return Err(AppError::NotFound(format!("Product {}", input.product_id)));
        }

        let system_quantity = tx
            .stock_level(input.product_id, input.warehouse_id)
            .await?
            .map_or(0, |level| level.quantity);

        let created = tx
            .insert_operation(NewOperation::Adjustment(NewAdjustment {
                adjustment_number,
                warehouse_id: input.warehouse_id,
                product_id: input.product_id,
                counted_quantity: input.counted_quantity,
                system_quantity,
                reason: clean_text(input.reason.as_deref()),
                created_by: actor_id,
            }))
            .await?;
        tx.commit().await?;

        match created {
            Operation::Adjustment(adjustment) => {
                tracing::info!(
                    operation_id = %adjustment.id,
                    reference = %adjustment.adjustment_number,
                    system_quantity = adjustment.system_quantity,
                    counted_quantity = adjustment.counted_quantity,
                    difference = adjustment.difference,
                    "Adjustment created"
                );
                Ok(adjustment)
            }
            other => Err(AppError::Internal(format!(
                "expected an adjustment, store returned {}",
                other.kind()
            ))),
        }
    }
}
