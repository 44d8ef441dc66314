//! Transfers between two warehouses

use std::sync::Arc;

use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use shared::{NewOperation, NewTransfer, Operation, OperationKind, Transfer};

use crate::error::{AppError, AppResult};
use crate::services::operations::{
    check_items, clean_text, ensure_warehouse, initial_status, resolve_reference,
    OperationItemInput,
};
use crate::store::{InventoryStore, StoreTx};

/// Input for creating a transfer
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateTransferInput {
    pub transfer_number: Option<String>,
    pub from_warehouse_id: Uuid,
    pub to_warehouse_id: Uuid,
    pub status: Option<String>,
    pub notes: Option<String>,
    #[serde(default)]
    #[validate]
    pub items: Vec<OperationItemInput>,
}

/// Transfer creation
pub struct TransferService<S> {
    store: Arc<S>,
}

impl<S: InventoryStore> TransferService<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub async fn create(&self, input: CreateTransferInput, actor_id: Uuid) -> AppResult<Transfer> {
        input.validate()?;
        if input.from_warehouse_id == input.to_warehouse_id {
            return Err(AppError::InvalidWarehouses);
        }
        let status = initial_status(OperationKind::Transfer, input.status.as_deref())?;

        let mut tx = self.store.begin().await?;
        let transfer_number = resolve_reference(
            &mut tx,
            OperationKind::Transfer,
            input.transfer_number.as_deref(),
        )
        .await?;
        ensure_warehouse(&mut tx, input.from_warehouse_id).await?;
        ensure_warehouse(&mut tx, input.to_warehouse_id).await?;
        // transfers carry no prices
        let items = check_items(&mut tx, &input.items)
            .await?
            .into_iter()
            .map(|mut item| {
                item.unit_price = None;
                item
            })
            .collect();

        let created = tx
            .insert_operation(NewOperation::Transfer(NewTransfer {
                transfer_number,
                from_warehouse_id: input.from_warehouse_id,
                to_warehouse_id: input.to_warehouse_id,
                status,
                notes: clean_text(input.notes.as_deref()),
                created_by: actor_id,
                items,
            }))
            .await?;
        tx.commit().await?;

        match created {
            Operation::Transfer(transfer) => {
                tracing::info!(
                    operation_id = %transfer.id,
                    reference = %transfer.transfer_number,
                    from = %transfer.from_warehouse_id,
                    to = %transfer.to_warehouse_id,
                    "Transfer created"
                );
                Ok(transfer)
            }
            other => Err(AppError::Internal(format!(
                "expected a transfer, store returned {}",
                other.kind()
            ))),
        }
    }
}
