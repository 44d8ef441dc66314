//! Receipts: incoming goods into one warehouse

use std::sync::Arc;

use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use shared::{validate_party_name, NewOperation, NewReceipt, Operation, OperationKind, Receipt};

use crate::error::{AppError, AppResult};
use crate::services::operations::{
    check_items, clean_text, ensure_warehouse, initial_status, resolve_reference,
    OperationItemInput,
};
use crate::store::{InventoryStore, StoreTx};

/// Input for creating a receipt
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateReceiptInput {
    /// Generated when absent
    pub receipt_number: Option<String>,
    pub warehouse_id: Uuid,
    #[validate(length(min = 1, max = 255))]
    pub supplier_name: String,
    pub status: Option<String>,
    pub notes: Option<String>,
    #[serde(default)]
    #[validate]
    pub items: Vec<OperationItemInput>,
}

/// Receipt creation
pub struct ReceiptService<S> {
    store: Arc<S>,
}

impl<S: InventoryStore> ReceiptService<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Create a receipt with its items
    pub async fn create(&self, input: CreateReceiptInput, actor_id: Uuid) -> AppResult<Receipt> {
        input.validate()?;
        validate_party_name(&input.supplier_name)
            .map_err(|msg| AppError::validation("supplierName", msg))?;
        let status = initial_status(OperationKind::Receipt, input.status.as_deref())?;

        let mut tx = self.store.begin().await?;
        let receipt_number =
            resolve_reference(&mut tx, OperationKind::Receipt, input.receipt_number.as_deref())
                .await?;
        ensure_warehouse(&mut tx, input.warehouse_id).await?;
        let items = check_items(&mut tx, &input.items).await?;

        let created = tx
            .insert_operation(NewOperation::Receipt(NewReceipt {
                receipt_number,
                warehouse_id: input.warehouse_id,
                supplier_name: input.supplier_name.trim().to_string(),
                status,
                notes: clean_text(input.notes.as_deref()),
                created_by: actor_id,
                items,
            }))
            .await?;
        tx.commit().await?;

        match created {
            Operation::Receipt(receipt) => {
                tracing::info!(
                    operation_id = %receipt.id,
                    reference = %receipt.receipt_number,
                    items = receipt.items.len(),
                    "Receipt created"
                );
                Ok(receipt)
            }
            other => Err(AppError::Internal(format!(
                "expected a receipt, store returned {}",
                other.kind()
            ))),
        }
    }
}
