//! Deliveries: outgoing goods, from one warehouse or split across all

use std::sync::Arc;

use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use shared::{validate_party_name, Delivery, NewDelivery, NewOperation, Operation, OperationKind};

use crate::error::{AppError, AppResult};
use crate::services::operations::{
    check_items, clean_text, ensure_warehouse, initial_status, resolve_reference,
    OperationItemInput,
};
use crate::store::{InventoryStore, StoreTx};

/// Input for creating a delivery
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateDeliveryInput {
    pub delivery_number: Option<String>,
    /// Without a warehouse, validation takes stock from every warehouse
    pub warehouse_id: Option<Uuid>,
    #[validate(length(min = 1, max = 255))]
    pub customer_name: String,
    pub status: Option<String>,
    pub notes: Option<String>,
    #[serde(default)]
    #[validate]
    pub items: Vec<OperationItemInput>,
}

/// Delivery creation
pub struct DeliveryService<S> {
    store: Arc<S>,
}

impl<S: InventoryStore> DeliveryService<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub async fn create(&self, input: CreateDeliveryInput, actor_id: Uuid) -> AppResult<Delivery> {
        input.validate()?;
        validate_party_name(&input.customer_name)
            .map_err(|msg| AppError::validation("customerName", msg))?;
        let status = initial_status(OperationKind::Delivery, input.status.as_deref())?;

        let mut tx = self.store.begin().await?;
        let delivery_number = resolve_reference(
            &mut tx,
            OperationKind::Delivery,
            input.delivery_number.as_deref(),
        )
        .await?;
        if let Some(warehouse_id) = input.warehouse_id {
            ensure_warehouse(&mut tx, warehouse_id).await?;
        }
        let items = check_items(&mut tx, &input.items).await?;

        let created = tx
            .insert_operation(NewOperation::Delivery(NewDelivery {
                delivery_number,
                warehouse_id: input.warehouse_id,
                customer_name: input.customer_name.trim().to_string(),
                status,
                notes: clean_text(input.notes.as_deref()),
                created_by: actor_id,
                items,
            }))
            .await?;
        tx.commit().await?;

        match created {
            Operation::Delivery(delivery) => {
                tracing::info!(
                    operation_id = %delivery.id,
                    reference = %delivery.delivery_number,
                    split = delivery.warehouse_id.is_none(),
                    "Delivery created"
                );
                Ok(delivery)
            }
            other => Err(AppError::Internal(format!(
                "expected a delivery, store returned {}",
                other.kind()
            ))),
        }
    }
}
