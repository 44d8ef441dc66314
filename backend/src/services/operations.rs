//! Behaviour shared by the four operation types: reads, edits, status
//! changes, deletion, validation and the checks every create runs

use std::sync::Arc;

use chrono::{Datelike, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use shared::{
    normalize_reference, validate_party_name, validate_reference_number, NewOperationItem,
    Operation, OperationFilter, OperationKind, OperationStatus, Warehouse,
};

use crate::error::{AppError, AppResult};
use crate::services::numbering;
use crate::services::validation::{ValidationEngine, ValidationOutcome};
use crate::store::{InventoryStore, StoreTx};

/// Line item as submitted on create
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct OperationItemInput {
    pub product_id: Uuid,
    #[validate(range(min = 1))]
    pub quantity: i32,
    pub unit_price: Option<Decimal>,
}

impl From<&OperationItemInput> for NewOperationItem {
    fn from(input: &OperationItemInput) -> Self {
        Self {
            product_id: input.product_id,
            quantity: input.quantity,
            unit_price: input.unit_price,
        }
    }
}

/// Header changes to an operation that is not yet done or cancelled
///
/// Absent fields are kept. Blank `notes` or `reason` clear the field.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateOperationInput {
    #[serde(
        alias = "receiptNumber",
        alias = "deliveryNumber",
        alias = "transferNumber",
        alias = "adjustmentNumber"
    )]
    pub reference_number: Option<String>,
    pub warehouse_id: Option<Uuid>,
    pub from_warehouse_id: Option<Uuid>,
    pub to_warehouse_id: Option<Uuid>,
    #[validate(length(max = 255))]
    pub supplier_name: Option<String>,
    #[validate(length(max = 255))]
    pub customer_name: Option<String>,
    pub notes: Option<String>,
    #[validate(range(min = 0))]
    pub counted_quantity: Option<i32>,
    pub reason: Option<String>,
}

impl UpdateOperationInput {
    /// First supplied field that `kind` does not have
    fn foreign_field(&self, kind: OperationKind) -> Option<&'static str> {
        use OperationKind::*;
        [
            ("warehouseId", self.warehouse_id.is_some(), matches!(kind, Receipt | Delivery)),
            ("fromWarehouseId", self.from_warehouse_id.is_some(), kind == Transfer),
            ("toWarehouseId", self.to_warehouse_id.is_some(), kind == Transfer),
            ("supplierName", self.supplier_name.is_some(), kind == Receipt),
            ("customerName", self.customer_name.is_some(), kind == Delivery),
            ("notes", self.notes.is_some(), kind.has_items()),
            ("countedQuantity", self.counted_quantity.is_some(), kind == Adjustment),
            ("reason", self.reason.is_some(), kind == Adjustment),
        ]
        .into_iter()
        .find(|(_, supplied, allowed)| *supplied && !allowed)
        .map(|(field, ..)| field)
    }

    fn warehouse_ids(&self) -> impl Iterator<Item = Uuid> {
        [self.warehouse_id, self.from_warehouse_id, self.to_warehouse_id]
            .into_iter()
            .flatten()
    }
}

/// Reads, edits, status changes, deletion and validation for one
/// operation type
pub struct OperationService<S> {
    store: Arc<S>,
    kind: OperationKind,
}

impl<S: InventoryStore> OperationService<S> {
    pub fn new(store: Arc<S>, kind: OperationKind) -> Self {
        Self { store, kind }
    }

    pub async fn get(&self, id: Uuid) -> AppResult<Operation> {
        let mut tx = self.store.begin().await?;
        tx.fetch_operation(self.kind, id, false)
            .await?
            .ok_or_else(|| AppError::NotFound(self.kind.label().to_string()))
    }

    pub async fn list(&self, filter: &OperationFilter) -> AppResult<Vec<Operation>> {
        if let Some(status) = filter.status {
            if !self.kind.supports_status(status) {
                return Err(AppError::InvalidStatus(format!(
                    "{} has no status {}",
                    self.kind, status
                )));
            }
        }
        let mut tx = self.store.begin().await?;
        tx.list_operations(self.kind, filter).await
    }

    /// Edit the header of an operation that is not yet done or cancelled
    pub async fn update(&self, id: Uuid, input: UpdateOperationInput) -> AppResult<Operation> {
        input.validate()?;
        let mut tx = self.store.begin().await?;

        let mut operation = tx
            .fetch_operation(self.kind, id, true)
            .await?
            .ok_or_else(|| AppError::NotFound(self.kind.label().to_string()))?;
        if !self.kind.can_edit(operation.status()) {
            return Err(AppError::InvalidStatus(format!(
                "{} {} is {} and can no longer be edited",
                self.kind,
                operation.reference_number(),
                operation.status()
            )));
        }

        let previous_number = operation.reference_number().to_string();
        apply_edit(&mut operation, &input)?;

        let number = operation.reference_number();
        if number != previous_number && tx.reference_exists(self.kind, number).await? {
            return Err(AppError::DuplicateNumber(number.to_string()));
        }
        for warehouse_id in input.warehouse_ids() {
            ensure_warehouse(&mut tx, warehouse_id).await?;
        }

        tx.update_operation(&operation).await?;
        let updated = tx
            .fetch_operation(self.kind, id, false)
            .await?
            .ok_or_else(|| AppError::NotFound(self.kind.label().to_string()))?;
        tx.commit().await?;

        tracing::info!(
            operation_id = %id,
            reference = %updated.reference_number(),
            "{} updated",
            self.kind
        );
        Ok(updated)
    }

    /// Manual status change; `done` is only reachable through validation
    pub async fn set_status(&self, id: Uuid, status: &str) -> AppResult<Operation> {
        let target = parse_status(status)?;
        let mut tx = self.store.begin().await?;

        let operation = tx
            .fetch_operation(self.kind, id, true)
            .await?
            .ok_or_else(|| AppError::NotFound(self.kind.label().to_string()))?;
        let current = operation.status();

        if !self.kind.can_transition(current, target) {
            tracing::warn!(
                operation_id = %id,
                from = %current,
                to = %target,
                "Rejected {} status change",
                self.kind
            );
            return Err(AppError::InvalidStatus(format!(
                "{} {} cannot move from {} to {}",
                self.kind,
                operation.reference_number(),
                current,
                target
            )));
        }

        tx.set_status(self.kind, id, target, None).await?;
        let updated = tx
            .fetch_operation(self.kind, id, false)
            .await?
            .ok_or_else(|| AppError::NotFound(self.kind.label().to_string()))?;
        tx.commit().await?;

        tracing::info!(
            operation_id = %id,
            reference = %updated.reference_number(),
            status = %target,
            "{} status changed",
            self.kind
        );
        Ok(updated)
    }

    /// Delete a draft or cancelled operation with its items
    pub async fn delete(&self, id: Uuid) -> AppResult<()> {
        let mut tx = self.store.begin().await?;

        let operation = tx
            .fetch_operation(self.kind, id, true)
            .await?
            .ok_or_else(|| AppError::NotFound(self.kind.label().to_string()))?;

        if !self.kind.can_delete(operation.status()) {
            return Err(AppError::InvalidStatus(format!(
                "{} {} is {}; only draft or cancelled operations can be deleted",
                self.kind,
                operation.reference_number(),
                operation.status()
            )));
        }

        tx.delete_operation(self.kind, id).await?;
        tx.commit().await?;

        tracing::info!(
            operation_id = %id,
            reference = %operation.reference_number(),
            "{} deleted",
            self.kind
        );
        Ok(())
    }

    pub async fn validate(&self, id: Uuid, actor_id: Uuid) -> AppResult<ValidationOutcome> {
        ValidationEngine::new(Arc::clone(&self.store))
            .validate(self.kind, id, actor_id)
            .await
    }
}

/// Merge an edit into the stored operation
fn apply_edit(operation: &mut Operation, input: &UpdateOperationInput) -> AppResult<()> {
    let kind = operation.kind();
    if let Some(field) = input.foreign_field(kind) {
        return Err(AppError::validation(field, format!("{kind} has no {field}")));
    }

    let number = match input.reference_number.as_deref() {
        Some(number) => {
            validate_reference_number(number)
                .map_err(|msg| AppError::validation("referenceNumber", msg))?;
            Some(number.trim().to_string())
        }
        None => None,
    };
    let notes = input.notes.as_deref().map(|n| clean_text(Some(n)));

    match operation {
        Operation::Receipt(r) => {
            if let Some(number) = number {
                r.receipt_number = number;
            }
            if let Some(warehouse_id) = input.warehouse_id {
                r.warehouse_id = warehouse_id;
            }
            if let Some(name) = input.supplier_name.as_deref() {
                r.supplier_name = party_name("supplierName", name)?;
            }
            if let Some(notes) = notes {
                r.notes = notes;
            }
        }
        Operation::Delivery(d) => {
            if let Some(number) = number {
                d.delivery_number = number;
            }
            if let Some(warehouse_id) = input.warehouse_id {
                d.warehouse_id = Some(warehouse_id);
            }
            if let Some(name) = input.customer_name.as_deref() {
                d.customer_name = party_name("customerName", name)?;
            }
            if let Some(notes) = notes {
                d.notes = notes;
            }
        }
        Operation::Transfer(t) => {
            if let Some(number) = number {
                t.transfer_number = number;
            }
            if let Some(from) = input.from_warehouse_id {
                t.from_warehouse_id = from;
            }
            if let Some(to) = input.to_warehouse_id {
                t.to_warehouse_id = to;
            }
            if t.from_warehouse_id == t.to_warehouse_id {
                return Err(AppError::InvalidWarehouses);
            }
            if let Some(notes) = notes {
                t.notes = notes;
            }
        }
        Operation::Adjustment(a) => {
            if let Some(number) = number {
                a.adjustment_number = number;
            }
            if let Some(counted) = input.counted_quantity {
                // both quantities are non-negative
                a.counted_quantity = counted;
                a.difference = counted - a.system_quantity;
            }
            if let Some(reason) = input.reason.as_deref() {
                a.reason = clean_text(Some(reason));
            }
        }
    }
    Ok(())
}

fn party_name(field: &'static str, name: &str) -> AppResult<String> {
    validate_party_name(name).map_err(|msg| AppError::validation(field, msg))?;
    Ok(name.trim().to_string())
}

// ============================================================================
// Create helpers
// ============================================================================

pub(crate) fn parse_status(status: &str) -> AppResult<OperationStatus> {
    status.trim().parse().map_err(|_| {
        AppError::InvalidStatus(format!(
            "Status must be one of: {}",
            OperationStatus::ALL
                .iter()
                .map(OperationStatus::as_str)
                .collect::<Vec<_>>()
                .join(", ")
        ))
    })
}

/// Status a new operation starts in
pub(crate) fn initial_status(
    kind: OperationKind,
    requested: Option<&str>,
) -> AppResult<OperationStatus> {
    let status = match requested {
        Some(s) => parse_status(s)?,
        None => OperationStatus::Draft,
    };
    if !kind.can_create_as(status) {
        return Err(AppError::InvalidStatus(format!(
            "{kind} cannot be created as {status}"
        )));
    }
    Ok(status)
}

/// The trimmed caller-supplied number, or the next free one
pub(crate) async fn resolve_reference<T: StoreTx>(
    tx: &mut T,
    kind: OperationKind,
    supplied: Option<&str>,
) -> AppResult<String> {
    let number = match normalize_reference(supplied) {
        Some(number) => {
            validate_reference_number(&number)
                .map_err(|msg| AppError::validation("referenceNumber", msg))?;
            number
        }
        None => numbering::generate(tx, kind, Utc::now().year()).await?,
    };

    if tx.reference_exists(kind, &number).await? {
        return Err(AppError::DuplicateNumber(number));
    }
    Ok(number)
}

pub(crate) async fn ensure_warehouse<T: StoreTx>(tx: &mut T, id: Uuid) -> AppResult<Warehouse> {
    tx.warehouse(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Warehouse {id}")))
}

/// Check that every product exists; quantities are checked by the input derive
pub(crate) async fn check_items<T: StoreTx>(
    tx: &mut T,
    items: &[OperationItemInput],
) -> AppResult<Vec<NewOperationItem>> {
    for item in items {
        if tx.product(item.product_id).await?.is_none() {
            return Err(AppError::NotFound(format!("Product {}", item.product_id)));
        }
    }
    Ok(items.iter().map(NewOperationItem::from).collect())
}

/// Trimmed optional text, `None` when blank
pub(crate) fn clean_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
