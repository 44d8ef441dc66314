//! Operation validation
//!
//! One routine validates all four operation types. The type only decides
//! which lines are planned and with which [`SufficiencyPolicy`]; locking,
//! mutation, ledger writes and the status flip are shared. Everything runs
//! in a single store transaction.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

use shared::{
    plan, AggregateDelta, Inbound, MultiWarehouseSplit, Operation, OperationKind,
    OperationStatus, PlanLine, Relocation, SingleWarehouse, StockSnapshot, SufficiencyPolicy,
};

use crate::error::{AppError, AppResult};
use crate::services::stock::{LedgerWriter, StockMutator};
use crate::store::{InventoryStore, StoreTx};

/// Result of a successful validation
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationOutcome {
    pub reference_number: String,
    pub items_processed: usize,
    pub stock_updates: Vec<StockUpdate>,
}

/// One applied movement
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StockUpdate {
    pub product_id: Uuid,
    pub warehouse_id: Uuid,
    pub quantity_change: i32,
    pub product_stock_before: i32,
    pub product_stock_after: i32,
    pub warehouse_stock_before: i32,
    pub warehouse_stock_after: i32,
}

/// Validates operations of any kind against a store
pub struct ValidationEngine<S> {
    store: Arc<S>,
}

impl<S: InventoryStore> ValidationEngine<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Validate an operation, moving it to `done`
    ///
    /// Precondition failures leave no trace. A failure while applying
    /// movements rolls the transaction back; for operations with notes the
    /// reason is then recorded in a separate write.
    pub async fn validate(
        &self,
        kind: OperationKind,
        id: Uuid,
        actor_id: Uuid,
    ) -> AppResult<ValidationOutcome> {
        match self.run(kind, id, actor_id).await {
            Ok(outcome) => {
                tracing::info!(
                    operation_id = %id,
                    reference = %outcome.reference_number,
                    items = outcome.items_processed,
                    movements = outcome.stock_updates.len(),
                    "{} validated",
                    kind
                );
                Ok(outcome)
            }
            Err(err) if err.is_internal() => {
                tracing::error!(operation_id = %id, error = %err, "{} validation failed", kind);
                self.record_failure(kind, id, &err).await;
                Err(err)
            }
            Err(err) => {
                tracing::warn!(operation_id = %id, code = ?err.code(), "{} validation rejected: {}", kind, err);
                Err(err)
            }
        }
    }

    async fn run(
        &self,
        kind: OperationKind,
        id: Uuid,
        actor_id: Uuid,
    ) -> AppResult<ValidationOutcome> {
        let mut tx = self.store.begin().await?;

        let operation = tx
            .fetch_operation(kind, id, true)
            .await?
            .ok_or_else(|| AppError::NotFound(kind.label().to_string()))?;
        let reference = operation.reference_number().to_string();

        if !kind.can_validate(operation.status()) {
            return Err(AppError::InvalidStatus(format!(
                "{} {} is {} and cannot be validated",
                kind,
                reference,
                operation.status()
            )));
        }

        let lines = plan_lines(&operation);
        if lines.is_empty() {
            return Err(AppError::NoItems(format!("{kind} {reference}")));
        }

        // Lock in id order so concurrent validations cannot deadlock
        let mut product_ids: Vec<Uuid> = lines.iter().map(|l| l.product_id).collect();
        product_ids.sort();
        product_ids.dedup();

        let mut snapshot = StockSnapshot::new();
        for product_id in &product_ids {
            if tx.lock_product(*product_id).await?.is_none() {
                return Err(AppError::NotFound(format!("Product {product_id}")));
            }
            for level in tx.stock_levels(*product_id).await? {
                snapshot.insert(*product_id, level.warehouse_id, level.quantity);
            }
        }

        let movements = {
            let policy = policy_for(&operation);
            plan(policy.as_ref(), &lines, snapshot)?
        };

        let mut stock_updates = Vec::with_capacity(movements.len());
        for movement in &movements {
            let change = StockMutator::apply_delta(
                &mut tx,
                movement.product_id,
                movement.warehouse_id,
                movement.delta,
                movement.scope,
            )
            .await?;
            let entry = LedgerWriter::entry_for(movement, &change, &reference, actor_id);
            LedgerWriter::append(&mut tx, entry).await?;

            stock_updates.push(StockUpdate {
                product_id: movement.product_id,
                warehouse_id: movement.warehouse_id,
                quantity_change: movement.delta,
                product_stock_before: change.product_before,
                product_stock_after: change.product_after,
                warehouse_stock_before: change.warehouse_before,
                warehouse_stock_after: change.warehouse_after,
            });
        }

        tx.set_status(kind, id, OperationStatus::Done, Some(Utc::now()))
            .await?;
        tx.commit().await?;

        Ok(ValidationOutcome {
            reference_number: reference,
            items_processed: lines.len(),
            stock_updates,
        })
    }

    /// Best effort: a failure here is only logged
    async fn record_failure(&self, kind: OperationKind, id: Uuid, err: &AppError) {
        if !kind.has_items() {
            return;
        }
        let note = format!("Validation failed: {err}");

        let result = async {
            let mut tx = self.store.begin().await?;
            tx.append_note(kind, id, &note).await?;
            tx.commit().await
        }
        .await;

        if let Err(note_err) = result {
            tracing::error!(
                operation_id = %id,
                error = %note_err,
                "Could not record validation failure"
            );
        }
    }
}

/// Lines to plan: the items, or the adjustment's signed difference
fn plan_lines(operation: &Operation) -> Vec<PlanLine> {
    match operation {
        Operation::Adjustment(a) => vec![PlanLine {
            product_id: a.product_id,
            quantity: a.difference,
        }],
        other => other
            .items()
            .iter()
            .map(|item| PlanLine {
                product_id: item.product_id,
                quantity: item.quantity,
            })
            .collect(),
    }
}

fn policy_for(operation: &Operation) -> Box<dyn SufficiencyPolicy + Send + Sync> {
    match operation {
        Operation::Receipt(r) => Box::new(Inbound {
            warehouse_id: r.warehouse_id,
            note: format!("Receipt validation: {}", r.receipt_number),
        }),
        Operation::Delivery(d) => {
            let note = format!("Delivery validation: {}", d.delivery_number);
            match d.warehouse_id {
                Some(warehouse_id) => Box::new(SingleWarehouse { warehouse_id, note }),
                None => Box::new(MultiWarehouseSplit { note }),
            }
        }
        Operation::Transfer(t) => Box::new(Relocation {
            from_warehouse_id: t.from_warehouse_id,
            to_warehouse_id: t.to_warehouse_id,
        }),
        Operation::Adjustment(a) => Box::new(AggregateDelta {
            warehouse_id: a.warehouse_id,
            note: a
                .reason
                .clone()
                .filter(|r| !r.trim().is_empty())
                .unwrap_or_else(|| "Stock adjustment validation".to_string()),
        }),
    }
}
