//! In-memory store
//!
//! A transaction takes the store-wide lock, works on a copy of the state and
//! swaps it in on commit. Transactions are therefore fully serialised, which
//! matches the strongest behaviour the PostgreSQL store gives under row
//! locks.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use shared::{
    Adjustment, Delivery, LedgerFilter, NewLedgerEntry, NewOperation, NewOperationItem,
    Operation, OperationFilter, OperationItem, OperationKind, OperationStatus, Product, Receipt,
    StockDrift, StockLedgerEntry, Transfer, Warehouse, WarehouseStock, WarehouseStockLevel,
};

use super::{InventoryStore, StoreTx};
use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Default)]
struct MemoryState {
    products: BTreeMap<Uuid, Product>,
    warehouses: BTreeMap<Uuid, Warehouse>,
    stock: BTreeMap<(Uuid, Uuid), WarehouseStock>,
    /// Insertion order
    operations: Vec<Operation>,
    ledger: Vec<StockLedgerEntry>,
}

/// Store backed by process memory, used by the test suites
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
    ledger_fault: Arc<AtomicUsize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the `n`th ledger insert from now fail with a storage error
    pub fn fail_ledger_insert_at(&self, n: usize) {
        self.ledger_fault.store(n, Ordering::SeqCst);
    }

    pub async fn seed_warehouse(&self, name: &str) -> Warehouse {
        let warehouse = Warehouse {
            id: Uuid::new_v4(),
            name: name.to_string(),
            location: None,
            is_active: true,
            created_at: Utc::now(),
        };
        let mut state = self.state.lock().await;
        state.warehouses.insert(warehouse.id, warehouse.clone());
        warehouse
    }

    pub async fn seed_product(&self, sku: &str, name: &str) -> Product {
        let now = Utc::now();
        let product = Product {
            id: Uuid::new_v4(),
            sku: sku.to_string(),
            name: name.to_string(),
            category_id: None,
            unit_of_measure: "unit".to_string(),
            reorder_level: 0,
            current_stock: 0,
            cost_price: Decimal::ZERO,
            selling_price: Decimal::ZERO,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        let mut state = self.state.lock().await;
        state.products.insert(product.id, product.clone());
        product
    }

    /// Put `quantity` of a product into a warehouse, keeping the aggregate
    /// in step
    pub async fn seed_stock(&self, product_id: Uuid, warehouse_id: Uuid, quantity: i32) {
        let mut state = self.state.lock().await;
        let previous = state
            .stock
            .get(&(product_id, warehouse_id))
            .map_or(0, |s| s.quantity);
        state.stock.insert(
            (product_id, warehouse_id),
            WarehouseStock {
                product_id,
                warehouse_id,
                quantity,
                updated_at: Utc::now(),
            },
        );
        if let Some(product) = state.products.get_mut(&product_id) {
            product.current_stock += quantity - previous;
        }
    }

    pub async fn product_stock(&self, product_id: Uuid) -> Option<i32> {
        let state = self.state.lock().await;
        state.products.get(&product_id).map(|p| p.current_stock)
    }

    pub async fn warehouse_quantity(&self, product_id: Uuid, warehouse_id: Uuid) -> Option<i32> {
        let state = self.state.lock().await;
        state
            .stock
            .get(&(product_id, warehouse_id))
            .map(|s| s.quantity)
    }

    pub async fn stock_rows(&self) -> Vec<WarehouseStock> {
        let state = self.state.lock().await;
        state.stock.values().cloned().collect()
    }

    /// Ledger in insertion order
    pub async fn ledger(&self) -> Vec<StockLedgerEntry> {
        let state = self.state.lock().await;
        state.ledger.clone()
    }
}

#[async_trait]
impl InventoryStore for MemoryStore {
    type Tx = MemoryTx;

    async fn begin(&self) -> AppResult<MemoryTx> {
        let guard = Arc::clone(&self.state).lock_owned().await;
        let work = guard.clone();
        Ok(MemoryTx {
            guard,
            work,
            ledger_fault: Arc::clone(&self.ledger_fault),
        })
    }
}

/// Transaction over a [`MemoryStore`]
pub struct MemoryTx {
    guard: OwnedMutexGuard<MemoryState>,
    work: MemoryState,
    ledger_fault: Arc<AtomicUsize>,
}

impl MemoryTx {
    fn operation_mut(&mut self, kind: OperationKind, id: Uuid) -> AppResult<&mut Operation> {
        self.work
            .operations
            .iter_mut()
            .find(|op| op.kind() == kind && op.id() == id)
            .ok_or_else(|| AppError::NotFound(kind.label().to_string()))
    }

    fn trip_ledger_fault(&self) -> bool {
        self.ledger_fault
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .map_or(false, |previous| previous == 1)
    }
}

fn build_items(operation_id: Uuid, items: Vec<NewOperationItem>, now: DateTime<Utc>) -> Vec<OperationItem> {
    items
        .into_iter()
        .map(|item| OperationItem {
            id: Uuid::new_v4(),
            operation_id,
            product_id: item.product_id,
            quantity: item.quantity,
            unit_price: item.unit_price,
            created_at: now,
        })
        .collect()
}

fn page<T>(items: impl Iterator<Item = T>, limit: u32, offset: u32) -> Vec<T> {
    items
        .skip(offset as usize)
        .take(limit as usize)
        .collect()
}

#[async_trait]
impl StoreTx for MemoryTx {
    async fn fetch_operation(
        &mut self,
        kind: OperationKind,
        id: Uuid,
        _lock: bool,
    ) -> AppResult<Option<Operation>> {
        Ok(self
            .work
            .operations
            .iter()
            .find(|op| op.kind() == kind && op.id() == id)
            .cloned())
    }

    async fn insert_operation(&mut self, operation: NewOperation) -> AppResult<Operation> {
        let kind = operation.kind();
        if self.reference_exists(kind, operation.reference_number()).await? {
            return Err(AppError::DuplicateNumber(
                operation.reference_number().to_string(),
            ));
        }

        let id = Uuid::new_v4();
        let now = Utc::now();
        let stored = match operation {
            NewOperation::Receipt(r) => Operation::Receipt(Receipt {
                id,
                receipt_number: r.receipt_number,
                warehouse_id: r.warehouse_id,
                supplier_name: r.supplier_name,
                status: r.status,
                notes: r.notes,
                created_by: r.created_by,
                created_at: now,
                validated_at: None,
                items: build_items(id, r.items, now),
            }),
            NewOperation::Delivery(d) => Operation::Delivery(Delivery {
                id,
                delivery_number: d.delivery_number,
                warehouse_id: d.warehouse_id,
                customer_name: d.customer_name,
                status: d.status,
                notes: d.notes,
                created_by: d.created_by,
                created_at: now,
                validated_at: None,
                items: build_items(id, d.items, now),
            }),
            NewOperation::Transfer(t) => Operation::Transfer(Transfer {
                id,
                transfer_number: t.transfer_number,
                from_warehouse_id: t.from_warehouse_id,
                to_warehouse_id: t.to_warehouse_id,
                status: t.status,
                notes: t.notes,
                created_by: t.created_by,
                created_at: now,
                validated_at: None,
                items: build_items(id, t.items, now),
            }),
            NewOperation::Adjustment(a) => Operation::Adjustment(Adjustment {
                id,
                difference: a.difference(),
                adjustment_number: a.adjustment_number,
                warehouse_id: a.warehouse_id,
                product_id: a.product_id,
                counted_quantity: a.counted_quantity,
                system_quantity: a.system_quantity,
                reason: a.reason,
                status: OperationStatus::Draft,
                created_by: a.created_by,
                created_at: now,
                validated_at: None,
            }),
        };

        self.work.operations.push(stored.clone());
        Ok(stored)
    }

    async fn list_operations(
        &mut self,
        kind: OperationKind,
        filter: &OperationFilter,
    ) -> AppResult<Vec<Operation>> {
        let mut matching: Vec<&Operation> = self
            .work
            .operations
            .iter()
            .rev()
            .filter(|op| op.kind() == kind && filter.matches(op))
            .collect();
        // stable, so equal timestamps keep newest-inserted first
        matching.sort_by(|a, b| b.created_at().cmp(&a.created_at()));

        Ok(page(
            matching.into_iter().cloned(),
            filter.page.limit,
            filter.page.offset,
        ))
    }

    async fn reference_exists(&mut self, kind: OperationKind, number: &str) -> AppResult<bool> {
        Ok(self
            .work
            .operations
            .iter()
            .any(|op| op.kind() == kind && op.reference_number() == number))
    }

    async fn reference_numbers(
        &mut self,
        kind: OperationKind,
        prefix: &str,
    ) -> AppResult<Vec<String>> {
        Ok(self
            .work
            .operations
            .iter()
            .filter(|op| op.kind() == kind && op.reference_number().starts_with(prefix))
            .map(|op| op.reference_number().to_string())
            .collect())
    }

    async fn set_status(
        &mut self,
        kind: OperationKind,
        id: Uuid,
        status: OperationStatus,
        validated_at: Option<DateTime<Utc>>,
    ) -> AppResult<()> {
        self.operation_mut(kind, id)?
            .set_status(status, validated_at);
        Ok(())
    }

    async fn update_operation(&mut self, operation: &Operation) -> AppResult<()> {
        let (kind, id, number) = (operation.kind(), operation.id(), operation.reference_number());
        let taken = self
            .work
            .operations
            .iter()
            .any(|op| op.kind() == kind && op.id() != id && op.reference_number() == number);
        if taken {
            return Err(AppError::DuplicateNumber(number.to_string()));
        }

        match (self.operation_mut(kind, id)?, operation) {
            (Operation::Receipt(stored), Operation::Receipt(edit)) => {
                stored.receipt_number = edit.receipt_number.clone();
                stored.warehouse_id = edit.warehouse_id;
                stored.supplier_name = edit.supplier_name.clone();
                stored.notes = edit.notes.clone();
            }
            (Operation::Delivery(stored), Operation::Delivery(edit)) => {
                stored.delivery_number = edit.delivery_number.clone();
                stored.warehouse_id = edit.warehouse_id;
                stored.customer_name = edit.customer_name.clone();
                stored.notes = edit.notes.clone();
            }
            (Operation::Transfer(stored), Operation::Transfer(edit)) => {
                stored.transfer_number = edit.transfer_number.clone();
                stored.from_warehouse_id = edit.from_warehouse_id;
                stored.to_warehouse_id = edit.to_warehouse_id;
                stored.notes = edit.notes.clone();
            }
            (Operation::Adjustment(stored), Operation::Adjustment(edit)) => {
                stored.adjustment_number = edit.adjustment_number.clone();
                stored.counted_quantity = edit.counted_quantity;
                stored.difference = edit.difference;
                stored.reason = edit.reason.clone();
            }
            (stored, _) => {
                return Err(AppError::Internal(format!(
                    "{} {} changed kind",
                    stored.kind(),
                    id
                )))
            }
        }
        Ok(())
    }

    async fn append_note(&mut self, kind: OperationKind, id: Uuid, note: &str) -> AppResult<()> {
        let notes = match self.operation_mut(kind, id)? {
            Operation::Receipt(r) => &mut r.notes,
            Operation::Delivery(d) => &mut d.notes,
            Operation::Transfer(t) => &mut t.notes,
            Operation::Adjustment(_) => return Ok(()),
        };
        *notes = Some(match notes.take() {
            Some(existing) if !existing.is_empty() => format!("{existing}\n{note}"),
            _ => note.to_string(),
        });
        Ok(())
    }

    async fn delete_operation(&mut self, kind: OperationKind, id: Uuid) -> AppResult<bool> {
        let before = self.work.operations.len();
        self.work
            .operations
            .retain(|op| !(op.kind() == kind && op.id() == id));
        Ok(self.work.operations.len() != before)
    }

    async fn product(&mut self, id: Uuid) -> AppResult<Option<Product>> {
        Ok(self.work.products.get(&id).cloned())
    }

    async fn lock_product(&mut self, id: Uuid) -> AppResult<Option<Product>> {
        // the store-wide lock is already held
        self.product(id).await
    }

    async fn warehouse(&mut self, id: Uuid) -> AppResult<Option<Warehouse>> {
        Ok(self.work.warehouses.get(&id).cloned())
    }

    async fn stock_levels(&mut self, product_id: Uuid) -> AppResult<Vec<WarehouseStockLevel>> {
        let mut levels: Vec<WarehouseStockLevel> = self
            .work
            .stock
            .values()
            .filter(|s| s.product_id == product_id)
            .filter_map(|s| {
                self.work
                    .warehouses
                    .get(&s.warehouse_id)
                    .map(|w| WarehouseStockLevel {
                        warehouse_id: w.id,
                        warehouse_name: w.name.clone(),
                        location: w.location.clone(),
                        quantity: s.quantity,
                        updated_at: s.updated_at,
                    })
            })
            .collect();
        levels.sort_by(|a, b| a.warehouse_name.cmp(&b.warehouse_name));
        Ok(levels)
    }

    async fn stock_level(
        &mut self,
        product_id: Uuid,
        warehouse_id: Uuid,
    ) -> AppResult<Option<WarehouseStock>> {
        Ok(self.work.stock.get(&(product_id, warehouse_id)).cloned())
    }

    async fn set_product_stock(&mut self, product_id: Uuid, quantity: i32) -> AppResult<()> {
        let product = self
            .work
            .products
            .get_mut(&product_id)
            .ok_or_else(|| AppError::NotFound("Product".to_string()))?;
        product.current_stock = quantity;
        product.updated_at = Utc::now();
        Ok(())
    }

    async fn upsert_stock_level(
        &mut self,
        product_id: Uuid,
        warehouse_id: Uuid,
        quantity: i32,
    ) -> AppResult<()> {
        if quantity < 0 {
            return Err(AppError::Internal(format!(
                "stock row for product {product_id} in warehouse {warehouse_id} would go negative"
            )));
        }
        self.work.stock.insert(
            (product_id, warehouse_id),
            WarehouseStock {
                product_id,
                warehouse_id,
                quantity,
                updated_at: Utc::now(),
            },
        );
        Ok(())
    }

    async fn insert_ledger_entry(&mut self, entry: NewLedgerEntry) -> AppResult<StockLedgerEntry> {
        if self.trip_ledger_fault() {
            return Err(AppError::Internal("injected ledger failure".to_string()));
        }

        let stored = StockLedgerEntry {
            id: Uuid::new_v4(),
            product_id: entry.product_id,
            warehouse_id: entry.warehouse_id,
            operation_type: entry.operation_type,
            reference_number: entry.reference_number,
            quantity_change: entry.quantity_change,
            quantity_after: entry.quantity_after,
            created_by: entry.created_by,
            created_at: Utc::now(),
            notes: entry.notes,
        };
        self.work.ledger.push(stored.clone());
        Ok(stored)
    }

    async fn ledger_entries(&mut self, filter: &LedgerFilter) -> AppResult<Vec<StockLedgerEntry>> {
        let mut matching: Vec<&StockLedgerEntry> = self
            .work
            .ledger
            .iter()
            .rev()
            .filter(|e| filter.matches(e))
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        Ok(page(
            matching.into_iter().cloned(),
            filter.page.limit,
            filter.page.offset,
        ))
    }

    async fn stock_drift(&mut self) -> AppResult<Vec<StockDrift>> {
        Ok(self
            .work
            .products
            .values()
            .filter_map(|p| {
                let warehouse_total: i64 = self
                    .work
                    .stock
                    .values()
                    .filter(|s| s.product_id == p.id)
                    .map(|s| i64::from(s.quantity))
                    .sum();
                (i64::from(p.current_stock) != warehouse_total).then(|| StockDrift {
                    product_id: p.id,
                    sku: p.sku.clone(),
                    current_stock: p.current_stock,
                    warehouse_total,
                })
            })
            .collect())
    }

    async fn commit(self) -> AppResult<()> {
        let MemoryTx { mut guard, work, .. } = self;
        *guard = work;
        Ok(())
    }
}
