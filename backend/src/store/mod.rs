//! Persistence seam between the services and storage
//!
//! Services only ever talk to a [`StoreTx`]. Everything a validation reads
//! and writes goes through one transaction, so a failure anywhere rolls the
//! whole operation back: dropping a transaction without calling
//! [`StoreTx::commit`] discards its writes.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use shared::{
    LedgerFilter, NewLedgerEntry, NewOperation, Operation, OperationFilter, OperationKind,
    OperationStatus, Product, StockDrift, StockLedgerEntry, Warehouse, WarehouseStock,
    WarehouseStockLevel,
};

use crate::error::AppResult;

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// A store that can open transactions
#[async_trait]
pub trait InventoryStore: Send + Sync + 'static {
    type Tx: StoreTx;

    async fn begin(&self) -> AppResult<Self::Tx>;
}

/// An open transaction
#[async_trait]
pub trait StoreTx: Send + Sized {
    // Operations

    /// Operation header with its items; `lock` holds the row until commit
    async fn fetch_operation(
        &mut self,
        kind: OperationKind,
        id: Uuid,
        lock: bool,
    ) -> AppResult<Option<Operation>>;

    /// Insert header and items; a taken reference number is `DuplicateNumber`
    async fn insert_operation(&mut self, operation: NewOperation) -> AppResult<Operation>;

    /// Newest first
    async fn list_operations(
        &mut self,
        kind: OperationKind,
        filter: &OperationFilter,
    ) -> AppResult<Vec<Operation>>;

    async fn reference_exists(&mut self, kind: OperationKind, number: &str) -> AppResult<bool>;

    /// Every stored reference number of `kind` starting with `prefix`
    async fn reference_numbers(
        &mut self,
        kind: OperationKind,
        prefix: &str,
    ) -> AppResult<Vec<String>>;

    /// `validated_at` is only written when given
    async fn set_status(
        &mut self,
        kind: OperationKind,
        id: Uuid,
        status: OperationStatus,
        validated_at: Option<DateTime<Utc>>,
    ) -> AppResult<()>;

    /// Write the header fields of a stored operation. Status, timestamps
    /// and items are left alone; a taken reference number is
    /// `DuplicateNumber`
    async fn update_operation(&mut self, operation: &Operation) -> AppResult<()>;

    /// Append a line to the notes of a receipt, delivery or transfer
    async fn append_note(&mut self, kind: OperationKind, id: Uuid, note: &str) -> AppResult<()>;

    async fn delete_operation(&mut self, kind: OperationKind, id: Uuid) -> AppResult<bool>;

    // Catalog

    async fn product(&mut self, id: Uuid) -> AppResult<Option<Product>>;

    /// Read a product and hold its row until commit
    async fn lock_product(&mut self, id: Uuid) -> AppResult<Option<Product>>;

    async fn warehouse(&mut self, id: Uuid) -> AppResult<Option<Warehouse>>;

    // Stock

    /// Every warehouse row of a product, ordered by warehouse name
    async fn stock_levels(&mut self, product_id: Uuid) -> AppResult<Vec<WarehouseStockLevel>>;

    async fn stock_level(
        &mut self,
        product_id: Uuid,
        warehouse_id: Uuid,
    ) -> AppResult<Option<WarehouseStock>>;

    async fn set_product_stock(&mut self, product_id: Uuid, quantity: i32) -> AppResult<()>;

    /// Write an absolute quantity, creating the row if absent
    async fn upsert_stock_level(
        &mut self,
        product_id: Uuid,
        warehouse_id: Uuid,
        quantity: i32,
    ) -> AppResult<()>;

    // Ledger

    async fn insert_ledger_entry(&mut self, entry: NewLedgerEntry) -> AppResult<StockLedgerEntry>;

    /// Newest first
    async fn ledger_entries(&mut self, filter: &LedgerFilter) -> AppResult<Vec<StockLedgerEntry>>;

    /// Products whose aggregate differs from the sum of their warehouse rows
    async fn stock_drift(&mut self) -> AppResult<Vec<StockDrift>>;

    async fn commit(self) -> AppResult<()>;
}
