//! PostgreSQL store

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use uuid::Uuid;

use shared::{
    Adjustment, Delivery, LedgerFilter, LedgerOperationType, NewLedgerEntry, NewOperation,
    NewOperationItem, Operation, OperationFilter, OperationItem, OperationKind, OperationStatus,
    Product, Receipt, StockDrift, StockLedgerEntry, Transfer, Warehouse, WarehouseStock,
    WarehouseStockLevel,
};

use super::{InventoryStore, StoreTx};
use crate::error::{AppError, AppResult};

/// Store backed by a PostgreSQL pool
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl InventoryStore for PgStore {
    type Tx = PgTx;

    async fn begin(&self) -> AppResult<PgTx> {
        let tx = self.pool.begin().await?;
        Ok(PgTx { tx })
    }
}

/// Transaction over a [`PgStore`]; rolled back on drop unless committed
pub struct PgTx {
    tx: Transaction<'static, Postgres>,
}

/// Table names for an operation kind
struct Tables {
    header: &'static str,
    number: &'static str,
    /// (items table, foreign key column)
    items: Option<(&'static str, &'static str)>,
}

fn tables(kind: OperationKind) -> Tables {
    match kind {
        OperationKind::Receipt => Tables {
            header: "receipts",
            number: "receipt_number",
            items: Some(("receipt_items", "receipt_id")),
        },
        OperationKind::Delivery => Tables {
            header: "deliveries",
            number: "delivery_number",
            items: Some(("delivery_items", "delivery_id")),
        },
        OperationKind::Transfer => Tables {
            header: "transfers",
            number: "transfer_number",
            items: Some(("transfer_items", "transfer_id")),
        },
        OperationKind::Adjustment => Tables {
            header: "adjustments",
            number: "adjustment_number",
            items: None,
        },
    }
}

const RECEIPT_COLUMNS: &str = "id, receipt_number, warehouse_id, supplier_name, status, notes, \
     created_by, created_at, validated_at";
const DELIVERY_COLUMNS: &str = "id, delivery_number, warehouse_id, customer_name, status, notes, \
     created_by, created_at, validated_at";
const TRANSFER_COLUMNS: &str = "id, transfer_number, from_warehouse_id, to_warehouse_id, status, \
     notes, created_by, created_at, validated_at";
const ADJUSTMENT_COLUMNS: &str = "id, adjustment_number, warehouse_id, product_id, \
     counted_quantity, system_quantity, difference, reason, status, created_by, created_at, \
     validated_at";
const PRODUCT_COLUMNS: &str = "id, sku, name, category_id, unit_of_measure, reorder_level, \
     current_stock, cost_price, selling_price, is_active, created_at, updated_at";
const LEDGER_COLUMNS: &str = "id, product_id, warehouse_id, operation_type, reference_number, \
     quantity_change, quantity_after, created_by, created_at, notes";

fn parse_status(value: &str) -> AppResult<OperationStatus> {
    value
        .parse()
        .map_err(|e: shared::ParseStatusError| AppError::Internal(e.to_string()))
}

// ============================================================================
// Rows
// ============================================================================

#[derive(Debug, FromRow)]
struct ReceiptRow {
    id: Uuid,
    receipt_number: String,
    warehouse_id: Uuid,
    supplier_name: String,
    status: String,
    notes: Option<String>,
    created_by: Uuid,
    created_at: DateTime<Utc>,
    validated_at: Option<DateTime<Utc>>,
}

impl ReceiptRow {
    fn into_operation(self, items: Vec<OperationItem>) -> AppResult<Operation> {
        Ok(Operation::Receipt(Receipt {
            id: self.id,
            receipt_number: self.receipt_number,
            warehouse_id: self.warehouse_id,
            supplier_name: self.supplier_name,
            status: parse_status(&self.status)?,
            notes: self.notes,
            created_by: self.created_by,
            created_at: self.created_at,
            validated_at: self.validated_at,
            items,
        }))
    }
}

#[derive(Debug, FromRow)]
struct DeliveryRow {
    id: Uuid,
    delivery_number: String,
    warehouse_id: Option<Uuid>,
    customer_name: String,
    status: String,
    notes: Option<String>,
    created_by: Uuid,
    created_at: DateTime<Utc>,
    validated_at: Option<DateTime<Utc>>,
}

impl DeliveryRow {
    fn into_operation(self, items: Vec<OperationItem>) -> AppResult<Operation> {
        Ok(Operation::Delivery(Delivery {
            id: self.id,
            delivery_number: self.delivery_number,
            warehouse_id: self.warehouse_id,
            customer_name: self.customer_name,
            status: parse_status(&self.status)?,
            notes: self.notes,
            created_by: self.created_by,
            created_at: self.created_at,
            validated_at: self.validated_at,
            items,
        }))
    }
}

#[derive(Debug, FromRow)]
struct TransferRow {
    id: Uuid,
    transfer_number: String,
    from_warehouse_id: Uuid,
    to_warehouse_id: Uuid,
    status: String,
    notes: Option<String>,
    created_by: Uuid,
    created_at: DateTime<Utc>,
    validated_at: Option<DateTime<Utc>>,
}

impl TransferRow {
    fn into_operation(self, items: Vec<OperationItem>) -> AppResult<Operation> {
        Ok(Operation::Transfer(Transfer {
            id: self.id,
            transfer_number: self.transfer_number,
            from_warehouse_id: self.from_warehouse_id,
            to_warehouse_id: self.to_warehouse_id,
            status: parse_status(&self.status)?,
            notes: self.notes,
            created_by: self.created_by,
            created_at: self.created_at,
            validated_at: self.validated_at,
            items,
        }))
    }
}

#[derive(Debug, FromRow)]
struct AdjustmentRow {
    id: Uuid,
    adjustment_number: String,
    warehouse_id: Uuid,
    product_id: Uuid,
    counted_quantity: i32,
    system_quantity: i32,
    difference: i32,
    reason: Option<String>,
    status: String,
    created_by: Uuid,
    created_at: DateTime<Utc>,
    validated_at: Option<DateTime<Utc>>,
}

impl AdjustmentRow {
    fn into_operation(self) -> AppResult<Operation> {
        Ok(Operation::Adjustment(Adjustment {
            id: self.id,
            adjustment_number: self.adjustment_number,
            warehouse_id: self.warehouse_id,
            product_id: self.product_id,
            counted_quantity: self.counted_quantity,
            system_quantity: self.system_quantity,
            difference: self.difference,
            reason: self.reason,
            status: parse_status(&self.status)?,
            created_by: self.created_by,
            created_at: self.created_at,
            validated_at: self.validated_at,
        }))
    }
}

#[derive(Debug, FromRow)]
struct ItemRow {
    id: Uuid,
    operation_id: Uuid,
    product_id: Uuid,
    quantity: i32,
    unit_price: Option<Decimal>,
    created_at: DateTime<Utc>,
}

impl From<ItemRow> for OperationItem {
    fn from(row: ItemRow) -> Self {
        Self {
            id: row.id,
            operation_id: row.operation_id,
            product_id: row.product_id,
            quantity: row.quantity,
            unit_price: row.unit_price,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct ProductRow {
    id: Uuid,
    sku: String,
    name: String,
    category_id: Option<Uuid>,
    unit_of_measure: String,
    reorder_level: i32,
    current_stock: i32,
    cost_price: Decimal,
    selling_price: Decimal,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Self {
            id: row.id,
            sku: row.sku,
            name: row.name,
            category_id: row.category_id,
            unit_of_measure: row.unit_of_measure,
            reorder_level: row.reorder_level,
            current_stock: row.current_stock,
            cost_price: row.cost_price,
            selling_price: row.selling_price,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct WarehouseRow {
    id: Uuid,
    name: String,
    location: Option<String>,
    is_active: bool,
    created_at: DateTime<Utc>,
}

impl From<WarehouseRow> for Warehouse {
    fn from(row: WarehouseRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            location: row.location,
            is_active: row.is_active,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct StockRow {
    product_id: Uuid,
    warehouse_id: Uuid,
    quantity: i32,
    updated_at: DateTime<Utc>,
}

impl From<StockRow> for WarehouseStock {
    fn from(row: StockRow) -> Self {
        Self {
            product_id: row.product_id,
            warehouse_id: row.warehouse_id,
            quantity: row.quantity,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct StockLevelRow {
    warehouse_id: Uuid,
    warehouse_name: String,
    location: Option<String>,
    quantity: i32,
    updated_at: DateTime<Utc>,
}

impl From<StockLevelRow> for WarehouseStockLevel {
    fn from(row: StockLevelRow) -> Self {
        Self {
            warehouse_id: row.warehouse_id,
            warehouse_name: row.warehouse_name,
            location: row.location,
            quantity: row.quantity,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct LedgerRow {
    id: Uuid,
    product_id: Uuid,
    warehouse_id: Uuid,
    operation_type: String,
    reference_number: String,
    quantity_change: i32,
    quantity_after: i32,
    created_by: Uuid,
    created_at: DateTime<Utc>,
    notes: Option<String>,
}

impl TryFrom<LedgerRow> for StockLedgerEntry {
    type Error = AppError;

    fn try_from(row: LedgerRow) -> AppResult<Self> {
        let operation_type = row
            .operation_type
            .parse::<LedgerOperationType>()
            .map_err(|e| AppError::Internal(e.to_string()))?;

        Ok(Self {
            id: row.id,
            product_id: row.product_id,
            warehouse_id: row.warehouse_id,
            operation_type,
            reference_number: row.reference_number,
            quantity_change: row.quantity_change,
            quantity_after: row.quantity_after,
            created_by: row.created_by,
            created_at: row.created_at,
            notes: row.notes,
        })
    }
}

#[derive(Debug, FromRow)]
struct DriftRow {
    product_id: Uuid,
    sku: String,
    current_stock: i32,
    warehouse_total: i64,
}

impl From<DriftRow> for StockDrift {
    fn from(row: DriftRow) -> Self {
        Self {
            product_id: row.product_id,
            sku: row.sku,
            current_stock: row.current_stock,
            warehouse_total: row.warehouse_total,
        }
    }
}

/// Map a unique violation on the reference number column
fn duplicate_or(err: sqlx::Error, number: &str) -> AppError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            AppError::DuplicateNumber(number.to_string())
        }
        _ => AppError::DatabaseError(err),
    }
}

fn search_pattern(search: Option<&str>) -> Option<String> {
    search
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| format!("%{}%", s.replace('%', "\\%").replace('_', "\\_")))
}

// ============================================================================
// Queries
// ============================================================================

impl PgTx {
    /// Items of several operations, grouped by operation id
    async fn items_for(
        &mut self,
        kind: OperationKind,
        ids: &[Uuid],
    ) -> AppResult<HashMap<Uuid, Vec<OperationItem>>> {
        let Some((table, fk)) = tables(kind).items else {
            return Ok(HashMap::new());
        };
        let price = if kind == OperationKind::Transfer {
            "NULL::NUMERIC AS unit_price"
        } else {
            "unit_price"
        };

        let sql = format!(
            "SELECT id, {fk} AS operation_id, product_id, quantity, {price}, created_at \
             FROM {table} WHERE {fk} = ANY($1) ORDER BY seq"
        );
        let rows = sqlx::query_as::<_, ItemRow>(&sql)
            .bind(ids)
            .fetch_all(&mut *self.tx)
            .await?;

        let mut grouped: HashMap<Uuid, Vec<OperationItem>> = HashMap::new();
        for row in rows {
            grouped.entry(row.operation_id).or_default().push(row.into());
        }
        Ok(grouped)
    }

    async fn insert_items(
        &mut self,
        kind: OperationKind,
        operation_id: Uuid,
        items: &[NewOperationItem],
    ) -> AppResult<Vec<OperationItem>> {
        let Some((table, fk)) = tables(kind).items else {
            return Ok(Vec::new());
        };

        let mut stored = Vec::with_capacity(items.len());
        for item in items {
            let row = if kind == OperationKind::Transfer {
                let sql = format!(
                    "INSERT INTO {table} ({fk}, product_id, quantity) VALUES ($1, $2, $3) \
                     RETURNING id, {fk} AS operation_id, product_id, quantity, \
                     NULL::NUMERIC AS unit_price, created_at"
                );
                sqlx::query_as::<_, ItemRow>(&sql)
                    .bind(operation_id)
                    .bind(item.product_id)
                    .bind(item.quantity)
                    .fetch_one(&mut *self.tx)
                    .await?
            } else {
                let sql = format!(
                    "INSERT INTO {table} ({fk}, product_id, quantity, unit_price) \
                     VALUES ($1, $2, $3, $4) \
                     RETURNING id, {fk} AS operation_id, product_id, quantity, unit_price, created_at"
                );
                sqlx::query_as::<_, ItemRow>(&sql)
                    .bind(operation_id)
                    .bind(item.product_id)
                    .bind(item.quantity)
                    .bind(item.unit_price)
                    .fetch_one(&mut *self.tx)
                    .await?
            };
            stored.push(row.into());
        }
        Ok(stored)
    }
}

#[async_trait]
impl StoreTx for PgTx {
    async fn fetch_operation(
        &mut self,
        kind: OperationKind,
        id: Uuid,
        lock: bool,
    ) -> AppResult<Option<Operation>> {
        let suffix = if lock { " FOR UPDATE" } else { "" };

        let operation = match kind {
            OperationKind::Receipt => {
                let sql = format!("SELECT {RECEIPT_COLUMNS} FROM receipts WHERE id = $1{suffix}");
                let row = sqlx::query_as::<_, ReceiptRow>(&sql)
                    .bind(id)
                    .fetch_optional(&mut *self.tx)
                    .await?;
                match row {
                    Some(row) => {
                        let mut items = self.items_for(kind, &[id]).await?;
                        Some(row.into_operation(items.remove(&id).unwrap_or_default())?)
                    }
                    None => None,
                }
            }
            OperationKind::Delivery => {
                let sql = format!("SELECT {DELIVERY_COLUMNS} FROM deliveries WHERE id = $1{suffix}");
                let row = sqlx::query_as::<_, DeliveryRow>(&sql)
                    .bind(id)
                    .fetch_optional(&mut *self.tx)
                    .await?;
                match row {
                    Some(row) => {
                        let mut items = self.items_for(kind, &[id]).await?;
                        Some(row.into_operation(items.remove(&id).unwrap_or_default())?)
                    }
                    None => None,
                }
            }
            OperationKind::Transfer => {
                let sql = format!("SELECT {TRANSFER_COLUMNS} FROM transfers WHERE id = $1{suffix}");
                let row = sqlx::query_as::<_, TransferRow>(&sql)
                    .bind(id)
                    .fetch_optional(&mut *self.tx)
                    .await?;
                match row {
                    Some(row) => {
                        let mut items = self.items_for(kind, &[id]).await?;
                        Some(row.into_operation(items.remove(&id).unwrap_or_default())?)
                    }
                    None => None,
                }
            }
            OperationKind::Adjustment => {
                let sql =
                    format!("SELECT {ADJUSTMENT_COLUMNS} FROM adjustments WHERE id = $1{suffix}");
                sqlx::query_as::<_, AdjustmentRow>(&sql)
                    .bind(id)
                    .fetch_optional(&mut *self.tx)
                    .await?
                    .map(AdjustmentRow::into_operation)
                    .transpose()?
            }
        };

        Ok(operation)
    }

    async fn insert_operation(&mut self, operation: NewOperation) -> AppResult<Operation> {
        let kind = operation.kind();

        match operation {
            NewOperation::Receipt(r) => {
                let sql = format!(
                    "INSERT INTO receipts (receipt_number, warehouse_id, supplier_name, status, notes, created_by) \
                     VALUES ($1, $2, $3, $4, $5, $6) RETURNING {RECEIPT_COLUMNS}"
                );
                let row = sqlx::query_as::<_, ReceiptRow>(&sql)
                    .bind(&r.receipt_number)
                    .bind(r.warehouse_id)
                    .bind(&r.supplier_name)
                    .bind(r.status.as_str())
                    .bind(&r.notes)
                    .bind(r.created_by)
                    .fetch_one(&mut *self.tx)
                    .await
                    .map_err(|e| duplicate_or(e, &r.receipt_number))?;
                let items = self.insert_items(kind, row.id, &r.items).await?;
                row.into_operation(items)
            }
            NewOperation::Delivery(d) => {
                let sql = format!(
                    "INSERT INTO deliveries (delivery_number, warehouse_id, customer_name, status, notes, created_by) \
                     VALUES ($1, $2, $3, $4, $5, $6) RETURNING {DELIVERY_COLUMNS}"
                );
                let row = sqlx::query_as::<_, DeliveryRow>(&sql)
                    .bind(&d.delivery_number)
                    .bind(d.warehouse_id)
                    .bind(&d.customer_name)
                    .bind(d.status.as_str())
                    .bind(&d.notes)
                    .bind(d.created_by)
                    .fetch_one(&mut *self.tx)
                    .await
                    .map_err(|e| duplicate_or(e, &d.delivery_number))?;
                let items = self.insert_items(kind, row.id, &d.items).await?;
                row.into_operation(items)
            }
            NewOperation::Transfer(t) => {
                let sql = format!(
                    "INSERT INTO transfers (transfer_number, from_warehouse_id, to_warehouse_id, status, notes, created_by) \
                     VALUES ($1, $2, $3, $4, $5, $6) RETURNING {TRANSFER_COLUMNS}"
                );
                let row = sqlx::query_as::<_, TransferRow>(&sql)
                    .bind(&t.transfer_number)
                    .bind(t.from_warehouse_id)
                    .bind(t.to_warehouse_id)
                    .bind(t.status.as_str())
                    .bind(&t.notes)
                    .bind(t.created_by)
                    .fetch_one(&mut *self.tx)
                    .await
                    .map_err(|e| duplicate_or(e, &t.transfer_number))?;
                let items = self.insert_items(kind, row.id, &t.items).await?;
                row.into_operation(items)
            }
            NewOperation::Adjustment(a) => {
                let sql = format!(
                    "INSERT INTO adjustments (adjustment_number, warehouse_id, product_id, counted_quantity, \
                     system_quantity, difference, reason, status, created_by) \
                     VALUES ($1, $2, $3, $4, $5, $6, $7, 'draft', $8) RETURNING {ADJUSTMENT_COLUMNS}"
                );
                sqlx::query_as::<_, AdjustmentRow>(&sql)
                    .bind(&a.adjustment_number)
                    .bind(a.warehouse_id)
                    .bind(a.product_id)
                    .bind(a.counted_quantity)
                    .bind(a.system_quantity)
                    .bind(a.difference())
                    .bind(&a.reason)
                    .bind(a.created_by)
                    .fetch_one(&mut *self.tx)
                    .await
                    .map_err(|e| duplicate_or(e, &a.adjustment_number))?
                    .into_operation()
            }
        }
    }

    async fn list_operations(
        &mut self,
        kind: OperationKind,
        filter: &OperationFilter,
    ) -> AppResult<Vec<Operation>> {
        let status = filter.status.map(|s| s.as_str());
        let search = search_pattern(filter.search.as_deref());
        let from = filter.dates.start();
        let to = filter.dates.end_exclusive();
        let limit = i64::from(filter.page.limit);
        let offset = i64::from(filter.page.offset);

        // $1 status, $2 warehouse, $3 search, $4 from, $5 to, $6 limit, $7 offset
        let (columns, header, warehouse_clause, search_clause) = match kind {
            OperationKind::Receipt => (
                RECEIPT_COLUMNS,
                "receipts",
                "warehouse_id = $2",
                "receipt_number ILIKE $3 OR supplier_name ILIKE $3",
            ),
            OperationKind::Delivery => (
                DELIVERY_COLUMNS,
                "deliveries",
                "warehouse_id = $2",
                "delivery_number ILIKE $3 OR customer_name ILIKE $3",
            ),
            OperationKind::Transfer => (
                TRANSFER_COLUMNS,
                "transfers",
                "from_warehouse_id = $2 OR to_warehouse_id = $2",
                "transfer_number ILIKE $3",
            ),
            OperationKind::Adjustment => (
                ADJUSTMENT_COLUMNS,
                "adjustments",
                "warehouse_id = $2",
                "adjustment_number ILIKE $3",
            ),
        };
        let product_clause = if kind == OperationKind::Adjustment {
            " AND ($8::uuid IS NULL OR product_id = $8)"
        } else {
            ""
        };

        let sql = format!(
            "SELECT {columns} FROM {header} \
             WHERE ($1::varchar IS NULL OR status = $1) \
               AND ($2::uuid IS NULL OR {warehouse_clause}) \
               AND ($3::text IS NULL OR {search_clause}) \
               AND ($4::timestamptz IS NULL OR created_at >= $4) \
               AND ($5::timestamptz IS NULL OR created_at < $5){product_clause} \
             ORDER BY created_at DESC, id \
             LIMIT $6 OFFSET $7"
        );

        macro_rules! fetch {
            ($row:ty) => {
                sqlx::query_as::<_, $row>(&sql)
                    .bind(status)
                    .bind(filter.warehouse_id)
                    .bind(&search)
                    .bind(from)
                    .bind(to)
                    .bind(limit)
                    .bind(offset)
            };
        }

        let operations = match kind {
            OperationKind::Receipt => {
                let rows = fetch!(ReceiptRow).fetch_all(&mut *self.tx).await?;
                let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
                let mut items = self.items_for(kind, &ids).await?;
                rows.into_iter()
                    .map(|row| {
                        let own = items.remove(&row.id).unwrap_or_default();
                        row.into_operation(own)
                    })
                    .collect::<AppResult<Vec<_>>>()?
            }
            OperationKind::Delivery => {
                let rows = fetch!(DeliveryRow).fetch_all(&mut *self.tx).await?;
                let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
                let mut items = self.items_for(kind, &ids).await?;
                rows.into_iter()
                    .map(|row| {
                        let own = items.remove(&row.id).unwrap_or_default();
                        row.into_operation(own)
                    })
                    .collect::<AppResult<Vec<_>>>()?
            }
            OperationKind::Transfer => {
                let rows = fetch!(TransferRow).fetch_all(&mut *self.tx).await?;
                let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
                let mut items = self.items_for(kind, &ids).await?;
                rows.into_iter()
                    .map(|row| {
                        let own = items.remove(&row.id).unwrap_or_default();
                        row.into_operation(own)
                    })
                    .collect::<AppResult<Vec<_>>>()?
            }
            OperationKind::Adjustment => fetch!(AdjustmentRow)
                .bind(filter.product_id)
                .fetch_all(&mut *self.tx)
                .await?
                .into_iter()
                .map(AdjustmentRow::into_operation)
                .collect::<AppResult<Vec<_>>>()?,
        };

        Ok(operations)
    }

    async fn reference_exists(&mut self, kind: OperationKind, number: &str) -> AppResult<bool> {
        let Tables { header, number: column, .. } = tables(kind);
        let sql = format!("SELECT EXISTS(SELECT 1 FROM {header} WHERE {column} = $1)");
        let exists = sqlx::query_scalar::<_, bool>(&sql)
            .bind(number)
            .fetch_one(&mut *self.tx)
            .await?;
        Ok(exists)
    }

    async fn reference_numbers(
        &mut self,
        kind: OperationKind,
        prefix: &str,
    ) -> AppResult<Vec<String>> {
        let Tables { header, number, .. } = tables(kind);
        let sql = format!("SELECT {number} FROM {header} WHERE {number} LIKE $1");
        let numbers = sqlx::query_scalar::<_, String>(&sql)
            .bind(format!("{prefix}%"))
            .fetch_all(&mut *self.tx)
            .await?;
        Ok(numbers)
    }

    async fn set_status(
        &mut self,
        kind: OperationKind,
        id: Uuid,
        status: OperationStatus,
        validated_at: Option<DateTime<Utc>>,
    ) -> AppResult<()> {
        let header = tables(kind).header;
        let sql = format!(
            "UPDATE {header} SET status = $1, validated_at = COALESCE($2, validated_at) WHERE id = $3"
        );
        let result = sqlx::query(&sql)
            .bind(status.as_str())
            .bind(validated_at)
            .bind(id)
            .execute(&mut *self.tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(kind.label().to_string()));
        }
        Ok(())
    }

    async fn update_operation(&mut self, operation: &Operation) -> AppResult<()> {
        let result = match operation {
            Operation::Receipt(r) => {
                sqlx::query(
                    "UPDATE receipts SET receipt_number = $1, warehouse_id = $2, \
                     supplier_name = $3, notes = $4 WHERE id = $5",
                )
                .bind(&r.receipt_number)
                .bind(r.warehouse_id)
                .bind(&r.supplier_name)
                .bind(&r.notes)
                .bind(r.id)
                .execute(&mut *self.tx)
                .await
            }
            Operation::Delivery(d) => {
                sqlx::query(
                    "UPDATE deliveries SET delivery_number = $1, warehouse_id = $2, \
                     customer_name = $3, notes = $4 WHERE id = $5",
                )
                .bind(&d.delivery_number)
                .bind(d.warehouse_id)
                .bind(&d.customer_name)
                .bind(&d.notes)
                .bind(d.id)
                .execute(&mut *self.tx)
                .await
            }
            Operation::Transfer(t) => {
                sqlx::query(
                    "UPDATE transfers SET transfer_number = $1, from_warehouse_id = $2, \
                     to_warehouse_id = $3, notes = $4 WHERE id = $5",
                )
                .bind(&t.transfer_number)
                .bind(t.from_warehouse_id)
                .bind(t.to_warehouse_id)
                .bind(&t.notes)
                .bind(t.id)
                .execute(&mut *self.tx)
                .await
            }
            Operation::Adjustment(a) => {
                sqlx::query(
                    "UPDATE adjustments SET adjustment_number = $1, counted_quantity = $2, \
                     difference = $3, reason = $4 WHERE id = $5",
                )
                .bind(&a.adjustment_number)
                .bind(a.counted_quantity)
                .bind(a.difference)
                .bind(&a.reason)
                .bind(a.id)
                .execute(&mut *self.tx)
                .await
            }
        }
        .map_err(|e| duplicate_or(e, operation.reference_number()))?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(operation.kind().label().to_string()));
        }
        Ok(())
    }

    async fn append_note(&mut self, kind: OperationKind, id: Uuid, note: &str) -> AppResult<()> {
        if !kind.has_items() {
            return Ok(());
        }
        let header = tables(kind).header;
        let sql = format!(
            "UPDATE {header} \
             SET notes = CASE WHEN notes IS NULL OR notes = '' THEN $1 ELSE notes || E'\\n' || $1 END \
             WHERE id = $2"
        );
        sqlx::query(&sql)
            .bind(note)
            .bind(id)
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn delete_operation(&mut self, kind: OperationKind, id: Uuid) -> AppResult<bool> {
        let header = tables(kind).header;
        let sql = format!("DELETE FROM {header} WHERE id = $1");
        let result = sqlx::query(&sql)
            .bind(id)
            .execute(&mut *self.tx)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn product(&mut self, id: Uuid) -> AppResult<Option<Product>> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1");
        let row = sqlx::query_as::<_, ProductRow>(&sql)
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(row.map(Into::into))
    }

    async fn lock_product(&mut self, id: Uuid) -> AppResult<Option<Product>> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1 FOR UPDATE");
        let row = sqlx::query_as::<_, ProductRow>(&sql)
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(row.map(Into::into))
    }

    async fn warehouse(&mut self, id: Uuid) -> AppResult<Option<Warehouse>> {
        let row = sqlx::query_as::<_, WarehouseRow>(
            "SELECT id, name, location, is_active, created_at FROM warehouses WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(row.map(Into::into))
    }

    async fn stock_levels(&mut self, product_id: Uuid) -> AppResult<Vec<WarehouseStockLevel>> {
        let rows = sqlx::query_as::<_, StockLevelRow>(
            r#"
            SELECT ps.warehouse_id, w.name AS warehouse_name, w.location, ps.quantity, ps.updated_at
            FROM product_stock ps
            JOIN warehouses w ON w.id = ps.warehouse_id
            WHERE ps.product_id = $1
            ORDER BY w.name
            "#,
        )
        .bind(product_id)
        .fetch_all(&mut *self.tx)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn stock_level(
        &mut self,
        product_id: Uuid,
        warehouse_id: Uuid,
    ) -> AppResult<Option<WarehouseStock>> {
        let row = sqlx::query_as::<_, StockRow>(
            r#"
            SELECT product_id, warehouse_id, quantity, updated_at
            FROM product_stock
            WHERE product_id = $1 AND warehouse_id = $2
            "#,
        )
        .bind(product_id)
        .bind(warehouse_id)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(row.map(Into::into))
    }

    async fn set_product_stock(&mut self, product_id: Uuid, quantity: i32) -> AppResult<()> {
        let result = sqlx::query(
            "UPDATE products SET current_stock = $1, updated_at = NOW() WHERE id = $2",
        )
        .bind(quantity)
        .bind(product_id)
        .execute(&mut *self.tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Product".to_string()));
        }
        Ok(())
    }

    async fn upsert_stock_level(
        &mut self,
        product_id: Uuid,
        warehouse_id: Uuid,
        quantity: i32,
    ) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO product_stock (product_id, warehouse_id, quantity, updated_at)
            VALUES ($1, $2, $3, NOW())
            ON CONFLICT (product_id, warehouse_id)
            DO UPDATE SET quantity = EXCLUDED.quantity, updated_at = NOW()
            "#,
        )
        .bind(product_id)
        .bind(warehouse_id)
        .bind(quantity)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn insert_ledger_entry(&mut self, entry: NewLedgerEntry) -> AppResult<StockLedgerEntry> {
        let sql = format!(
            "INSERT INTO stock_ledger (product_id, warehouse_id, operation_type, reference_number, \
             quantity_change, quantity_after, created_by, notes) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING {LEDGER_COLUMNS}"
        );
        let row = sqlx::query_as::<_, LedgerRow>(&sql)
            .bind(entry.product_id)
            .bind(entry.warehouse_id)
            .bind(entry.operation_type.as_str())
            .bind(&entry.reference_number)
            .bind(entry.quantity_change)
            .bind(entry.quantity_after)
            .bind(entry.created_by)
            .bind(&entry.notes)
            .fetch_one(&mut *self.tx)
            .await?;
        row.try_into()
    }

    async fn ledger_entries(&mut self, filter: &LedgerFilter) -> AppResult<Vec<StockLedgerEntry>> {
        let sql = format!(
            "SELECT {LEDGER_COLUMNS} FROM stock_ledger \
             WHERE ($1::uuid IS NULL OR product_id = $1) \
               AND ($2::uuid IS NULL OR warehouse_id = $2) \
               AND ($3::varchar IS NULL OR operation_type = $3) \
               AND ($4::varchar IS NULL OR reference_number = $4) \
               AND ($5::timestamptz IS NULL OR created_at >= $5) \
               AND ($6::timestamptz IS NULL OR created_at < $6) \
             ORDER BY created_at DESC, seq DESC \
             LIMIT $7 OFFSET $8"
        );
        let rows = sqlx::query_as::<_, LedgerRow>(&sql)
            .bind(filter.product_id)
            .bind(filter.warehouse_id)
            .bind(filter.operation_type.map(|t| t.as_str()))
            .bind(&filter.reference_number)
            .bind(filter.dates.start())
            .bind(filter.dates.end_exclusive())
            .bind(i64::from(filter.page.limit))
            .bind(i64::from(filter.page.offset))
            .fetch_all(&mut *self.tx)
            .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn stock_drift(&mut self) -> AppResult<Vec<StockDrift>> {
        let rows = sqlx::query_as::<_, DriftRow>(
            r#"
            SELECT p.id AS product_id, p.sku, p.current_stock,
                   COALESCE(SUM(ps.quantity), 0)::BIGINT AS warehouse_total
            FROM products p
            LEFT JOIN product_stock ps ON ps.product_id = p.id
            GROUP BY p.id, p.sku, p.current_stock
            HAVING p.current_stock <> COALESCE(SUM(ps.quantity), 0)
            ORDER BY p.sku
            "#,
        )
        .fetch_all(&mut *self.tx)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn commit(self) -> AppResult<()> {
        self.tx.commit().await?;
        Ok(())
    }
}
