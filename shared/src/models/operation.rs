//! Stock operations: receipts, deliveries, transfers and adjustments
//!
//! All four share a draft -> done lifecycle. Validation is the only way to
//! reach `done`, and it is the only path that touches stock.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::types::{DateRange, Pagination};

/// Lifecycle status of an operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationStatus {
    Draft,
    Waiting,
    Ready,
    Done,
    Cancelled,
}

impl OperationStatus {
    pub const ALL: [OperationStatus; 5] = [
        OperationStatus::Draft,
        OperationStatus::Waiting,
        OperationStatus::Ready,
        OperationStatus::Done,
        OperationStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OperationStatus::Draft => "draft",
            OperationStatus::Waiting => "waiting",
            OperationStatus::Ready => "ready",
            OperationStatus::Done => "done",
            OperationStatus::Cancelled => "cancelled",
        }
    }

    /// `done` and `cancelled` never change again
    pub fn is_terminal(&self) -> bool {
        matches!(self, OperationStatus::Done | OperationStatus::Cancelled)
    }
}

impl std::fmt::Display for OperationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown operation status: {0}")]
pub struct ParseStatusError(pub String);

impl std::str::FromStr for OperationStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OperationStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| ParseStatusError(s.to_string()))
    }
}

/// The four operation types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    Receipt,
    Delivery,
    Transfer,
    Adjustment,
}

const FULL_LIFECYCLE: &[OperationStatus] = &OperationStatus::ALL;
const ADJUSTMENT_LIFECYCLE: &[OperationStatus] = &[
    OperationStatus::Draft,
    OperationStatus::Done,
    OperationStatus::Cancelled,
];

impl OperationKind {
    pub const ALL: [OperationKind; 4] = [
        OperationKind::Receipt,
        OperationKind::Delivery,
        OperationKind::Transfer,
        OperationKind::Adjustment,
    ];

    /// Reference number prefix
    pub fn prefix(&self) -> &'static str {
        match self {
            OperationKind::Receipt => "REC",
            OperationKind::Delivery => "DEL",
            OperationKind::Transfer => "TRF",
            OperationKind::Adjustment => "ADJ",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            OperationKind::Receipt => "Receipt",
            OperationKind::Delivery => "Delivery",
            OperationKind::Transfer => "Transfer",
            OperationKind::Adjustment => "Adjustment",
        }
    }

    /// Receipts, deliveries and transfers carry line items
    pub fn has_items(&self) -> bool {
        !matches!(self, OperationKind::Adjustment)
    }

    pub fn statuses(&self) -> &'static [OperationStatus] {
        match self {
            OperationKind::Adjustment => ADJUSTMENT_LIFECYCLE,
            _ => FULL_LIFECYCLE,
        }
    }

    pub fn supports_status(&self, status: OperationStatus) -> bool {
        self.statuses().contains(&status)
    }

    /// Statuses an operation may be created in
    pub fn can_create_as(&self, status: OperationStatus) -> bool {
        match self {
            OperationKind::Adjustment => status == OperationStatus::Draft,
            _ => matches!(
                status,
                OperationStatus::Draft | OperationStatus::Waiting | OperationStatus::Ready
            ),
        }
    }

    pub fn can_validate(&self, status: OperationStatus) -> bool {
        match self {
            OperationKind::Adjustment => status == OperationStatus::Draft,
            _ => matches!(status, OperationStatus::Draft | OperationStatus::Waiting),
        }
    }

    /// Manual status changes; `done` is reserved for validation
    pub fn can_transition(&self, from: OperationStatus, to: OperationStatus) -> bool {
        if from.is_terminal() || to == OperationStatus::Done || from == to {
            return false;
        }
        self.supports_status(from) && self.supports_status(to)
    }

    pub fn can_delete(&self, status: OperationStatus) -> bool {
        matches!(status, OperationStatus::Draft | OperationStatus::Cancelled)
    }

    /// Header edits stop once the operation is done or cancelled
    pub fn can_edit(&self, status: OperationStatus) -> bool {
        !status.is_terminal() && self.supports_status(status)
    }
}

impl std::fmt::Display for OperationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// A line item of a receipt, delivery or transfer
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OperationItem {
    pub id: Uuid,
    pub operation_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    /// Receipts and deliveries only
    pub unit_price: Option<Decimal>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Receipt {
    pub id: Uuid,
    pub receipt_number: String,
    pub warehouse_id: Uuid,
    pub supplier_name: String,
    pub status: OperationStatus,
    pub notes: Option<String>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub validated_at: Option<DateTime<Utc>>,
    pub items: Vec<OperationItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Delivery {
    pub id: Uuid,
    pub delivery_number: String,
    /// Without a warehouse the delivery is fulfilled from every warehouse
    pub warehouse_id: Option<Uuid>,
    pub customer_name: String,
    pub status: OperationStatus,
    pub notes: Option<String>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub validated_at: Option<DateTime<Utc>>,
    pub items: Vec<OperationItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Transfer {
    pub id: Uuid,
    pub transfer_number: String,
    pub from_warehouse_id: Uuid,
    pub to_warehouse_id: Uuid,
    pub status: OperationStatus,
    pub notes: Option<String>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub validated_at: Option<DateTime<Utc>>,
    pub items: Vec<OperationItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Adjustment {
    pub id: Uuid,
    pub adjustment_number: String,
    pub warehouse_id: Uuid,
    pub product_id: Uuid,
    /// Physical count
    pub counted_quantity: i32,
    /// Warehouse quantity when the adjustment was created
    pub system_quantity: i32,
    pub difference: i32,
    pub reason: Option<String>,
    pub status: OperationStatus,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub validated_at: Option<DateTime<Utc>>,
}

/// Any stored operation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Operation {
    Receipt(Receipt),
    Delivery(Delivery),
    Transfer(Transfer),
    Adjustment(Adjustment),
}

impl Operation {
    pub fn kind(&self) -> OperationKind {
        match self {
            Operation::Receipt(_) => OperationKind::Receipt,
            Operation::Delivery(_) => OperationKind::Delivery,
            Operation::Transfer(_) => OperationKind::Transfer,
            Operation::Adjustment(_) => OperationKind::Adjustment,
        }
    }

    pub fn id(&self) -> Uuid {
        match self {
            Operation::Receipt(r) => r.id,
            Operation::Delivery(d) => d.id,
            Operation::Transfer(t) => t.id,
            Operation::Adjustment(a) => a.id,
        }
    }

    pub fn reference_number(&self) -> &str {
        match self {
            Operation::Receipt(r) => &r.receipt_number,
            Operation::Delivery(d) => &d.delivery_number,
            Operation::Transfer(t) => &t.transfer_number,
            Operation::Adjustment(a) => &a.adjustment_number,
        }
    }

    pub fn status(&self) -> OperationStatus {
        match self {
            Operation::Receipt(r) => r.status,
            Operation::Delivery(d) => d.status,
            Operation::Transfer(t) => t.status,
            Operation::Adjustment(a) => a.status,
        }
    }

    pub fn validated_at(&self) -> Option<DateTime<Utc>> {
        match self {
            Operation::Receipt(r) => r.validated_at,
            Operation::Delivery(d) => d.validated_at,
            Operation::Transfer(t) => t.validated_at,
            Operation::Adjustment(a) => a.validated_at,
        }
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        match self {
            Operation::Receipt(r) => r.created_at,
            Operation::Delivery(d) => d.created_at,
            Operation::Transfer(t) => t.created_at,
            Operation::Adjustment(a) => a.created_at,
        }
    }

    pub fn items(&self) -> &[OperationItem] {
        match self {
            Operation::Receipt(r) => &r.items,
            Operation::Delivery(d) => &d.items,
            Operation::Transfer(t) => &t.items,
            Operation::Adjustment(_) => &[],
        }
    }

    /// Warehouses the operation references, used by list filters
    pub fn warehouse_ids(&self) -> Vec<Uuid> {
        match self {
            Operation::Receipt(r) => vec![r.warehouse_id],
            Operation::Delivery(d) => d.warehouse_id.into_iter().collect(),
            Operation::Transfer(t) => vec![t.from_warehouse_id, t.to_warehouse_id],
            Operation::Adjustment(a) => vec![a.warehouse_id],
        }
    }

    /// Supplier or customer name, if the type has one
    pub fn counterparty(&self) -> Option<&str> {
        match self {
            Operation::Receipt(r) => Some(&r.supplier_name),
            Operation::Delivery(d) => Some(&d.customer_name),
            _ => None,
        }
    }

    pub fn set_status(&mut self, status: OperationStatus, validated_at: Option<DateTime<Utc>>) {
        let (current, stamp) = match self {
            Operation::Receipt(r) => (&mut r.status, &mut r.validated_at),
            Operation::Delivery(d) => (&mut d.status, &mut d.validated_at),
            Operation::Transfer(t) => (&mut t.status, &mut t.validated_at),
            Operation::Adjustment(a) => (&mut a.status, &mut a.validated_at),
        };
        *current = status;
        if validated_at.is_some() {
            *stamp = validated_at;
        }
    }
}

/// Line item to insert alongside a new operation
#[derive(Debug, Clone, PartialEq)]
pub struct NewOperationItem {
    pub product_id: Uuid,
    pub quantity: i32,
    pub unit_price: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewReceipt {
    pub receipt_number: String,
    pub warehouse_id: Uuid,
    pub supplier_name: String,
    pub status: OperationStatus,
    pub notes: Option<String>,
    pub created_by: Uuid,
    pub items: Vec<NewOperationItem>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewDelivery {
    pub delivery_number: String,
    pub warehouse_id: Option<Uuid>,
    pub customer_name: String,
    pub status: OperationStatus,
    pub notes: Option<String>,
    pub created_by: Uuid,
    pub items: Vec<NewOperationItem>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewTransfer {
    pub transfer_number: String,
    pub from_warehouse_id: Uuid,
    pub to_warehouse_id: Uuid,
    pub status: OperationStatus,
    pub notes: Option<String>,
    pub created_by: Uuid,
    pub items: Vec<NewOperationItem>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAdjustment {
    pub adjustment_number: String,
    pub warehouse_id: Uuid,
    pub product_id: Uuid,
    pub counted_quantity: i32,
    pub system_quantity: i32,
    pub reason: Option<String>,
    pub created_by: Uuid,
}

impl NewAdjustment {
    pub fn difference(&self) -> i32 {
        self.counted_quantity - self.system_quantity
    }
}

/// Operation to insert
#[derive(Debug, Clone, PartialEq)]
pub enum NewOperation {
    Receipt(NewReceipt),
    Delivery(NewDelivery),
    Transfer(NewTransfer),
    Adjustment(NewAdjustment),
}

impl NewOperation {
    pub fn kind(&self) -> OperationKind {
        match self {
            NewOperation::Receipt(_) => OperationKind::Receipt,
            NewOperation::Delivery(_) => OperationKind::Delivery,
            NewOperation::Transfer(_) => OperationKind::Transfer,
            NewOperation::Adjustment(_) => OperationKind::Adjustment,
        }
    }

    pub fn reference_number(&self) -> &str {
        match self {
            NewOperation::Receipt(r) => &r.receipt_number,
            NewOperation::Delivery(d) => &d.delivery_number,
            NewOperation::Transfer(t) => &t.transfer_number,
            NewOperation::Adjustment(a) => &a.adjustment_number,
        }
    }
}

/// List filters shared by the four operation types
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OperationFilter {
    pub status: Option<OperationStatus>,
    pub warehouse_id: Option<Uuid>,
    /// Adjustments only
    pub product_id: Option<Uuid>,
    /// Substring of the reference number or counterparty name
    pub search: Option<String>,
    pub dates: DateRange,
    pub page: Pagination,
}

impl OperationFilter {
    pub fn matches(&self, operation: &Operation) -> bool {
        if self.status.is_some_and(|s| operation.status() != s) {
            return false;
        }
        if let Some(warehouse_id) = self.warehouse_id {
            if !operation.warehouse_ids().contains(&warehouse_id) {
                return false;
            }
        }
        if let Some(product_id) = self.product_id {
            match operation {
                Operation::Adjustment(a) if a.product_id == product_id => {}
                Operation::Adjustment(_) => return false,
                _ => {}
            }
        }
        if let Some(term) = self.search.as_deref().map(str::to_lowercase) {
            let in_reference = operation.reference_number().to_lowercase().contains(&term);
            let in_counterparty = operation
                .counterparty()
                .is_some_and(|c| c.to_lowercase().contains(&term));
            if !in_reference && !in_counterparty {
                return false;
            }
        }
        self.dates.contains(operation.created_at())
    }
}
