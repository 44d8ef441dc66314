//! Products, warehouses and per-warehouse stock

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A stocked product
///
/// `current_stock` is the aggregate across every warehouse and is only
/// written by the stock mutator while an operation is validated.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: Uuid,
    pub sku: String,
    pub name: String,
    pub category_id: Option<Uuid>,
    pub unit_of_measure: String,
    pub reorder_level: i32,
    pub current_stock: i32,
    pub cost_price: Decimal,
    pub selling_price: Decimal,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Stock at or below the reorder threshold
    pub fn is_low_stock(&self) -> bool {
        self.current_stock <= self.reorder_level
    }

    /// Valuation of the aggregate stock at cost
    pub fn stock_value(&self) -> Decimal {
        Decimal::from(self.current_stock) * self.cost_price
    }
}

/// A physical storage location
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Warehouse {
    pub id: Uuid,
    pub name: String,
    pub location: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// Quantity of one product held in one warehouse
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct WarehouseStock {
    pub product_id: Uuid,
    pub warehouse_id: Uuid,
    pub quantity: i32,
    pub updated_at: DateTime<Utc>,
}

/// Stock row joined with its warehouse, as shown on the product page
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct WarehouseStockLevel {
    pub warehouse_id: Uuid,
    pub warehouse_name: String,
    pub location: Option<String>,
    pub quantity: i32,
    pub updated_at: DateTime<Utc>,
}

/// A product whose aggregate disagrees with its warehouse rows
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StockDrift {
    pub product_id: Uuid,
    pub sku: String,
    pub current_stock: i32,
    pub warehouse_total: i64,
}

impl StockDrift {
    pub fn discrepancy(&self) -> i64 {
        i64::from(self.current_stock) - self.warehouse_total
    }
}
