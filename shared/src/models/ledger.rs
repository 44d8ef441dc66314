//! Stock ledger (audit trail) models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::types::{DateRange, Pagination};

/// What caused a ledger entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerOperationType {
    Receipt,
    Delivery,
    TransferIn,
    TransferOut,
    Adjustment,
}

impl LedgerOperationType {
    pub const ALL: [LedgerOperationType; 5] = [
        LedgerOperationType::Receipt,
        LedgerOperationType::Delivery,
        LedgerOperationType::TransferIn,
        LedgerOperationType::TransferOut,
        LedgerOperationType::Adjustment,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LedgerOperationType::Receipt => "receipt",
            LedgerOperationType::Delivery => "delivery",
            LedgerOperationType::TransferIn => "transfer_in",
            LedgerOperationType::TransferOut => "transfer_out",
            LedgerOperationType::Adjustment => "adjustment",
        }
    }
}

impl std::fmt::Display for LedgerOperationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown ledger operation type: {0}")]
pub struct ParseLedgerTypeError(pub String);

impl std::str::FromStr for LedgerOperationType {
    type Err = ParseLedgerTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        LedgerOperationType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| ParseLedgerTypeError(s.to_string()))
    }
}

/// One immutable quantity change for a (product, warehouse) pair
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StockLedgerEntry {
    pub id: Uuid,
    pub product_id: Uuid,
    pub warehouse_id: Uuid,
    pub operation_type: LedgerOperationType,
    pub reference_number: String,
    pub quantity_change: i32,
    pub quantity_after: i32,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub notes: Option<String>,
}

/// Entry to append; id and timestamp are assigned by the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLedgerEntry {
    pub product_id: Uuid,
    pub warehouse_id: Uuid,
    pub operation_type: LedgerOperationType,
    pub reference_number: String,
    pub quantity_change: i32,
    pub quantity_after: i32,
    pub created_by: Uuid,
    pub notes: Option<String>,
}

/// History query filters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LedgerFilter {
    pub product_id: Option<Uuid>,
    pub warehouse_id: Option<Uuid>,
    pub operation_type: Option<LedgerOperationType>,
    pub reference_number: Option<String>,
    pub dates: DateRange,
    pub page: Pagination,
}

impl LedgerFilter {
    pub fn matches(&self, entry: &StockLedgerEntry) -> bool {
        self.product_id.map_or(true, |p| entry.product_id == p)
            && self.warehouse_id.map_or(true, |w| entry.warehouse_id == w)
            && self.operation_type.map_or(true, |t| entry.operation_type == t)
            && self
                .reference_number
                .as_deref()
                .map_or(true, |r| entry.reference_number == r)
            && self.dates.contains(entry.created_at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ledger_types_round_trip_through_strings() {
        for t in LedgerOperationType::ALL {
            assert_eq!(t.as_str().parse::<LedgerOperationType>(), Ok(t));
        }
        assert!("transfer".parse::<LedgerOperationType>().is_err());
    }

    #[test]
    fn ledger_type_serializes_snake_case() {
        let json = serde_json::to_string(&LedgerOperationType::TransferOut).unwrap();
        assert_eq!(json, "\"transfer_out\"");
    }
}
