//! Stock movement planning
//!
//! Validators never mutate stock directly from their line items. They hand
//! the lines to a [`SufficiencyPolicy`] together with a snapshot of the
//! current warehouse quantities and get back either the full list of
//! movements to apply or the first shortage found. Nothing is written until
//! the whole plan exists, so a rejected operation leaves no trace.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::LedgerOperationType;

/// Warehouse quantities keyed by (product, warehouse)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StockSnapshot {
    levels: BTreeMap<(Uuid, Uuid), i32>,
}

impl StockSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, product_id: Uuid, warehouse_id: Uuid, quantity: i32) {
        self.levels.insert((product_id, warehouse_id), quantity);
    }

    /// Quantity in one warehouse; a missing row counts as zero
    pub fn quantity(&self, product_id: Uuid, warehouse_id: Uuid) -> i32 {
        self.levels
            .get(&(product_id, warehouse_id))
            .copied()
            .unwrap_or(0)
    }

    /// Sum across every warehouse
    pub fn total(&self, product_id: Uuid) -> i64 {
        self.levels_of(product_id)
            .map(|(_, qty)| i64::from(qty))
            .sum()
    }

    /// (warehouse, quantity) pairs for a product
    pub fn levels_of(&self, product_id: Uuid) -> impl Iterator<Item = (Uuid, i32)> + '_ {
        self.levels
            .range((product_id, Uuid::nil())..=(product_id, Uuid::from_u128(u128::MAX)))
            .map(|(&(_, warehouse_id), &qty)| (warehouse_id, qty))
    }

    /// Refuse a movement that would take the warehouse row, or the product
    /// total when the movement touches it, outside the i32 range
    pub fn check(&self, movement: &PlannedMovement) -> Result<(), StockOutOfRange> {
        let out_of_range = || StockOutOfRange {
            product_id: movement.product_id,
            warehouse_id: movement.warehouse_id,
            delta: movement.delta,
        };

        self.quantity(movement.product_id, movement.warehouse_id)
            .checked_add(movement.delta)
            .ok_or_else(out_of_range)?;
        if movement.scope == DeltaScope::ProductAndWarehouse {
            let total = self.total(movement.product_id) + i64::from(movement.delta);
            if i32::try_from(total).is_err() {
                return Err(out_of_range());
            }
        }
        Ok(())
    }

    pub fn apply(&mut self, movement: &PlannedMovement) -> Result<(), StockOutOfRange> {
        self.check(movement)?;
        let entry = self
            .levels
            .entry((movement.product_id, movement.warehouse_id))
            .or_insert(0);
        *entry += movement.delta;
        Ok(())
    }
}

/// One line to plan: a product and a quantity
///
/// For receipts, deliveries and transfers the quantity is positive. For
/// adjustments it is the signed difference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlanLine {
    pub product_id: Uuid,
    pub quantity: i32,
}

/// Which stock figures a movement touches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeltaScope {
    /// Product aggregate and warehouse row
    ProductAndWarehouse,
    /// Warehouse row only; the aggregate is unchanged (transfers)
    WarehouseOnly,
}

/// A signed quantity change for one (product, warehouse) pair, plus the
/// ledger entry it produces
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedMovement {
    pub product_id: Uuid,
    pub warehouse_id: Uuid,
    pub delta: i32,
    pub entry_type: LedgerOperationType,
    pub scope: DeltaScope,
    pub note: Option<String>,
}

/// Not enough stock to satisfy a line
///
/// `warehouse_id` is `None` when the check ran against the total of every
/// warehouse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockShortage {
    pub product_id: Uuid,
    pub warehouse_id: Option<Uuid>,
    pub required: i64,
    pub available: i64,
}

impl StockShortage {
    pub fn shortage(&self) -> i64 {
        (self.required - self.available).max(0)
    }
}

impl std::fmt::Display for StockShortage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "insufficient stock for product {}: required {}, available {}",
            self.product_id, self.required, self.available
        )
    }
}

/// A movement that would leave the range a stock figure can hold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockOutOfRange {
    pub product_id: Uuid,
    pub warehouse_id: Uuid,
    pub delta: i32,
}

impl std::fmt::Display for StockOutOfRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "moving {} of product {} in warehouse {} exceeds the largest storable quantity",
            self.delta, self.product_id, self.warehouse_id
        )
    }
}

/// Why a plan was refused
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanError {
    Shortage(StockShortage),
    OutOfRange(StockOutOfRange),
}

impl From<StockShortage> for PlanError {
    fn from(shortage: StockShortage) -> Self {
        PlanError::Shortage(shortage)
    }
}

impl From<StockOutOfRange> for PlanError {
    fn from(overflow: StockOutOfRange) -> Self {
        PlanError::OutOfRange(overflow)
    }
}

impl std::fmt::Display for PlanError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlanError::Shortage(shortage) => shortage.fmt(f),
            PlanError::OutOfRange(overflow) => overflow.fmt(f),
        }
    }
}

/// How an operation type checks and splits its lines
pub trait SufficiencyPolicy {
    /// Movements for one line against the snapshot as left by earlier lines
    fn plan_line(
        &self,
        line: &PlanLine,
        snapshot: &StockSnapshot,
    ) -> Result<Vec<PlannedMovement>, PlanError>;
}

/// Plan every line, checking each against the stock the previous lines left
///
/// A product repeated across lines is therefore checked cumulatively.
pub fn plan<P>(
    policy: &P,
    lines: &[PlanLine],
    mut snapshot: StockSnapshot,
) -> Result<Vec<PlannedMovement>, PlanError>
where
    P: SufficiencyPolicy + ?Sized,
{
    let mut movements = Vec::new();
    for line in lines {
        let planned = policy.plan_line(line, &snapshot)?;
        for movement in &planned {
            snapshot.apply(movement)?;
        }
        movements.extend(planned);
    }
    Ok(movements)
}

fn require(
    line: &PlanLine,
    warehouse_id: Option<Uuid>,
    available: i64,
) -> Result<(), StockShortage> {
    let required = i64::from(line.quantity);
    if available < required {
        return Err(StockShortage {
            product_id: line.product_id,
            warehouse_id,
            required,
            available,
        });
    }
    Ok(())
}

/// Receipts: stock only increases, nothing to check
#[derive(Debug, Clone)]
pub struct Inbound {
    pub warehouse_id: Uuid,
    pub note: String,
}

impl SufficiencyPolicy for Inbound {
    fn plan_line(
        &self,
        line: &PlanLine,
        snapshot: &StockSnapshot,
    ) -> Result<Vec<PlannedMovement>, PlanError> {
        let movement = PlannedMovement {
            product_id: line.product_id,
            warehouse_id: self.warehouse_id,
            delta: line.quantity,
            entry_type: LedgerOperationType::Receipt,
            scope: DeltaScope::ProductAndWarehouse,
            note: Some(self.note.clone()),
        };
        snapshot.check(&movement)?;
        Ok(vec![movement])
    }
}

/// Deliveries from a named warehouse
#[derive(Debug, Clone)]
pub struct SingleWarehouse {
    pub warehouse_id: Uuid,
    pub note: String,
}

impl SufficiencyPolicy for SingleWarehouse {
    fn plan_line(
        &self,
        line: &PlanLine,
        snapshot: &StockSnapshot,
    ) -> Result<Vec<PlannedMovement>, PlanError> {
        let available = snapshot.quantity(line.product_id, self.warehouse_id);
        require(line, Some(self.warehouse_id), i64::from(available))?;

        Ok(vec![PlannedMovement {
            product_id: line.product_id,
            warehouse_id: self.warehouse_id,
            delta: -line.quantity,
            entry_type: LedgerOperationType::Delivery,
            scope: DeltaScope::ProductAndWarehouse,
            note: Some(self.note.clone()),
        }])
    }
}

/// Deliveries without a warehouse: checked against the total, then taken
/// greedily from the fullest warehouse first
#[derive(Debug, Clone)]
pub struct MultiWarehouseSplit {
    pub note: String,
}

impl SufficiencyPolicy for MultiWarehouseSplit {
    fn plan_line(
        &self,
        line: &PlanLine,
        snapshot: &StockSnapshot,
    ) -> Result<Vec<PlannedMovement>, PlanError> {
        require(line, None, snapshot.total(line.product_id))?;

        let mut levels: Vec<(Uuid, i32)> = snapshot
            .levels_of(line.product_id)
            .filter(|(_, qty)| *qty > 0)
            .collect();
        // largest first, warehouse id breaks ties
        levels.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));

        let mut remaining = line.quantity;
        let mut movements = Vec::new();
        for (warehouse_id, qty) in levels {
            if remaining == 0 {
                break;
            }
            let take = remaining.min(qty);
            remaining -= take;
            movements.push(PlannedMovement {
                product_id: line.product_id,
                warehouse_id,
                delta: -take,
                entry_type: LedgerOperationType::Delivery,
                scope: DeltaScope::ProductAndWarehouse,
                note: Some(self.note.clone()),
            });
        }
        Ok(movements)
    }
}

/// Transfers: check the source warehouse, then move between warehouse rows
/// without touching the aggregate
#[derive(Debug, Clone)]
pub struct Relocation {
    pub from_warehouse_id: Uuid,
    pub to_warehouse_id: Uuid,
}

impl SufficiencyPolicy for Relocation {
    fn plan_line(
        &self,
        line: &PlanLine,
        snapshot: &StockSnapshot,
    ) -> Result<Vec<PlannedMovement>, PlanError> {
        let available = snapshot.quantity(line.product_id, self.from_warehouse_id);
        require(line, Some(self.from_warehouse_id), i64::from(available))?;

        Ok(vec![
            PlannedMovement {
                product_id: line.product_id,
                warehouse_id: self.from_warehouse_id,
                delta: -line.quantity,
                entry_type: LedgerOperationType::TransferOut,
                scope: DeltaScope::WarehouseOnly,
                note: Some(format!("Transfer to warehouse {}", self.to_warehouse_id)),
            },
            PlannedMovement {
                product_id: line.product_id,
                warehouse_id: self.to_warehouse_id,
                delta: line.quantity,
                entry_type: LedgerOperationType::TransferIn,
                scope: DeltaScope::WarehouseOnly,
                note: Some(format!("Transfer from warehouse {}", self.from_warehouse_id)),
            },
        ])
    }
}

/// Adjustments: apply the signed difference, refusing to go below zero
#[derive(Debug, Clone)]
pub struct AggregateDelta {
    pub warehouse_id: Uuid,
    pub note: String,
}

impl SufficiencyPolicy for AggregateDelta {
    fn plan_line(
        &self,
        line: &PlanLine,
        snapshot: &StockSnapshot,
    ) -> Result<Vec<PlannedMovement>, PlanError> {
        let available = snapshot.quantity(line.product_id, self.warehouse_id);
        if line.quantity < 0 && i64::from(available) + i64::from(line.quantity) < 0 {
            return Err(StockShortage {
                product_id: line.product_id,
                warehouse_id: Some(self.warehouse_id),
                required: -i64::from(line.quantity),
                available: i64::from(available),
            }
            .into());
        }

        let movement = PlannedMovement {
            product_id: line.product_id,
            warehouse_id: self.warehouse_id,
            delta: line.quantity,
            entry_type: LedgerOperationType::Adjustment,
            scope: DeltaScope::ProductAndWarehouse,
            note: Some(self.note.clone()),
        };
        snapshot.check(&movement)?;
        Ok(vec![movement])
    }
}
