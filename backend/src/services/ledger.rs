//! Stock ledger queries and the consistency audit

use std::sync::Arc;

use shared::{LedgerFilter, StockDrift, StockLedgerEntry};

use crate::error::AppResult;
use crate::store::{InventoryStore, StoreTx};

pub struct LedgerService<S> {
    store: Arc<S>,
}

impl<S: InventoryStore> LedgerService<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Ledger entries matching the filter, newest first
    pub async fn history(&self, filter: &LedgerFilter) -> AppResult<Vec<StockLedgerEntry>> {
        let mut tx = self.store.begin().await?;
        tx.ledger_entries(filter).await
    }

    /// Products whose aggregate stock disagrees with their warehouse rows
    pub async fn consistency(&self) -> AppResult<Vec<StockDrift>> {
        let mut tx = self.store.begin().await?;
        let drift = tx.stock_drift().await?;
        if !drift.is_empty() {
            tracing::warn!(products = drift.len(), "Stock drift detected");
        }
        Ok(drift)
    }
}
