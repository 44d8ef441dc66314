//! Reference number generation

use std::sync::Arc;

use chrono::{Datelike, Utc};

use shared::{fallback_number, next_number, OperationKind};

use crate::error::AppResult;
use crate::store::{InventoryStore, StoreTx};

/// Next `{PREFIX}-{YEAR}-{NNN}` inside an open transaction
pub async fn generate<T: StoreTx>(tx: &mut T, kind: OperationKind, year: i32) -> AppResult<String> {
    let prefix = format!("{}-{}-", kind.prefix(), year);
    let existing = tx.reference_numbers(kind, &prefix).await?;
    Ok(next_number(
        kind.prefix(),
        year,
        existing.iter().map(String::as_str),
    ))
}

/// Numbering service for the next-number endpoints
pub struct NumberingService<S> {
    store: Arc<S>,
}

impl<S: InventoryStore> NumberingService<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Suggest the next reference number for the current year
    ///
    /// Never fails: when the stored numbers cannot be read, a clock-derived
    /// number is returned instead.
    pub async fn next_number(&self, kind: OperationKind) -> String {
        let now = Utc::now();
        let year = now.year();

        let result = async {
            let mut tx = self.store.begin().await?;
            generate(&mut tx, kind, year).await
        }
        .await;

        match result {
            Ok(number) => number,
            Err(err) => {
                let number = fallback_number(kind.prefix(), year, now.timestamp_millis());
                tracing::warn!(
                    error = %err,
                    fallback = %number,
                    "Could not read {} numbers, using fallback",
                    kind
                );
                number
            }
        }
    }
}
