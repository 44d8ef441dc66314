//! Reference numbering tests

mod common;

use chrono::{Datelike, Utc};
use common::*;
use shared::OperationKind;
use stockroom_backend::services::{AdjustmentService, NumberingService, ReceiptService};

#[tokio::test]
async fn next_number_starts_at_one_for_each_kind() {
    let fx = Fixture::new().await;
    let numbering = NumberingService::new(fx.store.clone());
    let year = Utc::now().year();

    for kind in OperationKind::ALL {
        assert_eq!(
            numbering.next_number(kind).await,
            format!("{}-{}-001", kind.prefix(), year)
        );
    }
}

#[tokio::test]
async fn generated_numbers_follow_the_highest_existing_one() {
    let fx = Fixture::new().await;
    let year = Utc::now().year();
    let receipts = ReceiptService::new(fx.store.clone());

    let mut manual = receipt_input(fx.main.id, vec![]);
    manual.receipt_number = Some(format!("REC-{year}-007"));
    receipts.create(manual, fx.actor).await.unwrap();

    let generated = receipts
        .create(receipt_input(fx.main.id, vec![]), fx.actor)
        .await
        .unwrap();

    assert_eq!(generated.receipt_number, format!("REC-{year}-008"));
    assert_eq!(
        NumberingService::new(fx.store.clone())
            .next_number(OperationKind::Receipt)
            .await,
        format!("REC-{year}-009")
    );
}

#[tokio::test]
async fn numbers_outside_the_pattern_are_ignored() {
    let fx = Fixture::new().await;
    let year = Utc::now().year();
    let receipts = ReceiptService::new(fx.store.clone());

    let mut odd = receipt_input(fx.main.id, vec![]);
    odd.receipt_number = Some(format!("REC-{year}-ABC"));
    receipts.create(odd, fx.actor).await.unwrap();

    let generated = receipts
        .create(receipt_input(fx.main.id, vec![]), fx.actor)
        .await
        .unwrap();

    assert_eq!(generated.receipt_number, format!("REC-{year}-001"));
}

#[tokio::test]
async fn sequences_are_kept_per_kind() {
    let fx = Fixture::new().await;
    let year = Utc::now().year();
    ReceiptService::new(fx.store.clone())
        .create(receipt_input(fx.main.id, vec![]), fx.actor)
        .await
        .unwrap();

    let adjustment = AdjustmentService::new(fx.store.clone())
        .create(adjustment_input(fx.main.id, fx.product.id, 3), fx.actor)
        .await
        .unwrap();

    assert_eq!(adjustment.adjustment_number, format!("ADJ-{year}-001"));
}
