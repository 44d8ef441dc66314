//! Atomicity tests
//!
//! A failure part way through applying movements must leave stock, ledger
//! and status exactly as they were.

mod common;

use common::*;
use shared::{Operation, OperationKind, OperationStatus};
use stockroom_backend::error::ErrorCode;
use stockroom_backend::services::{AdjustmentService, ReceiptService, TransferService};

#[tokio::test]
async fn ledger_failure_rolls_back_every_movement() {
    let fx = Fixture::new().await;
    let second = fx.store.seed_product("SKU-002", "Washer").await;
    let receipt = ReceiptService::new(fx.store.clone())
        .create(
            receipt_input(
                fx.main.id,
                vec![item(fx.product.id, 10), item(second.id, 4)],
            ),
            fx.actor,
        )
        .await
        .unwrap();

    fx.store.fail_ledger_insert_at(2);
    let err = fx
        .operations(OperationKind::Receipt)
        .validate(receipt.id, fx.actor)
        .await
        .unwrap_err();

    assert_eq!(err.code(), ErrorCode::InternalError);
    assert_eq!(fx.current_stock().await, 0);
    assert_eq!(fx.store.product_stock(second.id).await, Some(0));
    assert!(fx.store.stock_rows().await.is_empty());
    assert!(fx.store.ledger().await.is_empty());

    match fx.fetch(OperationKind::Receipt, receipt.id).await {
        Operation::Receipt(stored) => {
            assert_eq!(stored.status, OperationStatus::Draft);
            assert!(stored.validated_at.is_none());
            let notes = stored.notes.unwrap_or_default();
            assert!(notes.starts_with("Validation failed:"), "{notes}");
        }
        other => panic!("expected a receipt, got {other:?}"),
    }
}

#[tokio::test]
async fn failed_validation_can_be_retried() {
    let fx = Fixture::new().await;
    let receipt = ReceiptService::new(fx.store.clone())
        .create(receipt_input(fx.main.id, vec![item(fx.product.id, 6)]), fx.actor)
        .await
        .unwrap();
    let operations = fx.operations(OperationKind::Receipt);

    fx.store.fail_ledger_insert_at(1);
    operations.validate(receipt.id, fx.actor).await.unwrap_err();
    operations.validate(receipt.id, fx.actor).await.unwrap();

    assert_eq!(fx.current_stock().await, 6);
    assert_eq!(fx.store.ledger().await.len(), 1);
}

#[tokio::test]
async fn failure_note_is_appended_to_existing_notes() {
    let fx = Fixture::new().await;
    fx.store.seed_stock(fx.product.id, fx.main.id, 5).await;
    let mut input = transfer_input(fx.main.id, fx.overflow.id, vec![item(fx.product.id, 5)]);
    input.notes = Some("Rebalance before audit".to_string());
    let transfer = TransferService::new(fx.store.clone())
        .create(input, fx.actor)
        .await
        .unwrap();

    // second entry is the incoming side
    fx.store.fail_ledger_insert_at(2);
    fx.operations(OperationKind::Transfer)
        .validate(transfer.id, fx.actor)
        .await
        .unwrap_err();

    assert_eq!(fx.quantity_in(&fx.main).await, 5);
    assert_eq!(fx.quantity_in(&fx.overflow).await, 0);
    match fx.fetch(OperationKind::Transfer, transfer.id).await {
        Operation::Transfer(stored) => {
            let notes = stored.notes.unwrap_or_default();
            let mut lines = notes.lines();
            assert_eq!(lines.next(), Some("Rebalance before audit"));
            assert!(lines.next().is_some_and(|l| l.starts_with("Validation failed:")));
        }
        other => panic!("expected a transfer, got {other:?}"),
    }
}

#[tokio::test]
async fn rejected_preconditions_leave_no_note() {
    let fx = Fixture::new().await;
    let receipt = ReceiptService::new(fx.store.clone())
        .create(receipt_input(fx.main.id, vec![]), fx.actor)
        .await
        .unwrap();

    fx.operations(OperationKind::Receipt)
        .validate(receipt.id, fx.actor)
        .await
        .unwrap_err();

    match fx.fetch(OperationKind::Receipt, receipt.id).await {
        Operation::Receipt(stored) => assert!(stored.notes.is_none()),
        other => panic!("expected a receipt, got {other:?}"),
    }
}

#[tokio::test]
async fn failed_adjustment_stays_draft() {
    let fx = Fixture::new().await;
    let adjustment = AdjustmentService::new(fx.store.clone())
        .create(adjustment_input(fx.main.id, fx.product.id, 9), fx.actor)
        .await
        .unwrap();

    fx.store.fail_ledger_insert_at(1);
    fx.operations(OperationKind::Adjustment)
        .validate(adjustment.id, fx.actor)
        .await
        .unwrap_err();

    assert_eq!(fx.current_stock().await, 0);
    let stored = fx.fetch(OperationKind::Adjustment, adjustment.id).await;
    assert_eq!(stored.status(), OperationStatus::Draft);
}
