//! Receipt tests
//!
//! Creating receipts and validating them into warehouse stock.

mod common;

use common::*;
use rust_decimal::Decimal;
use shared::{LedgerOperationType, Operation, OperationKind, OperationStatus};
use stockroom_backend::error::ErrorCode;
use stockroom_backend::services::ReceiptService;

// ============================================================================
// Creation
// ============================================================================

#[tokio::test]
async fn create_generates_a_draft_with_the_next_number() {
    let fx = Fixture::new().await;
    let service = ReceiptService::new(fx.store.clone());

    let receipt = service
        .create(receipt_input(fx.main.id, vec![item(fx.product.id, 5)]), fx.actor)
        .await
        .unwrap();

    assert!(receipt.receipt_number.starts_with("REC-"));
    assert!(receipt.receipt_number.ends_with("-001"));
    assert_eq!(receipt.status, OperationStatus::Draft);
    assert_eq!(receipt.items.len(), 1);
    assert_eq!(receipt.created_by, fx.actor);
    assert!(receipt.validated_at.is_none());
}

#[tokio::test]
async fn create_keeps_a_supplied_number_and_trims_it() {
    let fx = Fixture::new().await;
    let service = ReceiptService::new(fx.store.clone());
    let mut input = receipt_input(fx.main.id, vec![item(fx.product.id, 5)]);
    input.receipt_number = Some("  REC-CUSTOM-7 ".to_string());
    input.items[0].unit_price = Some(Decimal::new(1250, 2));

    let receipt = service.create(input, fx.actor).await.unwrap();

    assert_eq!(receipt.receipt_number, "REC-CUSTOM-7");
    assert_eq!(receipt.items[0].unit_price, Some(Decimal::new(1250, 2)));
}

#[tokio::test]
async fn create_allows_an_empty_item_list() {
    let fx = Fixture::new().await;
    let service = ReceiptService::new(fx.store.clone());

    let receipt = service
        .create(receipt_input(fx.main.id, vec![]), fx.actor)
        .await
        .unwrap();

    assert!(receipt.items.is_empty());
}

#[tokio::test]
async fn create_rejects_unknown_warehouse_and_product() {
    let fx = Fixture::new().await;
    let service = ReceiptService::new(fx.store.clone());

    let err = service
        .create(
            receipt_input(uuid::Uuid::new_v4(), vec![item(fx.product.id, 1)]),
            fx.actor,
        )
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::NotFound);

    let err = service
        .create(
            receipt_input(fx.main.id, vec![item(uuid::Uuid::new_v4(), 1)]),
            fx.actor,
        )
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::NotFound);
}

#[tokio::test]
async fn create_rejects_non_positive_quantities() {
    let fx = Fixture::new().await;
    let service = ReceiptService::new(fx.store.clone());

    for quantity in [0, -4] {
        let err = service
            .create(
                receipt_input(fx.main.id, vec![item(fx.product.id, quantity)]),
                fx.actor,
            )
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValidationError);
    }
}

#[tokio::test]
async fn create_rejects_blank_supplier_and_done_status() {
    let fx = Fixture::new().await;
    let service = ReceiptService::new(fx.store.clone());

    let mut blank = receipt_input(fx.main.id, vec![]);
    blank.supplier_name = "   ".to_string();
    let err = service.create(blank, fx.actor).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::ValidationError);

    let mut done = receipt_input(fx.main.id, vec![]);
    done.status = Some("done".to_string());
    let err = service.create(done, fx.actor).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::InvalidStatus);
}

// ============================================================================
// Validation
// ============================================================================

#[tokio::test]
async fn validating_a_receipt_adds_stock_and_writes_the_ledger() {
    let fx = Fixture::new().await;
    let receipt = ReceiptService::new(fx.store.clone())
        .create(receipt_input(fx.main.id, vec![item(fx.product.id, 10)]), fx.actor)
        .await
        .unwrap();

    let outcome = fx
        .operations(OperationKind::Receipt)
        .validate(receipt.id, fx.actor)
        .await
        .unwrap();

    assert_eq!(outcome.reference_number, receipt.receipt_number);
    assert_eq!(outcome.items_processed, 1);
    assert_eq!(outcome.stock_updates.len(), 1);
    assert_eq!(outcome.stock_updates[0].product_stock_before, 0);
    assert_eq!(outcome.stock_updates[0].product_stock_after, 10);

    assert_eq!(fx.current_stock().await, 10);
    assert_eq!(fx.quantity_in(&fx.main).await, 10);

    let ledger = fx.store.ledger().await;
    assert_eq!(ledger.len(), 1);
    assert_eq!(ledger[0].operation_type, LedgerOperationType::Receipt);
    assert_eq!(ledger[0].quantity_change, 10);
    assert_eq!(ledger[0].quantity_after, 10);
    assert_eq!(ledger[0].reference_number, receipt.receipt_number);
    assert_eq!(ledger[0].created_by, fx.actor);
    assert_eq!(
        ledger[0].notes.as_deref(),
        Some(format!("Receipt validation: {}", receipt.receipt_number).as_str())
    );

    let stored = fx.fetch(OperationKind::Receipt, receipt.id).await;
    assert_eq!(stored.status(), OperationStatus::Done);
    assert!(stored.validated_at().is_some());
}

#[tokio::test]
async fn repeated_lines_for_one_product_accumulate() {
    let fx = Fixture::new().await;
    fx.store.seed_stock(fx.product.id, fx.main.id, 3).await;
    let receipt = ReceiptService::new(fx.store.clone())
        .create(
            receipt_input(
                fx.main.id,
                vec![item(fx.product.id, 4), item(fx.product.id, 6)],
            ),
            fx.actor,
        )
        .await
        .unwrap();

    fx.operations(OperationKind::Receipt)
        .validate(receipt.id, fx.actor)
        .await
        .unwrap();

    assert_eq!(fx.quantity_in(&fx.main).await, 13);
    let afters: Vec<i32> = fx
        .store
        .ledger()
        .await
        .iter()
        .map(|e| e.quantity_after)
        .collect();
    assert_eq!(afters, vec![7, 13]);
}

#[tokio::test]
async fn receipt_beyond_the_storable_quantity_is_rejected() {
    let fx = Fixture::new().await;
    fx.store.seed_stock(fx.product.id, fx.main.id, 10).await;
    let receipt = ReceiptService::new(fx.store.clone())
        .create(receipt_input(fx.main.id, vec![item(fx.product.id, i32::MAX)]), fx.actor)
        .await
        .unwrap();

    let err = fx
        .operations(OperationKind::Receipt)
        .validate(receipt.id, fx.actor)
        .await
        .unwrap_err();

    assert_eq!(err.code(), ErrorCode::ValidationError);
    assert_eq!(fx.quantity_in(&fx.main).await, 10);
    assert_eq!(fx.current_stock().await, 10);
    assert!(fx.store.ledger().await.is_empty());
    match fx.fetch(OperationKind::Receipt, receipt.id).await {
        Operation::Receipt(stored) => {
            assert_eq!(stored.status, OperationStatus::Draft);
            assert!(stored.notes.is_none());
        }
        other => panic!("expected a receipt, got {other:?}"),
    }
}

#[tokio::test]
async fn repeated_lines_cannot_overflow_together() {
    let fx = Fixture::new().await;
    let receipt = ReceiptService::new(fx.store.clone())
        .create(
            receipt_input(
                fx.main.id,
                vec![
                    item(fx.product.id, 1_200_000_000),
                    item(fx.product.id, 1_200_000_000),
                ],
            ),
            fx.actor,
        )
        .await
        .unwrap();

    let err = fx
        .operations(OperationKind::Receipt)
        .validate(receipt.id, fx.actor)
        .await
        .unwrap_err();

    assert_eq!(err.code(), ErrorCode::ValidationError);
    assert_eq!(fx.current_stock().await, 0);
    assert!(fx.store.stock_rows().await.is_empty());
}

#[tokio::test]
async fn validating_an_empty_receipt_reports_no_items() {
    let fx = Fixture::new().await;
    let receipt = ReceiptService::new(fx.store.clone())
        .create(receipt_input(fx.main.id, vec![]), fx.actor)
        .await
        .unwrap();

    let err = fx
        .operations(OperationKind::Receipt)
        .validate(receipt.id, fx.actor)
        .await
        .unwrap_err();

    assert_eq!(err.code(), ErrorCode::NoItems);
    assert!(fx.store.ledger().await.is_empty());
    let stored = fx.fetch(OperationKind::Receipt, receipt.id).await;
    assert_eq!(stored.status(), OperationStatus::Draft);
}

#[tokio::test]
async fn a_waiting_receipt_can_be_validated_but_a_ready_one_cannot() {
    let fx = Fixture::new().await;
    let service = ReceiptService::new(fx.store.clone());

    let mut waiting = receipt_input(fx.main.id, vec![item(fx.product.id, 2)]);
    waiting.status = Some("waiting".to_string());
    let waiting = service.create(waiting, fx.actor).await.unwrap();

    let mut ready = receipt_input(fx.main.id, vec![item(fx.product.id, 2)]);
    ready.status = Some("ready".to_string());
    let ready = service.create(ready, fx.actor).await.unwrap();

    let operations = fx.operations(OperationKind::Receipt);
    operations.validate(waiting.id, fx.actor).await.unwrap();
    let err = operations.validate(ready.id, fx.actor).await.unwrap_err();

    assert_eq!(err.code(), ErrorCode::InvalidStatus);
    assert_eq!(fx.current_stock().await, 2);
}
