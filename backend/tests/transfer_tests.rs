//! Transfer tests
//!
//! Transfers move quantity between warehouse rows and leave the product
//! aggregate alone.

mod common;

use common::*;
use shared::{LedgerOperationType, OperationKind, OperationStatus};
use stockroom_backend::error::{AppError, ErrorCode};
use stockroom_backend::services::TransferService;

#[tokio::test]
async fn transfer_requires_two_different_warehouses() {
    let fx = Fixture::new().await;
    let err = TransferService::new(fx.store.clone())
        .create(
            transfer_input(fx.main.id, fx.main.id, vec![item(fx.product.id, 1)]),
            fx.actor,
        )
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::InvalidWarehouses));
    assert_eq!(err.code(), ErrorCode::InvalidWarehouses);
}

#[tokio::test]
async fn transfer_items_carry_no_price() {
    let fx = Fixture::new().await;
    let mut line = item(fx.product.id, 1);
    line.unit_price = Some(rust_decimal::Decimal::ONE);

    let transfer = TransferService::new(fx.store.clone())
        .create(transfer_input(fx.main.id, fx.overflow.id, vec![line]), fx.actor)
        .await
        .unwrap();

    assert!(transfer.transfer_number.starts_with("TRF-"));
    assert_eq!(transfer.items[0].unit_price, None);
}

#[tokio::test]
async fn validated_transfer_moves_stock_and_keeps_the_total() {
    let fx = Fixture::new().await;
    fx.store.seed_stock(fx.product.id, fx.main.id, 20).await;
    let transfer = TransferService::new(fx.store.clone())
        .create(
            transfer_input(fx.main.id, fx.overflow.id, vec![item(fx.product.id, 8)]),
            fx.actor,
        )
        .await
        .unwrap();

    let outcome = fx
        .operations(OperationKind::Transfer)
        .validate(transfer.id, fx.actor)
        .await
        .unwrap();

    assert_eq!(outcome.stock_updates.len(), 2);
    for update in &outcome.stock_updates {
        assert_eq!(update.product_stock_before, 20);
        assert_eq!(update.product_stock_after, 20);
    }
    assert_eq!(fx.quantity_in(&fx.main).await, 12);
    assert_eq!(fx.quantity_in(&fx.overflow).await, 8);
    assert_eq!(fx.current_stock().await, 20);

    let ledger = fx.store.ledger().await;
    assert_eq!(ledger.len(), 2);
    assert_eq!(ledger[0].operation_type, LedgerOperationType::TransferOut);
    assert_eq!(ledger[0].warehouse_id, fx.main.id);
    assert_eq!(ledger[0].quantity_change, -8);
    assert_eq!(ledger[0].quantity_after, 12);
    assert_eq!(
        ledger[0].notes.as_deref(),
        Some(format!("Transfer to warehouse {}", fx.overflow.id).as_str())
    );
    assert_eq!(ledger[1].operation_type, LedgerOperationType::TransferIn);
    assert_eq!(ledger[1].warehouse_id, fx.overflow.id);
    assert_eq!(ledger[1].quantity_change, 8);
    assert_eq!(ledger[1].quantity_after, 8);
    assert_eq!(
        ledger[1].notes.as_deref(),
        Some(format!("Transfer from warehouse {}", fx.main.id).as_str())
    );
    assert_eq!(ledger.iter().map(|e| e.quantity_change).sum::<i32>(), 0);

    let stored = fx.fetch(OperationKind::Transfer, transfer.id).await;
    assert_eq!(stored.status(), OperationStatus::Done);
}

#[tokio::test]
async fn transfer_checks_only_the_source_warehouse() {
    let fx = Fixture::new().await;
    fx.store.seed_stock(fx.product.id, fx.main.id, 3).await;
    fx.store.seed_stock(fx.product.id, fx.overflow.id, 40).await;
    let transfer = TransferService::new(fx.store.clone())
        .create(
            transfer_input(fx.main.id, fx.overflow.id, vec![item(fx.product.id, 5)]),
            fx.actor,
        )
        .await
        .unwrap();

    let err = fx
        .operations(OperationKind::Transfer)
        .validate(transfer.id, fx.actor)
        .await
        .unwrap_err();

    match err {
        AppError::InsufficientStock(shortage) => {
            assert_eq!(shortage.warehouse_id, Some(fx.main.id));
            assert_eq!(shortage.available, 3);
        }
        other => panic!("expected a shortage, got {other:?}"),
    }
    assert_eq!(fx.quantity_in(&fx.main).await, 3);
    assert_eq!(fx.quantity_in(&fx.overflow).await, 40);
}

#[tokio::test]
async fn every_item_writes_one_entry_per_side() {
    let fx = Fixture::new().await;
    let second = fx.store.seed_product("SKU-002", "Washer").await;
    fx.store.seed_stock(fx.product.id, fx.main.id, 5).await;
    fx.store.seed_stock(second.id, fx.main.id, 5).await;
    let transfer = TransferService::new(fx.store.clone())
        .create(
            transfer_input(
                fx.main.id,
                fx.overflow.id,
                vec![item(fx.product.id, 2), item(second.id, 3)],
            ),
            fx.actor,
        )
        .await
        .unwrap();

    let outcome = fx
        .operations(OperationKind::Transfer)
        .validate(transfer.id, fx.actor)
        .await
        .unwrap();

    assert_eq!(outcome.items_processed, 2);
    assert_eq!(fx.store.ledger().await.len(), 4);
    assert_eq!(
        fx.store.warehouse_quantity(second.id, fx.overflow.id).await,
        Some(3)
    );
    assert_eq!(fx.store.product_stock(second.id).await, Some(5));
}
