//! Delivery tests
//!
//! Single-warehouse deliveries, deliveries split across every warehouse,
//! and the shortage checks that guard both.

mod common;

use common::*;
use shared::{LedgerOperationType, OperationKind, OperationStatus};
use stockroom_backend::error::{AppError, ErrorCode};
use stockroom_backend::services::DeliveryService;

// ============================================================================
// Single warehouse
// ============================================================================

#[tokio::test]
async fn delivery_from_a_warehouse_removes_stock() {
    let fx = Fixture::new().await;
    fx.store.seed_stock(fx.product.id, fx.main.id, 12).await;
    let delivery = DeliveryService::new(fx.store.clone())
        .create(
            delivery_input(Some(fx.main.id), vec![item(fx.product.id, 5)]),
            fx.actor,
        )
        .await
        .unwrap();
    assert!(delivery.delivery_number.starts_with("DEL-"));

    let outcome = fx
        .operations(OperationKind::Delivery)
        .validate(delivery.id, fx.actor)
        .await
        .unwrap();

    assert_eq!(outcome.stock_updates[0].quantity_change, -5);
    assert_eq!(fx.current_stock().await, 7);
    assert_eq!(fx.quantity_in(&fx.main).await, 7);

    let ledger = fx.store.ledger().await;
    assert_eq!(ledger.len(), 1);
    assert_eq!(ledger[0].operation_type, LedgerOperationType::Delivery);
    assert_eq!(ledger[0].quantity_change, -5);
    assert_eq!(ledger[0].quantity_after, 7);
}

#[tokio::test]
async fn delivery_short_of_stock_changes_nothing() {
    let fx = Fixture::new().await;
    fx.store.seed_stock(fx.product.id, fx.main.id, 5).await;
    let delivery = DeliveryService::new(fx.store.clone())
        .create(
            delivery_input(Some(fx.main.id), vec![item(fx.product.id, 8)]),
            fx.actor,
        )
        .await
        .unwrap();

    let err = fx
        .operations(OperationKind::Delivery)
        .validate(delivery.id, fx.actor)
        .await
        .unwrap_err();

    match &err {
        AppError::InsufficientStock(shortage) => {
            assert_eq!(shortage.product_id, fx.product.id);
            assert_eq!(shortage.warehouse_id, Some(fx.main.id));
            assert_eq!(shortage.required, 8);
            assert_eq!(shortage.available, 5);
            assert_eq!(shortage.shortage(), 3);
        }
        other => panic!("expected a shortage, got {other:?}"),
    }
    assert_eq!(fx.current_stock().await, 5);
    assert_eq!(fx.quantity_in(&fx.main).await, 5);
    assert!(fx.store.ledger().await.is_empty());

    let stored = fx.fetch(OperationKind::Delivery, delivery.id).await;
    assert_eq!(stored.status(), OperationStatus::Draft);
}

#[tokio::test]
async fn stock_in_another_warehouse_does_not_cover_a_named_one() {
    let fx = Fixture::new().await;
    fx.store.seed_stock(fx.product.id, fx.main.id, 2).await;
    fx.store.seed_stock(fx.product.id, fx.overflow.id, 50).await;
    let delivery = DeliveryService::new(fx.store.clone())
        .create(
            delivery_input(Some(fx.main.id), vec![item(fx.product.id, 3)]),
            fx.actor,
        )
        .await
        .unwrap();

    let err = fx
        .operations(OperationKind::Delivery)
        .validate(delivery.id, fx.actor)
        .await
        .unwrap_err();

    assert_eq!(err.code(), ErrorCode::InsufficientStock);
    assert_eq!(fx.current_stock().await, 52);
}

#[tokio::test]
async fn lines_are_checked_against_what_earlier_lines_left() {
    let fx = Fixture::new().await;
    fx.store.seed_stock(fx.product.id, fx.main.id, 10).await;
    let delivery = DeliveryService::new(fx.store.clone())
        .create(
            delivery_input(
                Some(fx.main.id),
                vec![item(fx.product.id, 6), item(fx.product.id, 6)],
            ),
            fx.actor,
        )
        .await
        .unwrap();

    let err = fx
        .operations(OperationKind::Delivery)
        .validate(delivery.id, fx.actor)
        .await
        .unwrap_err();

    match err {
        AppError::InsufficientStock(shortage) => {
            assert_eq!(shortage.required, 6);
            assert_eq!(shortage.available, 4);
        }
        other => panic!("expected a shortage, got {other:?}"),
    }
    assert_eq!(fx.quantity_in(&fx.main).await, 10);
    assert!(fx.store.ledger().await.is_empty());
}

// ============================================================================
// Split across warehouses
// ============================================================================

#[tokio::test]
async fn delivery_without_warehouse_takes_from_the_fullest_first() {
    let fx = Fixture::new().await;
    fx.store.seed_stock(fx.product.id, fx.main.id, 4).await;
    fx.store.seed_stock(fx.product.id, fx.overflow.id, 9).await;
    let delivery = DeliveryService::new(fx.store.clone())
        .create(delivery_input(None, vec![item(fx.product.id, 11)]), fx.actor)
        .await
        .unwrap();
    assert!(delivery.warehouse_id.is_none());

    let outcome = fx
        .operations(OperationKind::Delivery)
        .validate(delivery.id, fx.actor)
        .await
        .unwrap();

    assert_eq!(outcome.items_processed, 1);
    assert_eq!(outcome.stock_updates.len(), 2);
    assert_eq!(outcome.stock_updates[0].warehouse_id, fx.overflow.id);
    assert_eq!(outcome.stock_updates[0].quantity_change, -9);
    assert_eq!(outcome.stock_updates[1].warehouse_id, fx.main.id);
    assert_eq!(outcome.stock_updates[1].quantity_change, -2);

    assert_eq!(fx.quantity_in(&fx.overflow).await, 0);
    assert_eq!(fx.quantity_in(&fx.main).await, 2);
    assert_eq!(fx.current_stock().await, 2);

    let ledger = fx.store.ledger().await;
    assert_eq!(ledger.len(), 2);
    assert_eq!(ledger.iter().map(|e| e.quantity_change).sum::<i32>(), -11);
}

#[tokio::test]
async fn split_delivery_checks_the_total_across_warehouses() {
    let fx = Fixture::new().await;
    fx.store.seed_stock(fx.product.id, fx.main.id, 4).await;
    fx.store.seed_stock(fx.product.id, fx.overflow.id, 3).await;
    let delivery = DeliveryService::new(fx.store.clone())
        .create(delivery_input(None, vec![item(fx.product.id, 8)]), fx.actor)
        .await
        .unwrap();

    let err = fx
        .operations(OperationKind::Delivery)
        .validate(delivery.id, fx.actor)
        .await
        .unwrap_err();

    match err {
        AppError::InsufficientStock(shortage) => {
            assert_eq!(shortage.warehouse_id, None);
            assert_eq!(shortage.required, 8);
            assert_eq!(shortage.available, 7);
        }
        other => panic!("expected a shortage, got {other:?}"),
    }
    assert_eq!(fx.current_stock().await, 7);
}

#[tokio::test]
async fn split_delivery_of_a_product_with_no_stock_rows_is_short() {
    let fx = Fixture::new().await;
    let delivery = DeliveryService::new(fx.store.clone())
        .create(delivery_input(None, vec![item(fx.product.id, 1)]), fx.actor)
        .await
        .unwrap();

    let err = fx
        .operations(OperationKind::Delivery)
        .validate(delivery.id, fx.actor)
        .await
        .unwrap_err();

    assert_eq!(err.code(), ErrorCode::InsufficientStock);
}

// ============================================================================
// Concurrent validation
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn concurrent_deliveries_cannot_both_take_the_last_units() {
    let fx = Fixture::new().await;
    fx.store.seed_stock(fx.product.id, fx.main.id, 5).await;
    let deliveries = DeliveryService::new(fx.store.clone());
    let first = deliveries
        .create(
            delivery_input(Some(fx.main.id), vec![item(fx.product.id, 4)]),
            fx.actor,
        )
        .await
        .unwrap();
    let second = deliveries
        .create(
            delivery_input(Some(fx.main.id), vec![item(fx.product.id, 4)]),
            fx.actor,
        )
        .await
        .unwrap();

    let left = fx.operations(OperationKind::Delivery);
    let right = fx.operations(OperationKind::Delivery);
    let (a, b) = tokio::join!(
        left.validate(first.id, fx.actor),
        right.validate(second.id, fx.actor),
    );

    let outcomes = [a, b];
    assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);
    let failure = outcomes
        .iter()
        .find_map(|r| r.as_ref().err())
        .expect("one validation fails");
    assert_eq!(failure.code(), ErrorCode::InsufficientStock);

    assert_eq!(fx.quantity_in(&fx.main).await, 1);
    assert_eq!(fx.current_stock().await, 1);
    assert_eq!(fx.store.ledger().await.len(), 1);

    let statuses = [
        fx.fetch(OperationKind::Delivery, first.id).await.status(),
        fx.fetch(OperationKind::Delivery, second.id).await.status(),
    ];
    assert_eq!(
        statuses.iter().filter(|s| **s == OperationStatus::Done).count(),
        1
    );
}
