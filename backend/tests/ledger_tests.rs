//! Stock ledger and product stock queries

mod common;

use common::*;
use shared::{LedgerFilter, LedgerOperationType, Operation, OperationKind, Pagination};
use stockroom_backend::error::ErrorCode;
use stockroom_backend::services::{
    DeliveryService, LedgerService, ProductService, ReceiptService, TransferService,
};

/// Receive 10 into main, move 4 to overflow, deliver 3 from main
async fn seeded_history(fx: &Fixture) -> (String, String, String) {
    let receipt = ReceiptService::new(fx.store.clone())
        .create(receipt_input(fx.main.id, vec![item(fx.product.id, 10)]), fx.actor)
        .await
        .unwrap();
    fx.operations(OperationKind::Receipt)
        .validate(receipt.id, fx.actor)
        .await
        .unwrap();

    let transfer = TransferService::new(fx.store.clone())
        .create(
            transfer_input(fx.main.id, fx.overflow.id, vec![item(fx.product.id, 4)]),
            fx.actor,
        )
        .await
        .unwrap();
    fx.operations(OperationKind::Transfer)
        .validate(transfer.id, fx.actor)
        .await
        .unwrap();

    let delivery = DeliveryService::new(fx.store.clone())
        .create(
            delivery_input(Some(fx.main.id), vec![item(fx.product.id, 3)]),
            fx.actor,
        )
        .await
        .unwrap();
    fx.operations(OperationKind::Delivery)
        .validate(delivery.id, fx.actor)
        .await
        .unwrap();

    (
        receipt.receipt_number,
        transfer.transfer_number,
        delivery.delivery_number,
    )
}

#[tokio::test]
async fn history_filters_by_type_warehouse_and_reference() {
    let fx = Fixture::new().await;
    let (_, transfer_number, delivery_number) = seeded_history(&fx).await;
    let ledger = LedgerService::new(fx.store.clone());

    let everything = ledger.history(&LedgerFilter::default()).await.unwrap();
    assert_eq!(everything.len(), 4);

    let deliveries = ledger
        .history(&LedgerFilter {
            operation_type: Some(LedgerOperationType::Delivery),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(deliveries.len(), 1);
    assert_eq!(deliveries[0].reference_number, delivery_number);

    let overflow = ledger
        .history(&LedgerFilter {
            warehouse_id: Some(fx.overflow.id),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(overflow.len(), 1);
    assert_eq!(overflow[0].operation_type, LedgerOperationType::TransferIn);

    let transfer = ledger
        .history(&LedgerFilter {
            reference_number: Some(transfer_number),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(transfer.len(), 2);
}

#[tokio::test]
async fn history_pages() {
    let fx = Fixture::new().await;
    seeded_history(&fx).await;

    let page = LedgerService::new(fx.store.clone())
        .history(&LedgerFilter {
            page: Pagination { limit: 3, offset: 2 },
            ..Default::default()
        })
        .await
        .unwrap();

    assert_eq!(page.len(), 2);
}

#[tokio::test]
async fn rows_written_together_keep_their_order() {
    let fx = Fixture::new().await;
    let washer = fx.store.seed_product("SKU-002", "Washer").await;
    let bolt = fx.store.seed_product("SKU-003", "Bolt").await;
    let lines = vec![item(bolt.id, 3), item(fx.product.id, 1), item(washer.id, 2)];
    let receipt = ReceiptService::new(fx.store.clone())
        .create(receipt_input(fx.main.id, lines), fx.actor)
        .await
        .unwrap();

    match fx.fetch(OperationKind::Receipt, receipt.id).await {
        Operation::Receipt(stored) => {
            let products: Vec<_> = stored.items.iter().map(|i| i.product_id).collect();
            assert_eq!(products, vec![bolt.id, fx.product.id, washer.id]);
        }
        other => panic!("expected a receipt, got {other:?}"),
    }

    let (_, transfer_number, _) = seeded_history(&fx).await;
    let transfer = LedgerService::new(fx.store.clone())
        .history(&LedgerFilter {
            reference_number: Some(transfer_number),
            ..Default::default()
        })
        .await
        .unwrap();
    let types: Vec<_> = transfer.iter().map(|e| e.operation_type).collect();
    assert_eq!(
        types,
        vec![LedgerOperationType::TransferIn, LedgerOperationType::TransferOut]
    );
}

#[tokio::test]
async fn product_stock_lists_every_warehouse_row() {
    let fx = Fixture::new().await;
    seeded_history(&fx).await;

    let stock = ProductService::new(fx.store.clone())
        .stock(fx.product.id)
        .await
        .unwrap();

    assert_eq!(stock.current_stock, 7);
    assert_eq!(stock.sku, "SKU-001");
    let total: i32 = stock.warehouses.iter().map(|w| w.quantity).sum();
    assert_eq!(total, stock.current_stock);
    assert_eq!(stock.warehouses.len(), 2);
}

#[tokio::test]
async fn unknown_product_is_not_found() {
    let fx = Fixture::new().await;
    let err = ProductService::new(fx.store.clone())
        .get(uuid::Uuid::new_v4())
        .await
        .unwrap_err();

    assert_eq!(err.code(), ErrorCode::NotFound);
}

#[tokio::test]
async fn consistent_store_reports_no_drift() {
    let fx = Fixture::new().await;
    seeded_history(&fx).await;

    let drift = LedgerService::new(fx.store.clone())
        .consistency()
        .await
        .unwrap();

    assert!(drift.is_empty());
}
