//! Shared fixtures for the backend integration tests

#![allow(dead_code)]

use std::sync::Arc;

use chrono::Utc;
use jsonwebtoken::{encode, EncodingKey, Header};
use uuid::Uuid;

use shared::{Operation, OperationKind, Product, Warehouse};
use stockroom_backend::config::{
    Config, DatabaseConfig, InventoryConfig, JwtConfig, ServerConfig,
};
use stockroom_backend::middleware::auth::Claims;
use stockroom_backend::services::adjustment::CreateAdjustmentInput;
use stockroom_backend::services::delivery::CreateDeliveryInput;
use stockroom_backend::services::operations::OperationItemInput;
use stockroom_backend::services::receipt::CreateReceiptInput;
use stockroom_backend::services::transfer::CreateTransferInput;
use stockroom_backend::services::OperationService;
use stockroom_backend::store::MemoryStore;

pub const JWT_SECRET: &str = "integration-test-secret";

/// A store with one product and two warehouses
pub struct Fixture {
    pub store: Arc<MemoryStore>,
    pub product: Product,
    pub main: Warehouse,
    pub overflow: Warehouse,
    pub actor: Uuid,
}

impl Fixture {
    pub async fn new() -> Self {
        let store = MemoryStore::new();
        let product = store.seed_product("SKU-001", "Steel bolt").await;
        let main = store.seed_warehouse("Main").await;
        let overflow = store.seed_warehouse("Overflow").await;
        Self {
            store: Arc::new(store),
            product,
            main,
            overflow,
            actor: Uuid::new_v4(),
        }
    }

    pub fn operations(&self, kind: OperationKind) -> OperationService<MemoryStore> {
        OperationService::new(Arc::clone(&self.store), kind)
    }

    pub async fn current_stock(&self) -> i32 {
        self.store
            .product_stock(self.product.id)
            .await
            .unwrap_or_default()
    }

    pub async fn quantity_in(&self, warehouse: &Warehouse) -> i32 {
        self.store
            .warehouse_quantity(self.product.id, warehouse.id)
            .await
            .unwrap_or_default()
    }

    pub async fn fetch(&self, kind: OperationKind, id: Uuid) -> Operation {
        self.operations(kind)
            .get(id)
            .await
            .expect("operation should exist")
    }
}

pub fn item(product_id: Uuid, quantity: i32) -> OperationItemInput {
    OperationItemInput {
        product_id,
        quantity,
        unit_price: None,
    }
}

pub fn receipt_input(warehouse_id: Uuid, items: Vec<OperationItemInput>) -> CreateReceiptInput {
    CreateReceiptInput {
        receipt_number: None,
        warehouse_id,
        supplier_name: "Acme Supplies".to_string(),
        status: None,
        notes: None,
        items,
    }
}

pub fn delivery_input(
    warehouse_id: Option<Uuid>,
    items: Vec<OperationItemInput>,
) -> CreateDeliveryInput {
    CreateDeliveryInput {
        delivery_number: None,
        warehouse_id,
        customer_name: "Northwind".to_string(),
        status: None,
        notes: None,
        items,
    }
}

pub fn transfer_input(from: Uuid, to: Uuid, items: Vec<OperationItemInput>) -> CreateTransferInput {
    CreateTransferInput {
        transfer_number: None,
        from_warehouse_id: from,
        to_warehouse_id: to,
        status: None,
        notes: None,
        items,
    }
}

pub fn adjustment_input(
    warehouse_id: Uuid,
    product_id: Uuid,
    counted_quantity: i32,
) -> CreateAdjustmentInput {
    CreateAdjustmentInput {
        adjustment_number: None,
        warehouse_id,
        product_id,
        counted_quantity,
        reason: None,
    }
}

pub fn test_config() -> Config {
    Config {
        environment: "test".to_string(),
        server: ServerConfig::default(),
        database: DatabaseConfig {
            url: "postgres://localhost/stockroom_test".to_string(),
            max_connections: 1,
            min_connections: 1,
        },
        jwt: JwtConfig {
            secret: JWT_SECRET.to_string(),
        },
        inventory: InventoryConfig::default(),
    }
}

/// Bearer token for `user_id`, signed with the test secret
pub fn bearer_token(user_id: Uuid) -> String {
    let now = Utc::now().timestamp();
    let claims = Claims {
        sub: user_id.to_string(),
        iat: now,
        exp: now + 3600,
    };
    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .expect("token should encode");
    format!("Bearer {token}")
}
