//! Route definitions for the Stockroom inventory service

use axum::{
    middleware,
    routing::{get, post, put, MethodRouter},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::handlers::{
    self, operations, Adjustments, Deliveries, OperationResource, Receipts, Transfers,
};
use crate::middleware::auth_middleware;
use crate::store::InventoryStore;
use crate::AppState;

/// Create the application router with all routes and middleware
pub fn create_app<S: InventoryStore>(state: AppState<S>) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(root))
        .route("/health", get(handlers::health_check::<S>))
        .nest("/api/v1", api_routes(state.clone()))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Root endpoint
async fn root() -> &'static str {
    "Stockroom Inventory API v1"
}

/// Create API routes
pub fn api_routes<S: InventoryStore>(state: AppState<S>) -> Router<AppState<S>> {
    let protected = Router::new()
        .nest(
            "/receipts",
            operation_routes::<S, Receipts>(post(handlers::create_receipt::<S>)),
        )
        .nest(
            "/deliveries",
            operation_routes::<S, Deliveries>(post(handlers::create_delivery::<S>)),
        )
        .nest(
            "/transfers",
            operation_routes::<S, Transfers>(post(handlers::create_transfer::<S>)),
        )
        .nest(
            "/adjustments",
            operation_routes::<S, Adjustments>(post(handlers::create_adjustment::<S>)),
        )
        .nest("/products", product_routes::<S>())
        .nest("/stock-ledger", ledger_routes::<S>())
        .route_layer(middleware::from_fn_with_state(state, auth_middleware::<S>));

    Router::new()
        // Health check (public)
        .route("/health", get(handlers::health_check::<S>))
        .merge(protected)
}

/// List, read, edit, status, delete, validate and numbering for one
/// operation type
fn operation_routes<S: InventoryStore, R: OperationResource>(
    create: MethodRouter<AppState<S>>,
) -> Router<AppState<S>> {
    Router::new()
        .route("/", get(operations::list::<S, R>).merge(create))
        .route("/next-number", get(operations::next_number::<S, R>))
        .route(
            "/:id",
            get(operations::get::<S, R>)
                .put(operations::update::<S, R>)
                .delete(operations::delete::<S, R>),
        )
        .route("/:id/status", put(operations::update_status::<S, R>))
        .route("/:id/validate", post(operations::validate::<S, R>))
}

/// Product stock routes (protected)
fn product_routes<S: InventoryStore>() -> Router<AppState<S>> {
    Router::new()
        .route("/:id", get(handlers::get_product::<S>))
        .route("/:id/stock", get(handlers::get_product_stock::<S>))
}

/// Stock ledger routes (protected)
fn ledger_routes<S: InventoryStore>() -> Router<AppState<S>> {
    Router::new()
        .route("/", get(handlers::list_ledger::<S>))
        .route("/consistency", get(handlers::stock_consistency::<S>))
}
