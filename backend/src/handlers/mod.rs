//! HTTP handlers

pub mod adjustment;
pub mod delivery;
pub mod health;
pub mod operations;
pub mod receipt;
pub mod stock;
pub mod transfer;

pub use adjustment::create_adjustment;
pub use delivery::create_delivery;
pub use health::health_check;
pub use operations::{Adjustments, Deliveries, OperationResource, Receipts, Transfers};
pub use receipt::create_receipt;
pub use stock::{get_product, get_product_stock, list_ledger, stock_consistency};
pub use transfer::create_transfer;
