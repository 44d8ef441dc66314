//! Business logic services for the Stockroom inventory service

pub mod adjustment;
pub mod delivery;
pub mod ledger;
pub mod numbering;
pub mod operations;
pub mod product;
pub mod receipt;
pub mod stock;
pub mod transfer;
pub mod validation;

pub use adjustment::AdjustmentService;
pub use delivery::DeliveryService;
pub use ledger::LedgerService;
pub use numbering::NumberingService;
pub use operations::OperationService;
pub use product::ProductService;
pub use receipt::ReceiptService;
pub use stock::{LedgerWriter, StockMutator};
pub use transfer::TransferService;
pub use validation::{ValidationEngine, ValidationOutcome};
