//! Domain models for the Stockroom inventory platform

mod catalog;
mod ledger;
mod operation;

pub use catalog::*;
pub use ledger::*;
pub use operation::*;
