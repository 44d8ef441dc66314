//! Shared types and models for the Stockroom inventory platform
//!
//! This crate holds everything that does not touch storage: the domain
//! entities, the operation status rules, reference numbering and the pure
//! stock planning used by the validators in the backend.

pub mod models;
pub mod numbering;
pub mod planning;
pub mod types;
pub mod validation;

pub use models::*;
pub use numbering::*;
pub use planning::*;
pub use types::*;
pub use validation::*;
