//! Stockroom inventory service
//!
//! Receipts, deliveries, transfers and adjustments over per-warehouse stock,
//! with an append-only ledger of every quantity change.

use std::sync::Arc;

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod services;
pub mod store;

pub use config::Config;
pub use error::{AppError, AppResult};

/// Application state shared across handlers
pub struct AppState<S> {
    pub store: Arc<S>,
    pub config: Arc<Config>,
}

impl<S> AppState<S> {
    pub fn new(store: S, config: Config) -> Self {
        Self {
            store: Arc::new(store),
            config: Arc::new(config),
        }
    }
}

// Not derived: `S` itself does not need to be Clone
impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            config: Arc::clone(&self.config),
        }
    }
}
