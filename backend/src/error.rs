//! Error handling for the Stockroom inventory service
//!
//! Every error carries a machine-readable code for the UI to branch on and
//! a human message.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::{json, Value};
use shared::{PlanError, StockShortage};
use thiserror::Error;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0} not found")]
    NotFound(String),

    // Operation rules
    #[error("Invalid status: {0}")]
    InvalidStatus(String),

    #[error("{0} has no items")]
    NoItems(String),

    #[error("{0}")]
    InsufficientStock(StockShortage),

    #[error("Reference number {0} already exists")]
    DuplicateNumber(String),

    #[error("Source and destination warehouses must differ")]
    InvalidWarehouses,

    // Input errors
    #[error("Validation error: {message}")]
    Validation { field: String, message: String },

    #[error("Validation error: {0}")]
    ValidationErrors(#[from] validator::ValidationErrors),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    // Database errors
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    // Internal errors
    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Internal server error")]
    InternalError(#[from] anyhow::Error),
}

/// Machine-readable error kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    NotFound,
    InvalidStatus,
    NoItems,
    InsufficientStock,
    DuplicateNumber,
    InvalidWarehouses,
    ValidationError,
    Unauthorized,
    InternalError,
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: ErrorCode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl AppError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        AppError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::NotFound(_) => ErrorCode::NotFound,
            AppError::InvalidStatus(_) => ErrorCode::InvalidStatus,
            AppError::NoItems(_) => ErrorCode::NoItems,
            AppError::InsufficientStock(_) => ErrorCode::InsufficientStock,
            AppError::DuplicateNumber(_) => ErrorCode::DuplicateNumber,
            AppError::InvalidWarehouses => ErrorCode::InvalidWarehouses,
            AppError::Validation { .. } | AppError::ValidationErrors(_) => {
                ErrorCode::ValidationError
            }
            AppError::Unauthorized(_) => ErrorCode::Unauthorized,
            AppError::Configuration(_)
            | AppError::DatabaseError(_)
            | AppError::Internal(_)
            | AppError::InternalError(_) => ErrorCode::InternalError,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self.code() {
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::DuplicateNumber => StatusCode::CONFLICT,
            ErrorCode::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
            ErrorCode::InvalidStatus
            | ErrorCode::NoItems
            | ErrorCode::InsufficientStock
            | ErrorCode::InvalidWarehouses
            | ErrorCode::ValidationError => StatusCode::BAD_REQUEST,
        }
    }

    /// Structured payload for the kinds that have one
    pub fn details(&self) -> Option<Value> {
        match self {
            AppError::InsufficientStock(shortage) => Some(json!({
                "productId": shortage.product_id,
                "warehouseId": shortage.warehouse_id,
                "required": shortage.required,
                "available": shortage.available,
                "shortage": shortage.shortage(),
            })),
            AppError::Validation { field, .. } => Some(json!({ "field": field })),
            AppError::ValidationErrors(errors) => serde_json::to_value(errors).ok(),
            _ => None,
        }
    }

    /// True for failures of the storage or the process, as opposed to a
    /// rejected request
    pub fn is_internal(&self) -> bool {
        self.code() == ErrorCode::InternalError
    }
}

impl From<StockShortage> for AppError {
    fn from(shortage: StockShortage) -> Self {
        AppError::InsufficientStock(shortage)
    }
}

impl From<PlanError> for AppError {
    fn from(err: PlanError) -> Self {
        match err {
            PlanError::Shortage(shortage) => AppError::InsufficientStock(shortage),
            PlanError::OutOfRange(overflow) => AppError::validation("quantity", overflow.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let message = if self.is_internal() {
            // Log the cause, never return it
            tracing::error!("Error: {:?}", self);
            match &self {
                AppError::Configuration(_) => "Configuration error".to_string(),
                AppError::DatabaseError(_) => "A database error occurred".to_string(),
                _ => "An internal server error occurred".to_string(),
            }
        } else {
            tracing::debug!(code = ?self.code(), "Request rejected: {}", self);
            self.to_string()
        };

        let body = ErrorResponse {
            error: message,
            code: self.code(),
            details: self.details(),
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for handlers
pub type AppResult<T> = Result<T, AppError>;
