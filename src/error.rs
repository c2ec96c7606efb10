//! Crate error type and its HTTP mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::domain::aggregates::{CartError, CouponError, OrderError, ProductError, UserError, WalletError};
use crate::domain::value_objects::ValueError;

#[derive(Error, Debug)]
pub enum EcommerceError {
    #[error("Product not found")]
    ProductNotFound,

    #[error("Category not found")]
    CategoryNotFound,

    #[error("Order not found")]
    OrderNotFound,

    #[error("User not found")]
    UserNotFound,

    #[error("Authentication required")]
    Unauthorized,

    #[error("Account is blocked")]
    Blocked,

    #[error("Admin access required")]
    Forbidden,

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Unavailable(String),

    #[error("Invalid payment signature")]
    InvalidSignature,

    #[error(transparent)]
    Value(#[from] ValueError),

    #[error(transparent)]
    Product(#[from] ProductError),

    #[error(transparent)]
    Cart(#[from] CartError),

    #[error(transparent)]
    Order(#[from] OrderError),

    #[error(transparent)]
    Wallet(#[from] WalletError),

    #[error(transparent)]
    Coupon(#[from] CouponError),

    #[error(transparent)]
    User(#[from] UserError),

    #[error("Storage error: {0}")]
    StorageError(String),
}

pub type Result<T> = std::result::Result<T, EcommerceError>;

impl From<sqlx::Error> for EcommerceError {
    fn from(e: sqlx::Error) -> Self {
        Self::StorageError(e.to_string())
    }
}

impl From<serde_json::Error> for EcommerceError {
    fn from(e: serde_json::Error) -> Self {
        Self::StorageError(format!("document encoding: {e}"))
    }
}

impl From<validator::ValidationErrors> for EcommerceError {
    fn from(e: validator::ValidationErrors) -> Self {
        Self::Validation(e.to_string())
    }
}

impl EcommerceError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::ProductNotFound | Self::CategoryNotFound | Self::OrderNotFound | Self::UserNotFound => {
                StatusCode::NOT_FOUND
            }
            Self::Unauthorized | Self::InvalidCredentials => StatusCode::UNAUTHORIZED,
            Self::Blocked | Self::Forbidden | Self::InvalidSignature => StatusCode::FORBIDDEN,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Validation(_) | Self::Value(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Unavailable(_) => StatusCode::BAD_REQUEST,
            Self::Product(ProductError::InsufficientStock { .. }) => StatusCode::CONFLICT,
            Self::Product(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Cart(CartError::ItemNotFound) => StatusCode::NOT_FOUND,
            Self::Cart(_) => StatusCode::BAD_REQUEST,
            Self::Order(OrderError::ItemNotFound) => StatusCode::NOT_FOUND,
            Self::Order(OrderError::Unbalanced(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Order(_) => StatusCode::CONFLICT,
            Self::Wallet(WalletError::InsufficientBalance { .. }) => StatusCode::PAYMENT_REQUIRED,
            Self::Wallet(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Coupon(CouponError::NotFound) => StatusCode::NOT_FOUND,
            Self::Coupon(CouponError::DuplicateCode) => StatusCode::CONFLICT,
            Self::Coupon(CouponError::InvalidTerms(_)) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Coupon(_) => StatusCode::BAD_REQUEST,
            Self::User(UserError::AddressNotFound) => StatusCode::NOT_FOUND,
            Self::User(_) => StatusCode::CONFLICT,
            Self::StorageError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for EcommerceError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
