//! OpenSASE Storefront
//!
//! Self-hosted storefront and back-office for a single shop.
//!
//! ## Features
//! - Product catalog with product and category offers
//! - Shopping cart and checkout (cash on delivery, wallet, online)
//! - Order lifecycle with per-item cancellation and returns
//! - Proportional refunds into a customer wallet
//! - Coupons with global and per-customer usage limits
//! - Referral rewards
//! - Admin sales report

pub mod api;
pub mod auth;
pub mod config;
pub mod domain;
pub mod error;
pub mod payments;
pub mod publisher;
pub mod services;
pub mod state;
pub mod store;

pub use api::build_router;
pub use config::Config;
pub use error::{EcommerceError, Result};
pub use state::AppState;
