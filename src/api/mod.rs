//! HTTP routing. Three tiers share one state: public storefront routes,
//! customer routes behind a bearer session, and admin routes that also
//! require the Admin role.

mod account;
mod admin;
mod cart;
mod catalog;
mod orders;
mod wallet;

use axum::{
    middleware,
    routing::{delete, get, post, put},
    Json, Router,
};
use serde::Serialize;
use validator::Validate;

use crate::auth;
use crate::error::Result;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    let public = Router::new()
        .route("/health", get(health))
        .route("/api/v1/auth/signup", post(account::signup))
        .route("/api/v1/auth/login", post(account::login))
        .route("/api/v1/products", get(catalog::list_products))
        .route("/api/v1/products/:id", get(catalog::get_product))
        .route("/api/v1/categories", get(catalog::list_categories));

    let customer = Router::new()
        .route("/api/v1/auth/logout", post(account::logout))
        .route("/api/v1/me", get(account::me))
        .route("/api/v1/me/addresses", get(account::list_addresses).post(account::add_address))
        .route("/api/v1/me/addresses/:id", delete(account::remove_address))
        .route("/api/v1/cart", get(cart::get_cart).delete(cart::clear_cart))
        .route("/api/v1/cart/items", post(cart::add_item))
        .route("/api/v1/cart/items/:product_id", put(cart::update_item).delete(cart::remove_item))
        .route("/api/v1/coupons", get(cart::available_coupons))
        .route("/api/v1/checkout/preview", post(orders::preview))
        .route("/api/v1/checkout", post(orders::checkout))
        .route("/api/v1/orders", get(orders::list_orders))
        .route("/api/v1/orders/:id", get(orders::get_order))
        .route("/api/v1/orders/:id/payment", post(orders::confirm_payment))
        .route("/api/v1/orders/:id/cancel", post(orders::cancel_order))
        .route("/api/v1/orders/:id/items/:item_id/cancel", post(orders::cancel_item))
        .route("/api/v1/orders/:id/items/:item_id/return", post(orders::request_return))
        .route("/api/v1/wallet", get(wallet::get_wallet))
        .route("/api/v1/wallet/topup", post(wallet::top_up))
        .route("/api/v1/referral", get(wallet::referral_summary))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth::require_user));

    let admin = Router::new()
        .route("/api/v1/admin/products", get(admin::list_products).post(admin::create_product))
        .route("/api/v1/admin/products/:id", put(admin::update_product))
        .route("/api/v1/admin/products/:id/list", post(admin::list_product))
        .route("/api/v1/admin/products/:id/unlist", post(admin::unlist_product))
        .route("/api/v1/admin/products/:id/stock", post(admin::add_stock))
        .route("/api/v1/admin/categories", get(admin::list_categories).post(admin::create_category))
        .route("/api/v1/admin/categories/:id", put(admin::update_category))
        .route("/api/v1/admin/categories/:id/list", post(admin::list_category))
        .route("/api/v1/admin/categories/:id/unlist", post(admin::unlist_category))
        .route("/api/v1/admin/coupons", get(admin::list_coupons).post(admin::create_coupon))
        .route("/api/v1/admin/coupons/:id/deactivate", post(admin::deactivate_coupon))
        .route("/api/v1/admin/orders", get(admin::list_orders))
        .route("/api/v1/admin/orders/:id", get(admin::get_order))
        .route("/api/v1/admin/orders/:id/status", post(admin::update_status))
        .route("/api/v1/admin/orders/:id/items/:item_id/return/approve", post(admin::approve_return))
        .route("/api/v1/admin/orders/:id/items/:item_id/return/reject", post(admin::reject_return))
        .route("/api/v1/admin/users", get(admin::list_users))
        .route("/api/v1/admin/users/:id/block", post(admin::block_user))
        .route("/api/v1/admin/users/:id/unblock", post(admin::unblock_user))
        .route("/api/v1/admin/reports/sales", get(admin::sales_report))
        .route_layer(middleware::from_fn(auth::require_admin))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth::require_user));

    public.merge(customer).merge(admin).with_state(state)
}

#[derive(Serialize)]
struct Health {
    status: &'static str,
    service: &'static str,
}

async fn health() -> Json<Health> {
    Json(Health { status: "healthy", service: "opensase-storefront" })
}

/// Runs `validator` rules on a request body.
fn validated<T: Validate>(body: T) -> Result<T> {
    body.validate()?;
    Ok(body)
}
