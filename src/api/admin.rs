//! Back-office handlers. Every route here runs behind `require_admin`.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use super::account::UserView;
use super::validated;
use crate::domain::aggregates::{Category, Coupon, CouponTerms, Discount, Order, OrderStatus, Product, ProductDetails};
use crate::domain::value_objects::{Money, Percent, Sku};
use crate::error::Result;
use crate::services::catalog::{self, PaginatedResponse, ProductInput};
use crate::services::report::{self, SalesReport};
use crate::services::{accounts, coupons, lifecycle};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

// Products

#[derive(Debug, Deserialize, Validate)]
pub struct ProductRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[serde(default)]
    #[validate(length(max = 5000))]
    pub description: String,
    pub category_id: Uuid,
    pub price: Money,
    pub offer: Option<Percent>,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl From<ProductRequest> for ProductInput {
    fn from(r: ProductRequest) -> Self {
        Self {
            details: ProductDetails {
                name: r.name,
                description: r.description,
                category_id: r.category_id,
                images: r.images,
                tags: r.tags,
            },
            price: r.price,
            offer: r.offer,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateProductRequest {
    pub sku: String,
    #[serde(default)]
    pub stock: u32,
    #[serde(flatten)]
    #[validate]
    pub product: ProductRequest,
}

pub async fn list_products(State(s): State<AppState>, Query(q): Query<PageQuery>) -> Result<Json<PaginatedResponse<Product>>> {
    let products = catalog::all_products(&s).await?;
    Ok(Json(PaginatedResponse::paginate(products, q.page, q.per_page)))
}

pub async fn create_product(State(s): State<AppState>, Json(r): Json<CreateProductRequest>) -> Result<(StatusCode, Json<Product>)> {
    let r = validated(r)?;
    let sku = Sku::new(r.sku)?;
    let product = catalog::create_product(&s, sku, r.product.into(), r.stock).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

pub async fn update_product(
    State(s): State<AppState>,
    Path(id): Path<Uuid>,
    Json(r): Json<ProductRequest>,
) -> Result<Json<Product>> {
    let r = validated(r)?;
    Ok(Json(catalog::update_product(&s, id, r.into()).await?))
}

pub async fn list_product(State(s): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<Product>> {
    Ok(Json(catalog::set_product_listed(&s, id, true).await?))
}

pub async fn unlist_product(State(s): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<Product>> {
    Ok(Json(catalog::set_product_listed(&s, id, false).await?))
}

#[derive(Debug, Deserialize, Validate)]
pub struct StockRequest {
    #[validate(range(min = 1, max = 100000))]
    pub quantity: u32,
}

pub async fn add_stock(State(s): State<AppState>, Path(id): Path<Uuid>, Json(r): Json<StockRequest>) -> Result<Json<Product>> {
    let r = validated(r)?;
    Ok(Json(catalog::restock(&s, id, r.quantity).await?))
}

// Categories

#[derive(Debug, Deserialize, Validate)]
pub struct CategoryRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    pub description: Option<String>,
    pub offer: Option<Percent>,
}

pub async fn list_categories(State(s): State<AppState>) -> Result<Json<Vec<Category>>> {
    Ok(Json(catalog::all_categories(&s).await?))
}

pub async fn create_category(State(s): State<AppState>, Json(r): Json<CategoryRequest>) -> Result<(StatusCode, Json<Category>)> {
    let r = validated(r)?;
    let category = catalog::create_category(&s, &r.name, r.description, r.offer).await?;
    Ok((StatusCode::CREATED, Json(category)))
}

pub async fn update_category(
    State(s): State<AppState>,
    Path(id): Path<Uuid>,
    Json(r): Json<CategoryRequest>,
) -> Result<Json<Category>> {
    let r = validated(r)?;
    Ok(Json(catalog::update_category(&s, id, &r.name, r.description, r.offer).await?))
}

pub async fn list_category(State(s): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<Category>> {
    Ok(Json(catalog::set_category_listed(&s, id, true).await?))
}

pub async fn unlist_category(State(s): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<Category>> {
    Ok(Json(catalog::set_category_listed(&s, id, false).await?))
}

// Coupons

#[derive(Debug, Deserialize, Validate)]
pub struct CouponRequest {
    #[validate(length(min = 3, max = 40))]
    pub code: String,
    #[serde(default)]
    pub description: String,
    pub discount: Discount,
    pub min_purchase: Option<Money>,
    pub expires_at: DateTime<Utc>,
    pub usage_limit: Option<u32>,
    #[validate(range(min = 1))]
    pub per_user_limit: Option<u32>,
}

pub async fn list_coupons(State(s): State<AppState>) -> Result<Json<Vec<Coupon>>> {
    Ok(Json(coupons::all(&s).await?))
}

pub async fn create_coupon(State(s): State<AppState>, Json(r): Json<CouponRequest>) -> Result<(StatusCode, Json<Coupon>)> {
    let r = validated(r)?;
    let coupon = coupons::create(&s, CouponTerms {
        code: r.code,
        description: r.description,
        discount: r.discount,
        min_purchase: r.min_purchase.unwrap_or(Money::ZERO),
        expires_at: r.expires_at,
        usage_limit: r.usage_limit,
        per_user_limit: r.per_user_limit.unwrap_or(1),
    })
    .await?;
    Ok((StatusCode::CREATED, Json(coupon)))
}

pub async fn deactivate_coupon(State(s): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<Coupon>> {
    Ok(Json(coupons::deactivate(&s, id).await?))
}

// Orders

#[derive(Debug, Deserialize)]
pub struct AdminOrderQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub status: Option<OrderStatus>,
    pub user_id: Option<Uuid>,
}

pub async fn list_orders(State(s): State<AppState>, Query(q): Query<AdminOrderQuery>) -> Result<Json<PaginatedResponse<Order>>> {
    let orders = lifecycle::list_orders(&s, q.user_id, q.status).await?;
    Ok(Json(PaginatedResponse::paginate(orders, q.page, q.per_page)))
}

pub async fn get_order(State(s): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<Order>> {
    Ok(Json(lifecycle::load_order(&s, id).await?))
}

#[derive(Debug, Deserialize, Validate)]
pub struct StatusRequest {
    pub status: OrderStatus,
    #[validate(length(max = 500))]
    pub note: Option<String>,
}

pub async fn update_status(State(s): State<AppState>, Path(id): Path<Uuid>, Json(r): Json<StatusRequest>) -> Result<Json<Order>> {
    let r = validated(r)?;
    let order = lifecycle::load_order(&s, id).await?;
    Ok(Json(lifecycle::update_status(&s, order, r.status, r.note).await?))
}

pub async fn approve_return(State(s): State<AppState>, Path((id, item_id)): Path<(Uuid, Uuid)>) -> Result<Json<Order>> {
    let order = lifecycle::load_order(&s, id).await?;
    Ok(Json(lifecycle::approve_return(&s, order, item_id).await?))
}

pub async fn reject_return(State(s): State<AppState>, Path((id, item_id)): Path<(Uuid, Uuid)>) -> Result<Json<Order>> {
    let order = lifecycle::load_order(&s, id).await?;
    Ok(Json(lifecycle::reject_return(&s, order, item_id).await?))
}

// Users

pub async fn list_users(State(s): State<AppState>, Query(q): Query<PageQuery>) -> Result<Json<PaginatedResponse<UserView>>> {
    let users: Vec<UserView> = accounts::list_users(&s).await?.iter().map(UserView::from).collect();
    Ok(Json(PaginatedResponse::paginate(users, q.page, q.per_page)))
}

pub async fn block_user(State(s): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<UserView>> {
    Ok(Json((&accounts::set_blocked(&s, id, true).await?).into()))
}

pub async fn unblock_user(State(s): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<UserView>> {
    Ok(Json((&accounts::set_blocked(&s, id, false).await?).into()))
}

// Reports

#[derive(Debug, Deserialize)]
pub struct SalesQuery {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

pub async fn sales_report(State(s): State<AppState>, Query(q): Query<SalesQuery>) -> Result<Json<SalesReport>> {
    Ok(Json(report::sales(&s, q.from, q.to).await?))
}
