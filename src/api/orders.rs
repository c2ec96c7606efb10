//! Checkout and the caller's own orders.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use super::validated;
use crate::auth::CurrentUser;
use crate::domain::aggregates::{Order, OrderStatus, PaymentMethod};
use crate::error::Result;
use crate::services::catalog::PaginatedResponse;
use crate::services::checkout::{self, PlaceOrder};
use crate::services::lifecycle;
use crate::services::pricing::Quote;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct PreviewRequest {
    pub coupon_code: Option<String>,
}

pub async fn preview(
    State(s): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    body: Option<Json<PreviewRequest>>,
) -> Result<Json<Quote>> {
    let r = body.map(|Json(r)| r).unwrap_or_default();
    Ok(Json(checkout::preview(&s, &user, r.coupon_code.as_deref()).await?))
}

#[derive(Debug, Deserialize, Validate)]
pub struct CheckoutRequest {
    pub address_id: Uuid,
    pub payment_method: PaymentMethod,
    #[validate(length(min = 1, max = 40))]
    pub coupon_code: Option<String>,
}

pub async fn checkout(
    State(s): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Json(r): Json<CheckoutRequest>,
) -> Result<(StatusCode, Json<Order>)> {
    let r = validated(r)?;
    let order = checkout::place_order(&s, &user, PlaceOrder {
        address_id: r.address_id,
        payment_method: r.payment_method,
        coupon_code: r.coupon_code,
    })
    .await?;
    Ok((StatusCode::CREATED, Json(order)))
}

#[derive(Debug, Deserialize)]
pub struct OrderQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub status: Option<OrderStatus>,
}

pub async fn list_orders(
    State(s): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Query(q): Query<OrderQuery>,
) -> Result<Json<PaginatedResponse<Order>>> {
    let orders = lifecycle::list_orders(&s, Some(user.id()), q.status).await?;
    Ok(Json(PaginatedResponse::paginate(orders, q.page, q.per_page)))
}

pub async fn get_order(
    State(s): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<Order>> {
    Ok(Json(checkout::owned_order(&s, &user, id).await?))
}

#[derive(Debug, Deserialize, Validate)]
pub struct PaymentConfirmation {
    #[validate(length(min = 1, max = 200))]
    pub reference: String,
    #[validate(length(equal = 64))]
    pub signature: String,
}

pub async fn confirm_payment(
    State(s): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
    Json(r): Json<PaymentConfirmation>,
) -> Result<Json<Order>> {
    let r = validated(r)?;
    Ok(Json(checkout::confirm_payment(&s, &user, id, &r.reference, &r.signature).await?))
}

#[derive(Debug, Default, Deserialize)]
pub struct CancelRequest {
    pub reason: Option<String>,
}

pub async fn cancel_order(
    State(s): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
    body: Option<Json<CancelRequest>>,
) -> Result<Json<Order>> {
    let reason = body.and_then(|Json(r)| r.reason);
    let order = checkout::owned_order(&s, &user, id).await?;
    Ok(Json(lifecycle::cancel_order(&s, order, reason).await?))
}

pub async fn cancel_item(
    State(s): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path((id, item_id)): Path<(Uuid, Uuid)>,
    body: Option<Json<CancelRequest>>,
) -> Result<Json<Order>> {
    let reason = body.and_then(|Json(r)| r.reason);
    let order = checkout::owned_order(&s, &user, id).await?;
    Ok(Json(lifecycle::cancel_item(&s, order, item_id, reason).await?))
}

#[derive(Debug, Deserialize, Validate)]
pub struct ReturnRequest {
    #[validate(length(min = 3, max = 500))]
    pub reason: String,
}

pub async fn request_return(
    State(s): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path((id, item_id)): Path<(Uuid, Uuid)>,
    Json(r): Json<ReturnRequest>,
) -> Result<Json<Order>> {
    let r = validated(r)?;
    let order = checkout::owned_order(&s, &user, id).await?;
    Ok(Json(lifecycle::request_return(&s, order, item_id, r.reason).await?))
}
