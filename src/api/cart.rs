//! The caller's cart and the coupons they can still use.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::validated;
use crate::auth::CurrentUser;
use crate::domain::aggregates::Discount;
use crate::domain::value_objects::Money;
use crate::error::Result;
use crate::services::cart::{self, CartView};
use crate::services::coupons;
use crate::state::AppState;

pub async fn get_cart(State(s): State<AppState>, Extension(CurrentUser(user)): Extension<CurrentUser>) -> Result<Json<CartView>> {
    Ok(Json(cart::view(&s, &user).await?))
}

pub async fn clear_cart(State(s): State<AppState>, Extension(CurrentUser(user)): Extension<CurrentUser>) -> Result<StatusCode> {
    cart::clear(&s, &user).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize, Validate)]
pub struct AddToCartRequest {
    pub product_id: Uuid,
    #[validate(range(min = 1, max = 1000))]
    pub quantity: u32,
}

pub async fn add_item(
    State(s): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Json(r): Json<AddToCartRequest>,
) -> Result<(StatusCode, Json<CartView>)> {
    let r = validated(r)?;
    let view = cart::add_item(&s, &user, r.product_id, r.quantity).await?;
    Ok((StatusCode::CREATED, Json(view)))
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateQuantityRequest {
    #[validate(range(max = 1000))]
    pub quantity: u32,
}

pub async fn update_item(
    State(s): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(product_id): Path<Uuid>,
    Json(r): Json<UpdateQuantityRequest>,
) -> Result<Json<CartView>> {
    let r = validated(r)?;
    Ok(Json(cart::set_quantity(&s, &user, product_id, r.quantity).await?))
}

pub async fn remove_item(
    State(s): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(product_id): Path<Uuid>,
) -> Result<Json<CartView>> {
    Ok(Json(cart::remove_item(&s, &user, product_id).await?))
}

#[derive(Debug, Serialize)]
pub struct CouponOffer {
    pub code: String,
    pub description: String,
    pub discount: Discount,
    pub min_purchase: Money,
    pub expires_at: DateTime<Utc>,
}

pub async fn available_coupons(
    State(s): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Result<Json<Vec<CouponOffer>>> {
    let offers = coupons::available_to(&s, user.id(), Utc::now())
        .await?
        .into_iter()
        .map(|c| CouponOffer {
            code: c.code().to_string(),
            description: c.description().to_string(),
            discount: c.discount().clone(),
            min_purchase: c.min_purchase(),
            expires_at: c.expires_at(),
        })
        .collect();
    Ok(Json(offers))
}
