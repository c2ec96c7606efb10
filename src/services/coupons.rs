//! Coupon administration and lookup.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::aggregates::{coupon::normalize_code, Coupon, CouponError, CouponTerms};
use crate::error::{EcommerceError, Result};
use crate::state::AppState;

pub async fn by_code(state: &AppState, code: &str) -> Result<Coupon> {
    state
        .store
        .find_one_by("code", &normalize_code(code))
        .await?
        .ok_or(EcommerceError::Coupon(CouponError::NotFound))
}

pub async fn create(state: &AppState, terms: CouponTerms) -> Result<Coupon> {
    let coupon = Coupon::create(terms)?;
    if state.store.find_one_by::<Coupon>("code", coupon.code()).await?.is_some() {
        return Err(CouponError::DuplicateCode.into());
    }
    state.store.put(&coupon).await?;
    tracing::info!(coupon_id = %coupon.id(), code = %coupon.code(), "coupon created");
    Ok(coupon)
}

pub async fn deactivate(state: &AppState, id: Uuid) -> Result<Coupon> {
    let mut coupon: Coupon = state.store.get(id).await?.ok_or(EcommerceError::Coupon(CouponError::NotFound))?;
    coupon.deactivate();
    state.store.put(&coupon).await?;
    tracing::info!(coupon_id = %id, "coupon deactivated");
    Ok(coupon)
}

pub async fn all(state: &AppState) -> Result<Vec<Coupon>> {
    state.store.all().await
}

/// Coupons the user could still apply at `now`, ignoring minimum purchase.
pub async fn available_to(state: &AppState, user_id: Uuid, now: DateTime<Utc>) -> Result<Vec<Coupon>> {
    let mut coupons = all(state).await?;
    coupons.retain(|c| c.is_available_to(user_id, now));
    Ok(coupons)
}
