//! Wallet balance, top-ups and referral earnings.

use axum::{extract::State, http::StatusCode, Extension, Json};
use serde::Deserialize;
use validator::Validate;

use super::validated;
use crate::auth::CurrentUser;
use crate::domain::aggregates::{Wallet, WalletTransaction};
use crate::domain::value_objects::Money;
use crate::error::{EcommerceError, Result};
use crate::services::{ledger, referral, referral::ReferralSummary};
use crate::state::AppState;

pub async fn get_wallet(State(s): State<AppState>, Extension(CurrentUser(user)): Extension<CurrentUser>) -> Result<Json<Wallet>> {
    Ok(Json(ledger::wallet(&s, user.id()).await?))
}

#[derive(Debug, Deserialize, Validate)]
pub struct TopUpRequest {
    pub amount: Money,
    #[validate(length(min = 1, max = 200))]
    pub reference: String,
    #[validate(length(equal = 64))]
    pub signature: String,
}

pub async fn top_up(
    State(s): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Json(r): Json<TopUpRequest>,
) -> Result<(StatusCode, Json<WalletTransaction>)> {
    let r = validated(r)?;
    if !r.amount.is_positive() {
        return Err(EcommerceError::Validation("amount: must be positive".into()));
    }
    let txn = ledger::top_up(&s, user.id(), r.amount, &r.reference, &r.signature).await?;
    Ok((StatusCode::CREATED, Json(txn)))
}

pub async fn referral_summary(
    State(s): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Result<Json<ReferralSummary>> {
    Ok(Json(referral::summary(&s, &user).await?))
}
