//! Referral rewards: both sides of a referral are paid into their wallets.

use serde::Serialize;

use crate::domain::aggregates::{Entry, TransactionSource, User};
use crate::domain::value_objects::Money;
use crate::error::{EcommerceError, Result};
use crate::services::ledger;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct ReferralSummary {
    pub referral_code: String,
    pub referred_users: usize,
    pub total_earned: Money,
    pub reward_per_referral: Money,
}

pub async fn find_referrer(state: &AppState, code: &str) -> Result<User> {
    let referrer: User = state
        .store
        .find_one_by("referral_code", &code.trim().to_uppercase())
        .await?
        .ok_or_else(|| EcommerceError::Validation("Unknown referral code".into()))?;
    if referrer.is_blocked() {
        return Err(EcommerceError::Validation("Unknown referral code".into()));
    }
    Ok(referrer)
}

pub async fn reward_signup(state: &AppState, referrer: &User, new_user: &User) -> Result<()> {
    let reward = state.config.referral_reward;
    if reward.is_positive() {
        ledger::credit(state, referrer.id(), Entry {
            amount: reward,
            source: TransactionSource::ReferralReward,
            order_id: None,
            reference: Some(new_user.id().to_string()),
            description: format!("Referral reward for inviting {}", new_user.name()),
        })
        .await?;
    }
    let bonus = state.config.referral_welcome_bonus;
    if bonus.is_positive() {
        ledger::credit(state, new_user.id(), Entry {
            amount: bonus,
            source: TransactionSource::ReferralReward,
            order_id: None,
            reference: Some(referrer.referral_code().to_string()),
            description: "Welcome bonus for joining with a referral code".into(),
        })
        .await?;
    }
    Ok(())
}

pub async fn summary(state: &AppState, user: &User) -> Result<ReferralSummary> {
    let referred: Vec<User> = state.store.find_by("referred_by", &user.id().to_string()).await?;
    let wallet = ledger::wallet(state, user.id()).await?;
    let total_earned = wallet
        .transactions()
        .iter()
        .filter(|t| t.source == TransactionSource::ReferralReward)
        .map(|t| t.amount)
        .sum();
    Ok(ReferralSummary {
        referral_code: user.referral_code().to_string(),
        referred_users: referred.len(),
        total_earned,
        reward_per_referral: state.config.referral_reward,
    })
}
