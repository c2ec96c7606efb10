//! Coupon Aggregate
//!
//! Usage is tracked twice: a global `used_count` checked against
//! `usage_limit`, and per-user counters checked against `per_user_limit`.
//! `used_count` always equals the sum of the per-user counters.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::events::{CouponEvent, DomainEvent};
use crate::domain::value_objects::{Money, Percent};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Coupon {
    id: Uuid,
    code: String,
    description: String,
    discount: Discount,
    min_purchase: Money,
    expires_at: DateTime<Utc>,
    usage_limit: Option<u32>,
    per_user_limit: u32,
    used_count: u32,
    usage: BTreeMap<Uuid, u32>,
    active: bool,
    created_at: DateTime<Utc>,
    #[serde(skip)]
    events: Vec<DomainEvent>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Discount {
    Percentage { percent: Percent, max_discount: Option<Money> },
    Fixed { amount: Money },
}

pub struct CouponTerms {
    pub code: String,
    pub description: String,
    pub discount: Discount,
    pub min_purchase: Money,
    pub expires_at: DateTime<Utc>,
    pub usage_limit: Option<u32>,
    pub per_user_limit: u32,
}

impl Coupon {
    pub fn create(terms: CouponTerms) -> Result<Self, CouponError> {
        let code = normalize_code(&terms.code);
        if code.is_empty() {
            return Err(CouponError::InvalidTerms("code must not be empty"));
        }
        if terms.per_user_limit == 0 {
            return Err(CouponError::InvalidTerms("per-user limit must be at least 1"));
        }
        if let Discount::Fixed { amount } = terms.discount {
            if !amount.is_positive() {
                return Err(CouponError::InvalidTerms("fixed discount must be positive"));
            }
        }
        Ok(Self {
            id: Uuid::now_v7(),
            code,
            description: terms.description,
            discount: terms.discount,
            min_purchase: terms.min_purchase,
            expires_at: terms.expires_at,
            usage_limit: terms.usage_limit,
            per_user_limit: terms.per_user_limit,
            used_count: 0,
            usage: BTreeMap::new(),
            active: true,
            created_at: Utc::now(),
            events: vec![],
        })
    }

    pub fn id(&self) -> Uuid { self.id }
    pub fn code(&self) -> &str { &self.code }
    pub fn description(&self) -> &str { &self.description }
    pub fn discount(&self) -> &Discount { &self.discount }
    pub fn min_purchase(&self) -> Money { self.min_purchase }
    pub fn expires_at(&self) -> DateTime<Utc> { self.expires_at }
    pub fn usage_limit(&self) -> Option<u32> { self.usage_limit }
    pub fn used_count(&self) -> u32 { self.used_count }
    pub fn is_active(&self) -> bool { self.active }

    pub fn uses_by(&self, user_id: Uuid) -> u32 {
        self.usage.get(&user_id).copied().unwrap_or(0)
    }

    /// Whether `user_id` could still redeem this coupon at `now`,
    /// ignoring the minimum purchase.
    pub fn is_available_to(&self, user_id: Uuid, now: DateTime<Utc>) -> bool {
        self.check_eligibility(user_id, now).is_ok()
    }

    fn check_eligibility(&self, user_id: Uuid, now: DateTime<Utc>) -> Result<(), CouponError> {
        if !self.active {
            return Err(CouponError::Inactive);
        }
        if now >= self.expires_at {
            return Err(CouponError::Expired);
        }
        if self.usage_limit.is_some_and(|cap| self.used_count >= cap) {
            return Err(CouponError::UsageLimitReached);
        }
        if self.uses_by(user_id) >= self.per_user_limit {
            return Err(CouponError::AlreadyUsed);
        }
        Ok(())
    }

    /// Discount this coupon grants on `subtotal`, never more than the subtotal.
    pub fn validate(&self, user_id: Uuid, subtotal: Money, now: DateTime<Utc>) -> Result<Money, CouponError> {
        self.check_eligibility(user_id, now)?;
        if subtotal < self.min_purchase {
            return Err(CouponError::MinimumNotMet { min_purchase: self.min_purchase });
        }
        let discount = match &self.discount {
            Discount::Percentage { percent, max_discount } => {
                let d = subtotal.percent(*percent);
                max_discount.map_or(d, |cap| d.min(cap))
            }
            Discount::Fixed { amount } => *amount,
        };
        Ok(discount.min(subtotal))
    }

    pub fn redeem(&mut self, user_id: Uuid) {
        *self.usage.entry(user_id).or_insert(0) += 1;
        self.used_count += 1;
        self.raise_event(DomainEvent::Coupon(CouponEvent::Redeemed { code: self.code.clone(), user_id }));
    }

    /// Gives a redemption back, e.g. when the order that used it is cancelled.
    pub fn release(&mut self, user_id: Uuid) {
        let Some(count) = self.usage.get_mut(&user_id) else { return };
        *count -= 1;
        if *count == 0 {
            self.usage.remove(&user_id);
        }
        self.used_count -= 1;
        self.raise_event(DomainEvent::Coupon(CouponEvent::Released { code: self.code.clone(), user_id }));
    }

    pub fn deactivate(&mut self) { self.active = false; }

    pub fn take_events(&mut self) -> Vec<DomainEvent> { std::mem::take(&mut self.events) }
    fn raise_event(&mut self, e: DomainEvent) { self.events.push(e); }
}

pub fn normalize_code(code: &str) -> String {
    code.trim().to_uppercase()
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CouponError {
    #[error("Coupon not found")]
    NotFound,
    #[error("Coupon is no longer active")]
    Inactive,
    #[error("Coupon has expired")]
    Expired,
    #[error("Coupon usage limit reached")]
    UsageLimitReached,
    #[error("Coupon already used")]
    AlreadyUsed,
    #[error("Minimum purchase of {min_purchase} required")]
    MinimumNotMet { min_purchase: Money },
    #[error("Invalid coupon: {0}")]
    InvalidTerms(&'static str),
    #[error("Coupon code already exists")]
    DuplicateCode,
}
