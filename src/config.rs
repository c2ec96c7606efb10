//! Service configuration, read from the environment (and `.env` in dev).

use anyhow::{Context, Result};
use chrono::Duration;
use rust_decimal::Decimal;
use std::str::FromStr;

use crate::domain::value_objects::Money;

#[derive(Clone, Debug)]
pub struct Config {
    pub port: u16,
    pub database_url: Option<String>,
    pub nats_url: Option<String>,
    pub currency: String,
    pub pricing: PricingConfig,
    pub cod_limit: Option<Money>,
    pub return_window_days: i64,
    pub referral_reward: Money,
    pub referral_welcome_bonus: Money,
    pub max_quantity_per_item: u32,
    pub session_ttl_hours: i64,
    pub payment_signing_secret: String,
    pub admin_email: Option<String>,
    pub admin_password: Option<String>,
}

/// Inputs to order pricing.
#[derive(Clone, Debug)]
pub struct PricingConfig {
    /// Fraction, e.g. `0.05` for 5%.
    pub tax_rate: Decimal,
    pub shipping_fee: Money,
    pub free_shipping_threshold: Option<Money>,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            tax_rate: Decimal::new(5, 2),
            shipping_fee: Money::from_cents(500),
            free_shipping_threshold: Some(Money::from_cents(10_000)),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8083,
            database_url: None,
            nats_url: None,
            currency: "USD".to_string(),
            pricing: PricingConfig::default(),
            cod_limit: Some(Money::from_cents(100_000)),
            return_window_days: 7,
            referral_reward: Money::from_cents(1_000),
            referral_welcome_bonus: Money::from_cents(500),
            max_quantity_per_item: 10,
            session_ttl_hours: 72,
            payment_signing_secret: "dev-signing-secret".to_string(),
            admin_email: None,
            admin_password: None,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let d = Self::default();
        let pricing = PricingConfig {
            tax_rate: parse_or("TAX_RATE", d.pricing.tax_rate)?,
            shipping_fee: money_or("SHIPPING_FEE", d.pricing.shipping_fee)?,
            free_shipping_threshold: optional_money("FREE_SHIPPING_THRESHOLD", d.pricing.free_shipping_threshold)?,
        };
        let payment_signing_secret = match var("PAYMENT_SIGNING_SECRET") {
            Some(s) => s,
            None => {
                tracing::warn!("PAYMENT_SIGNING_SECRET not set; using the development secret");
                d.payment_signing_secret
            }
        };
        Ok(Self {
            port: parse_or("PORT", d.port)?,
            database_url: var("DATABASE_URL"),
            nats_url: var("NATS_URL"),
            currency: var("CURRENCY").unwrap_or(d.currency),
            pricing,
            cod_limit: optional_money("COD_LIMIT", d.cod_limit)?,
            return_window_days: parse_or("RETURN_WINDOW_DAYS", d.return_window_days)?,
            referral_reward: money_or("REFERRAL_REWARD", d.referral_reward)?,
            referral_welcome_bonus: money_or("REFERRAL_WELCOME_BONUS", d.referral_welcome_bonus)?,
            max_quantity_per_item: parse_or("MAX_QUANTITY_PER_ITEM", d.max_quantity_per_item)?,
            session_ttl_hours: parse_or("SESSION_TTL_HOURS", d.session_ttl_hours)?,
            payment_signing_secret,
            admin_email: var("ADMIN_EMAIL"),
            admin_password: var("ADMIN_PASSWORD"),
        })
    }

    pub fn return_window(&self) -> Duration {
        Duration::days(self.return_window_days)
    }

    pub fn session_ttl(&self) -> Duration {
        Duration::hours(self.session_ttl_hours)
    }
}

fn var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match var(key) {
        Some(raw) => raw.trim().parse().with_context(|| format!("invalid {key}: {raw:?}")),
        None => Ok(default),
    }
}

fn money_or(key: &str, default: Money) -> Result<Money> {
    Ok(Money::new(parse_or(key, default.amount())?))
}

/// `none` or `off` disables the setting.
fn optional_money(key: &str, default: Option<Money>) -> Result<Option<Money>> {
    match var(key) {
        Some(raw) if matches!(raw.trim().to_lowercase().as_str(), "none" | "off") => Ok(None),
        Some(raw) => {
            let amount: Decimal = raw.trim().parse().with_context(|| format!("invalid {key}: {raw:?}"))?;
            Ok(Some(Money::new(amount)))
        }
        None => Ok(default),
    }
}
