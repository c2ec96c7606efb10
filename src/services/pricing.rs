//! Cart pricing and discount stacking.
//!
//! Order of application:
//! 1. the better of product and category offer on each unit price
//! 2. coupon on the offered subtotal
//! 3. tax on `subtotal - discount`
//! 4. flat shipping, waived when `subtotal - discount` reaches the threshold

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::config::PricingConfig;
use crate::domain::aggregates::{Coupon, CouponError, ItemStatus, LineItem, Product};
use crate::domain::value_objects::{Money, Percent, Sku};
use crate::services::allocation;

#[derive(Clone, Debug, Serialize)]
pub struct PricedLine {
    pub product_id: Uuid,
    pub name: String,
    pub sku: Sku,
    pub quantity: u32,
    pub list_price: Money,
    pub unit_price: Money,
    pub line_total: Money,
}

impl PricedLine {
    pub fn new(product: &Product, category_offer: Option<Percent>, quantity: u32) -> Self {
        let unit_price = product.effective_price(category_offer);
        Self {
            product_id: product.id(),
            name: product.name().to_string(),
            sku: product.sku().clone(),
            quantity,
            list_price: product.price(),
            unit_price,
            line_total: unit_price.times(quantity),
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct Quote {
    pub lines: Vec<PricedLine>,
    pub subtotal: Money,
    pub offer_savings: Money,
    pub coupon_code: Option<String>,
    pub discount: Money,
    pub tax: Money,
    pub shipping: Money,
    pub total: Money,
}

pub fn quote(
    lines: Vec<PricedLine>,
    coupon: Option<&Coupon>,
    user_id: Uuid,
    pricing: &PricingConfig,
    now: DateTime<Utc>,
) -> Result<Quote, CouponError> {
    let subtotal: Money = lines.iter().map(|l| l.line_total).sum();
    let offer_savings: Money = lines.iter().map(|l| l.list_price.times(l.quantity) - l.line_total).sum();
    let discount = match coupon {
        Some(c) => c.validate(user_id, subtotal, now)?,
        None => Money::ZERO,
    };
    let net = subtotal - discount;
    let tax = net.scale(pricing.tax_rate);
    let shipping = if lines.is_empty() || pricing.free_shipping_threshold.is_some_and(|t| net >= t) {
        Money::ZERO
    } else {
        pricing.shipping_fee
    };
    Ok(Quote {
        lines,
        subtotal,
        offer_savings,
        coupon_code: coupon.map(|c| c.code().to_string()),
        discount,
        tax,
        shipping,
        total: net + tax + shipping,
    })
}

impl Quote {
    /// Order lines carrying their share of discount, tax and shipping.
    pub fn to_line_items(&self) -> Vec<LineItem> {
        let mut items: Vec<LineItem> = self
            .lines
            .iter()
            .map(|l| LineItem {
                id: Uuid::now_v7(),
                product_id: l.product_id,
                name: l.name.clone(),
                sku: l.sku.clone(),
                quantity: l.quantity,
                unit_price: l.unit_price,
                line_total: l.line_total,
                allocated_discount: Money::ZERO,
                allocated_tax: Money::ZERO,
                allocated_shipping: Money::ZERO,
                status: ItemStatus::Active,
                reason: None,
            })
            .collect();
        allocation::apportion(&mut items, self.discount, self.tax, self.shipping);
        items
    }
}
