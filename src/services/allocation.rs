//! Proportional allocation of order-level amounts onto line items.
//!
//! Discount, tax and shipping are charged per order but refunded per line,
//! so each one is split across the lines by their share of the subtotal.
//! Splits are exact to the cent: parts are floored to cents and the
//! leftover cents go to the largest remainders (ties to the earlier line).
//! Refunding every line of an order therefore returns exactly its total.

use rust_decimal::Decimal;

use crate::domain::aggregates::LineItem;
use crate::domain::value_objects::Money;

/// Splits `amount` across `weights` proportionally. Parts are non-negative
/// and sum to `amount`. All-zero weights split evenly.
pub fn allocate(amount: Money, weights: &[Money]) -> Vec<Money> {
    if weights.is_empty() {
        return vec![];
    }
    let hundred = Decimal::ONE_HUNDRED;
    let cents = (amount.amount() * hundred).round();
    let mut total_weight: Decimal = weights.iter().map(|w| w.amount()).sum();
    let even = total_weight.is_zero();
    if even {
        total_weight = Decimal::from(weights.len());
    }

    let mut parts = Vec::with_capacity(weights.len());
    let mut remainders = Vec::with_capacity(weights.len());
    for (idx, w) in weights.iter().enumerate() {
        let weight = if even { Decimal::ONE } else { w.amount() };
        let exact = cents * weight / total_weight;
        let floor = exact.floor();
        parts.push(floor);
        remainders.push((idx, exact - floor));
    }

    let mut leftover = cents - parts.iter().copied().sum::<Decimal>();
    remainders.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    for (idx, _) in remainders {
        if leftover <= Decimal::ZERO {
            break;
        }
        parts[idx] += Decimal::ONE;
        leftover -= Decimal::ONE;
    }

    parts.into_iter().map(|c| Money::new(c / hundred)).collect()
}

/// Writes each line's share of `discount`, `tax` and `shipping`.
pub fn apportion(items: &mut [LineItem], discount: Money, tax: Money, shipping: Money) {
    let weights: Vec<Money> = items.iter().map(|i| i.line_total).collect();
    let discounts = allocate(discount, &weights);
    let taxes = allocate(tax, &weights);
    let shipping = allocate(shipping, &weights);
    for (i, item) in items.iter_mut().enumerate() {
        item.allocated_discount = discounts[i];
        item.allocated_tax = taxes[i];
        item.allocated_shipping = shipping[i];
    }
}

/// Refund owed when a line is cancelled before it ships.
pub fn cancellation_refund(item: &LineItem) -> Money {
    item.refundable(true)
}

/// Refund owed when a delivered line comes back; shipping was consumed.
pub fn return_refund(item: &LineItem) -> Money {
    item.refundable(false)
}
