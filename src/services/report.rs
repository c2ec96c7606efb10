//! Admin sales report.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use uuid::Uuid;

use crate::domain::aggregates::{Order, OrderStatus};
use crate::domain::value_objects::Money;
use crate::error::Result;
use crate::state::AppState;

const TOP_PRODUCTS: usize = 10;

#[derive(Debug, Default, Serialize)]
pub struct SalesReport {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub order_count: usize,
    pub gross: Money,
    pub discounts: Money,
    pub refunds: Money,
    pub net: Money,
    pub items_sold: u64,
    pub top_products: Vec<ProductSales>,
}

#[derive(Debug, Serialize)]
pub struct ProductSales {
    pub product_id: Uuid,
    pub name: String,
    pub quantity: u64,
    pub revenue: Money,
}

/// Orders created in `[from, to)`, either bound optional. Orders cancelled
/// before any money was collected are left out.
pub async fn sales(state: &AppState, from: Option<DateTime<Utc>>, to: Option<DateTime<Utc>>) -> Result<SalesReport> {
    let orders: Vec<Order> = state.store.all().await?;
    let mut report = SalesReport { from, to, ..Default::default() };
    let mut by_product: HashMap<Uuid, ProductSales> = HashMap::new();

    let in_range = |o: &&Order| from.map_or(true, |f| o.created_at() >= f) && to.map_or(true, |t| o.created_at() < t);
    let collected_or_open = |o: &&Order| o.status() != OrderStatus::Cancelled || o.amount_paid().is_positive();
    for order in orders.iter().filter(in_range).filter(collected_or_open) {
        report.order_count += 1;
        report.gross += order.total();
        report.discounts += order.discount();
        report.refunds += order.refunded();
        for item in order.items().iter().filter(|i| i.is_kept()) {
            report.items_sold += u64::from(item.quantity);
            let entry = by_product.entry(item.product_id).or_insert_with(|| ProductSales {
                product_id: item.product_id,
                name: item.name.clone(),
                quantity: 0,
                revenue: Money::ZERO,
            });
            entry.quantity += u64::from(item.quantity);
            entry.revenue += item.line_total;
        }
    }
    report.net = report.gross - report.refunds;

    let mut top: Vec<ProductSales> = by_product.into_values().collect();
    top.sort_by(|a, b| b.quantity.cmp(&a.quantity).then_with(|| a.name.cmp(&b.name)));
    top.truncate(TOP_PRODUCTS);
    report.top_products = top;
    Ok(report)
}
