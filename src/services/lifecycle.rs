//! Post-checkout order handling: cancellation, returns, fulfilment status.
//!
//! Every path that takes items back restocks them and, when the order was
//! paid, refunds the items' share of the total into the customer's wallet.

use chrono::Utc;
use uuid::Uuid;

use crate::domain::aggregates::{
    Entry, ItemStatus, LineItem, Order, OrderError, OrderStatus, Product, TransactionSource,
};
use crate::domain::value_objects::Money;
use crate::error::{EcommerceError, Result};
use crate::services::{allocation, coupons, ledger};
use crate::state::AppState;

pub async fn load_order(state: &AppState, order_id: Uuid) -> Result<Order> {
    state.store.get(order_id).await?.ok_or(EcommerceError::OrderNotFound)
}

/// Orders newest first, optionally for a single customer or status.
pub async fn list_orders(state: &AppState, user_id: Option<Uuid>, status: Option<OrderStatus>) -> Result<Vec<Order>> {
    let mut orders: Vec<Order> = match user_id {
        Some(id) => state.store.find_by("user_id", &id.to_string()).await?,
        None => state.store.all().await?,
    };
    orders.retain(|o| status.map_or(true, |s| o.status() == s));
    orders.sort_by(|a, b| b.created_at().cmp(&a.created_at()));
    Ok(orders)
}

pub async fn cancel_order(state: &AppState, mut order: Order, reason: Option<String>) -> Result<Order> {
    let active: Vec<Uuid> = order.items().iter().filter(|i| i.status == ItemStatus::Active).map(|i| i.id).collect();
    if active.is_empty() {
        return Err(OrderError::NotCancellable(order.status()).into());
    }
    let mut lines = Vec::with_capacity(active.len());
    for id in active {
        lines.push(order.cancel_item(id, reason.clone())?);
    }
    settle_cancellation(state, &mut order, &lines).await?;
    Ok(order)
}

pub async fn cancel_item(state: &AppState, mut order: Order, item_id: Uuid, reason: Option<String>) -> Result<Order> {
    let line = order.cancel_item(item_id, reason)?;
    settle_cancellation(state, &mut order, std::slice::from_ref(&line)).await?;
    Ok(order)
}

async fn settle_cancellation(state: &AppState, order: &mut Order, lines: &[LineItem]) -> Result<()> {
    let amount: Money = lines.iter().map(allocation::cancellation_refund).sum();
    refund(state, order, amount, "cancelled").await?;
    for line in lines {
        restock(state, line).await?;
    }
    if order.status() == OrderStatus::Cancelled {
        release_coupon(state, order).await?;
    }
    save(state, order).await?;
    tracing::info!(order_id = %order.id(), items = lines.len(), status = %order.status(), "order items cancelled");
    Ok(())
}

pub async fn request_return(state: &AppState, mut order: Order, item_id: Uuid, reason: String) -> Result<Order> {
    order.request_return(item_id, reason, state.config.return_window(), Utc::now())?;
    save(state, &mut order).await?;
    tracing::info!(order_id = %order.id(), %item_id, "return requested");
    Ok(order)
}

pub async fn approve_return(state: &AppState, mut order: Order, item_id: Uuid) -> Result<Order> {
    let line = order.approve_return(item_id)?;
    refund(state, &mut order, allocation::return_refund(&line), "returned").await?;
    restock(state, &line).await?;
    save(state, &mut order).await?;
    tracing::info!(order_id = %order.id(), %item_id, "return approved");
    Ok(order)
}

pub async fn reject_return(state: &AppState, mut order: Order, item_id: Uuid) -> Result<Order> {
    order.reject_return(item_id)?;
    save(state, &mut order).await?;
    tracing::info!(order_id = %order.id(), %item_id, "return rejected");
    Ok(order)
}

/// Admin status change. Cancelling goes through the refund path.
pub async fn update_status(state: &AppState, mut order: Order, status: OrderStatus, note: Option<String>) -> Result<Order> {
    if status == OrderStatus::Cancelled {
        return cancel_order(state, order, note).await;
    }
    let from = order.status();
    order.advance(status, note)?;
    save(state, &mut order).await?;
    tracing::info!(order_id = %order.id(), %from, to = %status, "order status updated");
    Ok(order)
}

/// Credits `amount` back to the wallet when the order's money was
/// collected. Unpaid orders simply lose the lines.
async fn refund(state: &AppState, order: &mut Order, amount: Money, what: &str) -> Result<()> {
    if !order.is_paid() || !amount.is_positive() {
        return Ok(());
    }
    order.record_refund(amount)?;
    ledger::credit(state, order.user_id(), Entry {
        amount,
        source: TransactionSource::Refund,
        order_id: Some(order.id()),
        reference: Some(order.order_number().to_string()),
        description: format!("Refund for {what} items of order {}", order.order_number()),
    })
    .await?;
    tracing::info!(order_id = %order.id(), %amount, refunded = %order.refunded(), "refund issued");
    Ok(())
}

async fn restock(state: &AppState, line: &LineItem) -> Result<()> {
    let product: Option<Product> = state.store.get(line.product_id).await?;
    match product {
        Some(mut p) => {
            p.add_stock(line.quantity);
            state.store.put(&p).await?;
            state.events.publish(p.take_events()).await;
        }
        None => tracing::warn!(product_id = %line.product_id, "restock skipped, product no longer exists"),
    }
    Ok(())
}

async fn release_coupon(state: &AppState, order: &Order) -> Result<()> {
    let Some(code) = order.coupon_code() else {
        return Ok(());
    };
    match coupons::by_code(state, code).await {
        Ok(mut coupon) => {
            coupon.release(order.user_id());
            state.store.put(&coupon).await?;
            state.events.publish(coupon.take_events()).await;
            Ok(())
        }
        Err(EcommerceError::Coupon(_)) => {
            tracing::warn!(%code, "coupon to release no longer exists");
            Ok(())
        }
        Err(e) => Err(e),
    }
}

async fn save(state: &AppState, order: &mut Order) -> Result<()> {
    state.store.put(&*order).await?;
    state.events.publish(order.take_events()).await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth;
    use crate::config::Config;
    use crate::domain::aggregates::{
        Address, Cart, Category, Coupon, CouponTerms, Discount, PaymentMethod, PaymentStatus, ProductDetails, User,
    };
    use crate::domain::value_objects::{Percent, Sku};
    use crate::services::checkout::{self, PlaceOrder};
    use rust_decimal::Decimal;

    struct Shop {
        state: AppState,
        user: User,
        address_id: Uuid,
        lamp: Uuid,
        bulb: Uuid,
    }

    async fn product(state: &AppState, category: &Category, sku: &str, cents: i64) -> Uuid {
        let details = ProductDetails {
            name: sku.to_lowercase(),
            description: String::new(),
            category_id: category.id(),
            images: vec![],
            tags: vec![],
        };
        let p = Product::create(Sku::new(sku).unwrap(), details, Money::from_cents(cents), 5).unwrap();
        state.store.put(&p).await.unwrap();
        p.id()
    }

    async fn shop() -> Shop {
        let state = AppState::in_memory(Config::default());
        let category = Category::create("Lighting", None);
        state.store.put(&category).await.unwrap();
        let lamp = product(&state, &category, "LAMP", 3000).await;
        let bulb = product(&state, &category, "BULB", 1000).await;

        let mut user = User::register("Ada", "ada@example.com", auth::new_credentials("pw"), "ADA00001".into(), None);
        let address_id = user
            .add_address(Address {
                id: Uuid::nil(),
                name: "Ada".into(),
                line1: "1 Analytical Way".into(),
                line2: None,
                city: "London".into(),
                state: None,
                zip: "N1".into(),
                country: "UK".into(),
                phone: None,
            })
            .id;
        state.store.put(&user).await.unwrap();
        ledger::credit(&state, user.id(), Entry {
            amount: Money::from_cents(20_000),
            source: TransactionSource::TopUp,
            order_id: None,
            reference: None,
            description: "seed".into(),
        })
        .await
        .unwrap();
        Shop { state, user, address_id, lamp, bulb }
    }

    async fn order(shop: &Shop, method: PaymentMethod, coupon: Option<&str>) -> Order {
        let mut cart = Cart::for_user(shop.user.id());
        cart.add_item(shop.lamp, 1).unwrap();
        cart.add_item(shop.bulb, 2).unwrap();
        shop.state.store.put(&cart).await.unwrap();
        checkout::place_order(&shop.state, &shop.user, PlaceOrder {
            address_id: shop.address_id,
            payment_method: method,
            coupon_code: coupon.map(Into::into),
        })
        .await
        .unwrap()
    }

    async fn balance(shop: &Shop) -> Money {
        ledger::balance(&shop.state, shop.user.id()).await.unwrap()
    }

    async fn stock(shop: &Shop, id: Uuid) -> u32 {
        let p: Product = shop.state.store.get(id).await.unwrap().unwrap();
        p.stock().value()
    }

    fn line(order: &Order, product_id: Uuid) -> Uuid {
        order.items().iter().find(|i| i.product_id == product_id).unwrap().id
    }

    #[tokio::test]
    async fn cancelling_a_wallet_order_refunds_every_cent() {
        let shop = shop().await;
        let placed = order(&shop, PaymentMethod::Wallet, None).await;
        // 50.00 + 2.50 tax + 5.00 shipping
        assert_eq!(placed.total(), Money::from_cents(5750));
        assert_eq!(balance(&shop).await, Money::from_cents(14_250));
        assert_eq!(stock(&shop, shop.bulb).await, 3);

        let bulb_line = line(&placed, shop.bulb);
        let partly = cancel_item(&shop.state, placed, bulb_line, Some("changed mind".into())).await.unwrap();
        assert_eq!(partly.refunded(), Money::from_cents(2300));
        assert_eq!(partly.payment_status(), PaymentStatus::PartiallyRefunded);
        assert_eq!(partly.status(), OrderStatus::Pending);
        assert_eq!(stock(&shop, shop.bulb).await, 5);

        let cancelled = cancel_order(&shop.state, partly, None).await.unwrap();
        assert_eq!(cancelled.status(), OrderStatus::Cancelled);
        assert_eq!(cancelled.refunded(), cancelled.total());
        assert_eq!(cancelled.payment_status(), PaymentStatus::Refunded);
        assert_eq!(balance(&shop).await, Money::from_cents(20_000));

        let again = cancel_order(&shop.state, cancelled, None).await.unwrap_err();
        assert!(matches!(again, EcommerceError::Order(OrderError::NotCancellable(OrderStatus::Cancelled))));
    }

    #[tokio::test]
    async fn returns_refund_without_shipping_once_delivered() {
        let shop = shop().await;
        let mut placed = order(&shop, PaymentMethod::CashOnDelivery, None).await;
        assert_eq!(balance(&shop).await, Money::from_cents(20_000));
        let lamp_line = line(&placed, shop.lamp);

        let early = request_return(&shop.state, placed.clone(), lamp_line, "broken".into()).await.unwrap_err();
        assert!(matches!(early, EcommerceError::Order(OrderError::NotDelivered)));

        for status in [OrderStatus::Processing, OrderStatus::Shipped, OrderStatus::Delivered] {
            placed = update_status(&shop.state, placed, status, None).await.unwrap();
        }
        assert_eq!(placed.payment_status(), PaymentStatus::Paid);

        let requested = request_return(&shop.state, placed, lamp_line, "broken".into()).await.unwrap();
        let approved = approve_return(&shop.state, requested, lamp_line).await.unwrap();
        // 30.00 + 1.50 tax; its 3.00 of shipping is kept
        assert_eq!(approved.refunded(), Money::from_cents(3150));
        assert_eq!(approved.status(), OrderStatus::Delivered);
        assert_eq!(balance(&shop).await, Money::from_cents(23_150));
        assert_eq!(stock(&shop, shop.lamp).await, 5);

        let stored = load_order(&shop.state, approved.id()).await.unwrap();
        assert_eq!(stored.item(lamp_line).unwrap().status, ItemStatus::Returned);
    }

    #[tokio::test]
    async fn unpaid_cancellation_refunds_nothing_and_frees_the_coupon() {
        let shop = shop().await;
        let coupon = Coupon::create(CouponTerms {
            code: "save10".into(),
            description: "10% off".into(),
            discount: Discount::Percentage { percent: Percent::new(Decimal::from(10)).unwrap(), max_discount: None },
            min_purchase: Money::ZERO,
            expires_at: Utc::now() + chrono::Duration::days(1),
            usage_limit: Some(1),
            per_user_limit: 1,
        })
        .unwrap();
        shop.state.store.put(&coupon).await.unwrap();

        let placed = order(&shop, PaymentMethod::CashOnDelivery, Some("SAVE10")).await;
        assert_eq!(placed.discount(), Money::from_cents(500));
        let used: Coupon = shop.state.store.get(coupon.id()).await.unwrap().unwrap();
        assert_eq!(used.used_count(), 1);

        let placed = update_status(&shop.state, placed, OrderStatus::Processing, None).await.unwrap();
        let cancelled = update_status(&shop.state, placed, OrderStatus::Cancelled, Some("out of area".into())).await.unwrap();
        assert_eq!(cancelled.refunded(), Money::ZERO);
        assert_eq!(balance(&shop).await, Money::from_cents(20_000));

        let freed: Coupon = shop.state.store.get(coupon.id()).await.unwrap().unwrap();
        assert_eq!(freed.used_count(), 0);
        assert_eq!(freed.uses_by(shop.user.id()), 0);
    }

    #[tokio::test]
    async fn customer_order_listing_is_scoped() {
        let shop = shop().await;
        order(&shop, PaymentMethod::Wallet, None).await;
        assert_eq!(list_orders(&shop.state, Some(shop.user.id()), None).await.unwrap().len(), 1);
        assert!(list_orders(&shop.state, Some(Uuid::now_v7()), None).await.unwrap().is_empty());
        assert!(list_orders(&shop.state, None, Some(OrderStatus::Shipped)).await.unwrap().is_empty());
    }
}
