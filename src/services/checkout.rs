//! Checkout: quoting the cart with a coupon and turning it into an order.

use chrono::Utc;
use rand::Rng;
use uuid::Uuid;

use crate::domain::aggregates::{
    Cart, CartError, Entry, Order, OrderDraft, PaymentMethod, Product, ProductError, TransactionSource, User, UserError,
};
use crate::error::{EcommerceError, Result};
use crate::payments;
use crate::services::{cart, catalog, coupons, ledger, pricing, pricing::PricedLine, pricing::Quote};
use crate::state::AppState;

pub struct PlaceOrder {
    pub address_id: Uuid,
    pub payment_method: PaymentMethod,
    pub coupon_code: Option<String>,
}

/// Every cart line must be purchasable at checkout.
async fn resolve_for_checkout(state: &AppState, basket: &Cart) -> Result<(Vec<PricedLine>, Vec<(Product, u32)>)> {
    let categories = catalog::categories_by_id(state).await?;
    let mut lines = Vec::with_capacity(basket.item_count());
    let mut products = Vec::with_capacity(basket.item_count());
    for item in basket.items() {
        let product: Product = state.store.get(item.product_id).await?.ok_or(EcommerceError::ProductNotFound)?;
        let category = cart::sellable(&product, categories.get(&product.category_id()))
            .ok_or_else(|| EcommerceError::Unavailable(format!("{} is no longer available", product.name())))?;
        if item.quantity > product.stock().value() {
            return Err(ProductError::InsufficientStock { available: product.stock().value(), requested: item.quantity }.into());
        }
        lines.push(PricedLine::new(&product, category.offer(), item.quantity));
        products.push((product, item.quantity));
    }
    Ok((lines, products))
}

pub async fn preview(state: &AppState, user: &User, coupon_code: Option<&str>) -> Result<Quote> {
    let cart = cart::load(state, user.id()).await?;
    if cart.is_empty() {
        return Err(CartError::Empty.into());
    }
    let (lines, _) = resolve_for_checkout(state, &cart).await?;
    let coupon = match coupon_code {
        Some(code) => Some(coupons::by_code(state, code).await?),
        None => None,
    };
    Ok(pricing::quote(lines, coupon.as_ref(), user.id(), &state.config.pricing, Utc::now())?)
}

fn new_order_number() -> String {
    format!("ORD-{:08}", rand::thread_rng().gen_range(0..100_000_000u32))
}

pub async fn place_order(state: &AppState, user: &User, req: PlaceOrder) -> Result<Order> {
    let mut cart = cart::load(state, user.id()).await?;
    if cart.is_empty() {
        return Err(CartError::Empty.into());
    }
    let address = user.address(req.address_id).cloned().ok_or(UserError::AddressNotFound)?;
    let (lines, products) = resolve_for_checkout(state, &cart).await?;
    let mut coupon = match req.coupon_code.as_deref() {
        Some(code) => Some(coupons::by_code(state, code).await?),
        None => None,
    };
    let quote = pricing::quote(lines, coupon.as_ref(), user.id(), &state.config.pricing, Utc::now())?;

    if req.payment_method == PaymentMethod::CashOnDelivery {
        if let Some(limit) = state.config.cod_limit.filter(|l| quote.total > *l) {
            return Err(EcommerceError::Unavailable(format!(
                "Cash on delivery is not available for orders above {limit}"
            )));
        }
    }

    let mut order = Order::place(OrderDraft {
        order_number: new_order_number(),
        user_id: user.id(),
        items: quote.to_line_items(),
        shipping_address: address,
        payment_method: req.payment_method,
        coupon_code: quote.coupon_code.clone(),
        discount: quote.discount,
        tax: quote.tax,
        shipping: quote.shipping,
    })?;

    if req.payment_method == PaymentMethod::Wallet {
        let reference = if order.total().is_zero() {
            None
        } else {
            let txn = ledger::debit(state, user.id(), Entry {
                amount: order.total(),
                source: TransactionSource::OrderPayment,
                order_id: Some(order.id()),
                reference: Some(order.order_number().to_string()),
                description: format!("Payment for order {}", order.order_number()),
            })
            .await?;
            Some(txn.id.to_string())
        };
        order.mark_paid(reference)?;
    }

    for (mut product, qty) in products {
        product.remove_stock(qty)?;
        state.store.put(&product).await?;
        state.events.publish(product.take_events()).await;
    }
    if let Some(c) = coupon.as_mut() {
        c.redeem(user.id());
        state.store.put(&*c).await?;
        state.events.publish(c.take_events()).await;
    }
    cart.clear();
    state.store.put(&cart).await?;
    state.store.put(&order).await?;
    state.events.publish(order.take_events()).await;

    tracing::info!(
        order_id = %order.id(),
        order_number = %order.order_number(),
        user_id = %user.id(),
        total = %order.total(),
        method = ?order.payment_method(),
        "order placed"
    );
    Ok(order)
}

/// Loads an order, hiding other customers' orders behind a 404.
pub async fn owned_order(state: &AppState, user: &User, order_id: Uuid) -> Result<Order> {
    let order: Order = state.store.get(order_id).await?.ok_or(EcommerceError::OrderNotFound)?;
    if order.user_id() != user.id() {
        return Err(EcommerceError::OrderNotFound);
    }
    Ok(order)
}

/// Gateway callback for online payments. The signature must cover the
/// amount still due, so lines cancelled before payment are never charged.
pub async fn confirm_payment(
    state: &AppState,
    user: &User,
    order_id: Uuid,
    reference: &str,
    signature: &str,
) -> Result<Order> {
    let mut order = owned_order(state, user, order_id).await?;
    if order.payment_method() != PaymentMethod::Online {
        return Err(EcommerceError::Unavailable("Order is not paid online".into()));
    }
    let amount = order.amount_due();
    if !payments::verify(&state.config.payment_signing_secret, &order.id().to_string(), reference, amount, signature) {
        tracing::warn!(order_id = %order.id(), %amount, "payment signature mismatch");
        return Err(EcommerceError::InvalidSignature);
    }
    order.mark_paid(Some(reference.to_string()))?;
    state.store.put(&order).await?;
    state.events.publish(order.take_events()).await;
    tracing::info!(order_id = %order.id(), %reference, "online payment confirmed");
    Ok(order)
}
