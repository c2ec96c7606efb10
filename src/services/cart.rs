//! Shopping cart operations. Quantities are checked against stock and the
//! per-product cap when they change, and again at checkout.

use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

use crate::domain::aggregates::{Cart, CartError, Category, Product, ProductError, User};
use crate::error::{EcommerceError, Result};
use crate::services::{catalog, pricing, pricing::PricedLine, pricing::Quote};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct CartView {
    #[serde(flatten)]
    pub quote: Quote,
    /// Products still in the cart that can no longer be bought.
    pub unavailable: Vec<Uuid>,
}

pub async fn load(state: &AppState, user_id: Uuid) -> Result<Cart> {
    Ok(state.store.get(user_id).await?.unwrap_or_else(|| Cart::for_user(user_id)))
}

/// The category of a product that can be sold right now.
pub(crate) fn sellable<'a>(product: &Product, category: Option<&'a Category>) -> Option<&'a Category> {
    category.filter(|c| product.is_active() && c.is_listed())
}

/// Quotes the purchasable part of the cart; unavailable lines are reported
/// instead of failing the whole view.
pub async fn view(state: &AppState, user: &User) -> Result<CartView> {
    let cart = load(state, user.id()).await?;
    let categories = catalog::categories_by_id(state).await?;
    let mut lines = Vec::new();
    let mut unavailable = Vec::new();
    for item in cart.items() {
        let product: Option<Product> = state.store.get(item.product_id).await?;
        match product {
            Some(p) if item.quantity <= p.stock().value() => match sellable(&p, categories.get(&p.category_id())) {
                Some(c) => lines.push(PricedLine::new(&p, c.offer(), item.quantity)),
                None => unavailable.push(item.product_id),
            },
            _ => unavailable.push(item.product_id),
        }
    }
    let quote = pricing::quote(lines, None, user.id(), &state.config.pricing, Utc::now())?;
    Ok(CartView { quote, unavailable })
}

fn check_quantity(state: &AppState, stock: u32, quantity: u32) -> Result<()> {
    let max = state.config.max_quantity_per_item;
    if quantity > max {
        return Err(CartError::QuantityLimit { max }.into());
    }
    if quantity > stock {
        return Err(ProductError::InsufficientStock { available: stock, requested: quantity }.into());
    }
    Ok(())
}

pub async fn add_item(state: &AppState, user: &User, product_id: Uuid, quantity: u32) -> Result<CartView> {
    if quantity == 0 {
        return Err(CartError::InvalidQuantity.into());
    }
    let product = catalog::visible_product(state, product_id).await?;
    let mut cart = load(state, user.id()).await?;
    let wanted = cart
        .quantity_of(product_id)
        .checked_add(quantity)
        .ok_or(CartError::QuantityLimit { max: state.config.max_quantity_per_item })?;
    check_quantity(state, product.stock, wanted)?;
    cart.add_item(product_id, quantity)?;
    state.store.put(&cart).await?;
    view(state, user).await
}

/// Sets a line's quantity; zero removes it.
pub async fn set_quantity(state: &AppState, user: &User, product_id: Uuid, quantity: u32) -> Result<CartView> {
    let mut cart = load(state, user.id()).await?;
    if quantity > 0 {
        if cart.quantity_of(product_id) == 0 {
            return Err(CartError::ItemNotFound.into());
        }
        let product = catalog::visible_product(state, product_id).await?;
        check_quantity(state, product.stock, quantity)?;
    }
    cart.update_quantity(product_id, quantity)?;
    state.store.put(&cart).await?;
    view(state, user).await
}

pub async fn remove_item(state: &AppState, user: &User, product_id: Uuid) -> Result<CartView> {
    let mut cart = load(state, user.id()).await?;
    cart.remove_item(product_id)?;
    state.store.put(&cart).await?;
    view(state, user).await
}

pub async fn clear(state: &AppState, user: &User) -> Result<()> {
    let mut cart = load(state, user.id()).await?;
    cart.clear();
    state.store.put(&cart).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth;
    use crate::config::Config;
    use crate::domain::aggregates::ProductDetails;
    use crate::domain::value_objects::{Money, Sku};

    async fn setup() -> (AppState, User, Product) {
        let state = AppState::in_memory(Config { max_quantity_per_item: 4, ..Config::default() });
        let category = Category::create("Books", None);
        state.store.put(&category).await.unwrap();
        let details = ProductDetails {
            name: "Rust in Action".into(),
            description: String::new(),
            category_id: category.id(),
            images: vec![],
            tags: vec![],
        };
        let product = Product::create(Sku::new("RIA-1").unwrap(), details, Money::from_cents(4000), 3).unwrap();
        state.store.put(&product).await.unwrap();
        let user = User::register("Bo", "bo@x.io", auth::new_credentials("pw"), "BO000001".into(), None);
        state.store.put(&user).await.unwrap();
        (state, user, product)
    }

    #[tokio::test]
    async fn quantities_respect_stock_and_cap() {
        let (state, user, product) = setup().await;
        let view = add_item(&state, &user, product.id(), 2).await.unwrap();
        assert_eq!(view.quote.subtotal, Money::from_cents(8000));

        let err = add_item(&state, &user, product.id(), 2).await.unwrap_err();
        assert!(matches!(err, EcommerceError::Product(ProductError::InsufficientStock { available: 3, requested: 4 })));
        let err = set_quantity(&state, &user, product.id(), 5).await.unwrap_err();
        assert!(matches!(err, EcommerceError::Cart(CartError::QuantityLimit { max: 4 })));

        let err = add_item(&state, &user, product.id(), u32::MAX).await.unwrap_err();
        assert!(matches!(err, EcommerceError::Cart(CartError::QuantityLimit { max: 4 })));
        assert_eq!(load(&state, user.id()).await.unwrap().quantity_of(product.id()), 2);

        let view = set_quantity(&state, &user, product.id(), 0).await.unwrap();
        assert!(view.quote.lines.is_empty());
        assert_eq!(view.quote.total, Money::ZERO);
    }

    #[tokio::test]
    async fn unlisted_products_show_as_unavailable() {
        let (state, user, mut product) = setup().await;
        add_item(&state, &user, product.id(), 1).await.unwrap();
        product.unlist();
        state.store.put(&product).await.unwrap();

        let view = view(&state, &user).await.unwrap();
        assert_eq!(view.unavailable, vec![product.id()]);
        assert!(matches!(add_item(&state, &user, product.id(), 1).await, Err(EcommerceError::ProductNotFound)));
    }
}
