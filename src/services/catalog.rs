//! Storefront catalog queries.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use crate::domain::aggregates::{Category, Product, ProductDetails};
use crate::domain::value_objects::{Money, Percent, Sku};
use crate::error::{EcommerceError, Result};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub category: Option<Uuid>,
    pub search: Option<String>,
    pub min_price: Option<Money>,
    pub max_price: Option<Money>,
    pub sort: Option<SortOrder>,
}

#[derive(Clone, Copy, Debug, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    PriceAsc,
    PriceDesc,
    NameAsc,
    NameDesc,
    #[default]
    Newest,
}

#[derive(Debug, Serialize)]
pub struct PaginatedResponse<T> {
    pub data: Vec<T>,
    pub total: usize,
    pub page: u32,
    pub per_page: u32,
}

impl<T> PaginatedResponse<T> {
    /// `page` starts at 1; `per_page` defaults to 20 and is capped at 100.
    pub fn paginate(items: Vec<T>, page: Option<u32>, per_page: Option<u32>) -> Self {
        let page = page.unwrap_or(1).max(1);
        let per_page = per_page.unwrap_or(20).clamp(1, 100);
        let total = items.len();
        let skip = (page as usize - 1).saturating_mul(per_page as usize);
        let data = items.into_iter().skip(skip).take(per_page as usize).collect();
        Self { data, total, page, per_page }
    }
}

/// A product as shown to shoppers, priced with any active offer.
#[derive(Debug, Serialize)]
pub struct ProductView {
    pub id: Uuid,
    pub sku: Sku,
    pub name: String,
    pub description: String,
    pub category_id: Uuid,
    pub category: String,
    pub price: Money,
    pub offer_price: Money,
    pub offer: Option<Percent>,
    pub in_stock: bool,
    pub stock: u32,
    pub images: Vec<String>,
    pub tags: Vec<String>,
}

impl ProductView {
    pub fn new(product: &Product, category: &Category) -> Self {
        let offer = match (product.offer(), category.offer()) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (a, b) => a.or(b),
        };
        Self {
            id: product.id(),
            sku: product.sku().clone(),
            name: product.name().to_string(),
            description: product.description().to_string(),
            category_id: category.id(),
            category: category.name().to_string(),
            price: product.price(),
            offer_price: product.effective_price(category.offer()),
            offer,
            in_stock: product.is_in_stock(),
            stock: product.stock().value(),
            images: product.images().to_vec(),
            tags: product.tags().to_vec(),
        }
    }
}

pub async fn categories_by_id(state: &AppState) -> Result<HashMap<Uuid, Category>> {
    let all: Vec<Category> = state.store.all().await?;
    Ok(all.into_iter().map(|c| (c.id(), c)).collect())
}

/// Listed categories, for the storefront navigation.
pub async fn listed_categories(state: &AppState) -> Result<Vec<Category>> {
    let all: Vec<Category> = state.store.all().await?;
    Ok(all.into_iter().filter(Category::is_listed).collect())
}

pub async fn list(state: &AppState, params: ListParams) -> Result<PaginatedResponse<ProductView>> {
    let categories = categories_by_id(state).await?;
    let products: Vec<Product> = state.store.all().await?;

    let search = params.search.as_deref().map(str::trim).filter(|s| !s.is_empty());
    let mut views: Vec<(ProductView, chrono::DateTime<chrono::Utc>)> = products
        .iter()
        .filter(|p| p.is_active())
        .filter(|p| params.category.map_or(true, |c| p.category_id() == c))
        .filter(|p| search.map_or(true, |s| p.matches_search(s)))
        .filter_map(|p| {
            let category = categories.get(&p.category_id()).filter(|c| c.is_listed())?;
            Some((ProductView::new(p, category), p.created_at()))
        })
        .filter(|(v, _)| params.min_price.map_or(true, |min| v.offer_price >= min))
        .filter(|(v, _)| params.max_price.map_or(true, |max| v.offer_price <= max))
        .collect();

    match params.sort.unwrap_or_default() {
        SortOrder::PriceAsc => views.sort_by(|a, b| a.0.offer_price.cmp(&b.0.offer_price)),
        SortOrder::PriceDesc => views.sort_by(|a, b| b.0.offer_price.cmp(&a.0.offer_price)),
        SortOrder::NameAsc => views.sort_by_cached_key(|v| v.0.name.to_lowercase()),
        SortOrder::NameDesc => {
            views.sort_by_cached_key(|v| v.0.name.to_lowercase());
            views.reverse();
        }
        SortOrder::Newest => views.sort_by(|a, b| b.1.cmp(&a.1)),
    }

    let views: Vec<ProductView> = views.into_iter().map(|(v, _)| v).collect();
    Ok(PaginatedResponse::paginate(views, params.page, params.per_page))
}

/// A product visible on the storefront: active, in a listed category.
pub async fn visible_product(state: &AppState, id: Uuid) -> Result<ProductView> {
    let product: Product = state.store.get(id).await?.ok_or(EcommerceError::ProductNotFound)?;
    let category: Category = state.store.get(product.category_id()).await?.ok_or(EcommerceError::ProductNotFound)?;
    if !product.is_active() || !category.is_listed() {
        return Err(EcommerceError::ProductNotFound);
    }
    Ok(ProductView::new(&product, &category))
}

/// Admin input for creating or replacing a product's editable fields.
pub struct ProductInput {
    pub details: ProductDetails,
    pub price: Money,
    pub offer: Option<Percent>,
}

async fn require_category(state: &AppState, id: Uuid) -> Result<Category> {
    state.store.get(id).await?.ok_or(EcommerceError::CategoryNotFound)
}

async fn load_product(state: &AppState, id: Uuid) -> Result<Product> {
    state.store.get(id).await?.ok_or(EcommerceError::ProductNotFound)
}

async fn save_product(state: &AppState, product: &mut Product) -> Result<()> {
    state.store.put(&*product).await?;
    state.events.publish(product.take_events()).await;
    Ok(())
}

pub async fn create_product(state: &AppState, sku: Sku, input: ProductInput, stock: u32) -> Result<Product> {
    require_category(state, input.details.category_id).await?;
    if state.store.find_one_by::<Product>("sku", sku.as_str()).await?.is_some() {
        return Err(EcommerceError::Conflict(format!("SKU {sku} already exists")));
    }
    let mut product = Product::create(sku, input.details, input.price, stock)?;
    product.set_offer(input.offer);
    save_product(state, &mut product).await?;
    tracing::info!(product_id = %product.id(), sku = %product.sku(), "product created");
    Ok(product)
}

pub async fn update_product(state: &AppState, id: Uuid, input: ProductInput) -> Result<Product> {
    let mut product = load_product(state, id).await?;
    require_category(state, input.details.category_id).await?;
    product.update_details(input.details)?;
    product.update_price(input.price)?;
    product.set_offer(input.offer);
    save_product(state, &mut product).await?;
    Ok(product)
}

pub async fn set_product_listed(state: &AppState, id: Uuid, listed: bool) -> Result<Product> {
    let mut product = load_product(state, id).await?;
    if listed {
        product.list();
    } else {
        product.unlist();
    }
    save_product(state, &mut product).await?;
    tracing::info!(product_id = %id, listed, "product listing changed");
    Ok(product)
}

pub async fn restock(state: &AppState, id: Uuid, quantity: u32) -> Result<Product> {
    let mut product = load_product(state, id).await?;
    product.add_stock(quantity);
    save_product(state, &mut product).await?;
    Ok(product)
}

/// All products, listed or not, newest first.
pub async fn all_products(state: &AppState) -> Result<Vec<Product>> {
    let mut products: Vec<Product> = state.store.all().await?;
    products.sort_by(|a, b| b.created_at().cmp(&a.created_at()));
    Ok(products)
}

async fn ensure_unique_name(state: &AppState, name: &str, except: Option<Uuid>) -> Result<()> {
    let all: Vec<Category> = state.store.all().await?;
    if all.iter().any(|c| c.has_name(name) && Some(c.id()) != except) {
        return Err(EcommerceError::Conflict(format!("Category {} already exists", name.trim())));
    }
    Ok(())
}

pub async fn create_category(state: &AppState, name: &str, description: Option<String>, offer: Option<Percent>) -> Result<Category> {
    ensure_unique_name(state, name, None).await?;
    let mut category = Category::create(name, description);
    category.set_offer(offer);
    state.store.put(&category).await?;
    tracing::info!(category_id = %category.id(), name = %category.name(), "category created");
    Ok(category)
}

pub async fn update_category(
    state: &AppState,
    id: Uuid,
    name: &str,
    description: Option<String>,
    offer: Option<Percent>,
) -> Result<Category> {
    let mut category = require_category(state, id).await?;
    ensure_unique_name(state, name, Some(id)).await?;
    category.update(name, description);
    category.set_offer(offer);
    state.store.put(&category).await?;
    Ok(category)
}

/// Unlisting a category hides its products from the storefront without
/// touching them.
pub async fn set_category_listed(state: &AppState, id: Uuid, listed: bool) -> Result<Category> {
    let mut category = require_category(state, id).await?;
    if listed {
        category.list();
    } else {
        category.unlist();
    }
    state.store.put(&category).await?;
    tracing::info!(category_id = %id, listed, "category listing changed");
    Ok(category)
}

pub async fn all_categories(state: &AppState) -> Result<Vec<Category>> {
    let mut all: Vec<Category> = state.store.all().await?;
    all.sort_by_cached_key(|c| c.name().to_lowercase());
    Ok(all)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    async fn seed(state: &AppState, category: &Category, name: &str, cents: i64) -> Product {
        let details = ProductDetails {
            name: name.into(),
            description: format!("{name} description"),
            category_id: category.id(),
            images: vec![],
            tags: vec![],
        };
        let p = Product::create(Sku::new(name.replace(' ', "-")).unwrap(), details, Money::from_cents(cents), 5).unwrap();
        state.store.put(&p).await.unwrap();
        p
    }

    #[tokio::test]
    async fn lists_only_visible_products_sorted_and_paged() {
        let state = AppState::in_memory(Config::default());
        let shown = Category::create("Lighting", None);
        let mut hidden = Category::create("Hidden", None);
        hidden.unlist();
        state.store.put(&shown).await.unwrap();
        state.store.put(&hidden).await.unwrap();

        seed(&state, &shown, "Desk Lamp", 3000).await;
        seed(&state, &shown, "Floor Lamp", 9000).await;
        let mut off = seed(&state, &shown, "Bulb", 500).await;
        off.unlist();
        state.store.put(&off).await.unwrap();
        seed(&state, &hidden, "Secret Lamp", 100).await;

        let page = list(&state, ListParams { sort: Some(SortOrder::PriceDesc), ..Default::default() }).await.unwrap();
        let names: Vec<_> = page.data.iter().map(|v| v.name.as_str()).collect();
        assert_eq!(names, vec!["Floor Lamp", "Desk Lamp"]);

        let page = list(&state, ListParams { search: Some("desk".into()), ..Default::default() }).await.unwrap();
        assert_eq!(page.total, 1);

        let page = list(&state, ListParams { max_price: Some(Money::from_cents(5000)), ..Default::default() }).await.unwrap();
        assert_eq!(page.data[0].name, "Desk Lamp");

        let page = list(&state, ListParams { per_page: Some(1), page: Some(2), sort: Some(SortOrder::NameAsc), ..Default::default() }).await.unwrap();
        assert_eq!(page.total, 2);
        assert_eq!(page.data[0].name, "Floor Lamp");

        assert!(matches!(visible_product(&state, off.id()).await, Err(EcommerceError::ProductNotFound)));
    }

    #[tokio::test]
    async fn admin_catalog_rules() {
        let state = AppState::in_memory(Config::default());
        let lighting = create_category(&state, "Lighting", None, None).await.unwrap();
        let dup = create_category(&state, " lighting ", None, None).await.unwrap_err();
        assert!(matches!(dup, EcommerceError::Conflict(_)));

        let input = |name: &str| ProductInput {
            details: ProductDetails {
                name: name.into(),
                description: String::new(),
                category_id: lighting.id(),
                images: vec![],
                tags: vec!["lamp".into()],
            },
            price: Money::from_cents(2500),
            offer: Some(Percent::new(rust_decimal::Decimal::from(20)).unwrap()),
        };
        let lamp = create_product(&state, Sku::new("lamp-1").unwrap(), input("Lamp"), 4).await.unwrap();
        let dup = create_product(&state, Sku::new("LAMP-1").unwrap(), input("Lamp"), 4).await.unwrap_err();
        assert!(matches!(dup, EcommerceError::Conflict(_)));

        let view = visible_product(&state, lamp.id()).await.unwrap();
        assert_eq!(view.offer_price, Money::from_cents(2000));

        set_category_listed(&state, lighting.id(), false).await.unwrap();
        assert!(matches!(visible_product(&state, lamp.id()).await, Err(EcommerceError::ProductNotFound)));
        assert_eq!(restock(&state, lamp.id(), 6).await.unwrap().stock().value(), 10);
    }
}
