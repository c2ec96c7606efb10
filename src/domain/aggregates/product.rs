//! Product Aggregate

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::domain::events::{DomainEvent, ProductEvent};
use crate::domain::value_objects::{Money, Percent, Quantity, Sku};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Product {
    id: Uuid,
    sku: Sku,
    name: String,
    description: String,
    category_id: Uuid,
    price: Money,
    offer: Option<Percent>,
    stock: Quantity,
    images: Vec<String>,
    tags: Vec<String>,
    status: ProductStatus,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    #[serde(skip)]
    events: Vec<DomainEvent>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductStatus {
    #[default]
    Active,
    Unlisted,
}

/// Mutable catalog fields, shared by create and update.
#[derive(Clone, Debug)]
pub struct ProductDetails {
    pub name: String,
    pub description: String,
    pub category_id: Uuid,
    pub images: Vec<String>,
    pub tags: Vec<String>,
}

impl Product {
    pub fn create(sku: Sku, details: ProductDetails, price: Money, stock: u32) -> Result<Self, ProductError> {
        if details.name.trim().is_empty() {
            return Err(ProductError::MissingName);
        }
        if !price.is_positive() {
            return Err(ProductError::InvalidPrice);
        }
        let id = Uuid::now_v7();
        let now = Utc::now();
        let mut product = Self {
            id,
            sku: sku.clone(),
            name: details.name.trim().to_string(),
            description: details.description,
            category_id: details.category_id,
            price,
            offer: None,
            stock: Quantity::new(stock),
            images: details.images,
            tags: details.tags,
            status: ProductStatus::Active,
            created_at: now,
            updated_at: now,
            events: vec![],
        };
        product.raise_event(DomainEvent::Product(ProductEvent::Created { product_id: id, sku }));
        Ok(product)
    }

    pub fn id(&self) -> Uuid { self.id }
    pub fn sku(&self) -> &Sku { &self.sku }
    pub fn name(&self) -> &str { &self.name }
    pub fn description(&self) -> &str { &self.description }
    pub fn category_id(&self) -> Uuid { self.category_id }
    pub fn price(&self) -> Money { self.price }
    pub fn offer(&self) -> Option<Percent> { self.offer }
    pub fn stock(&self) -> Quantity { self.stock }
    pub fn images(&self) -> &[String] { &self.images }
    pub fn tags(&self) -> &[String] { &self.tags }
    pub fn status(&self) -> ProductStatus { self.status }
    pub fn created_at(&self) -> DateTime<Utc> { self.created_at }
    pub fn is_active(&self) -> bool { self.status == ProductStatus::Active }
    pub fn is_in_stock(&self) -> bool { !self.stock.is_zero() }

    /// Unit price after the better of the product and category offers.
    /// Offers never compound.
    pub fn effective_price(&self, category_offer: Option<Percent>) -> Money {
        match best_offer(self.offer, category_offer) {
            Some(p) => self.price.saturating_sub(self.price.percent(p)),
            None => self.price,
        }
    }

    pub fn matches_search(&self, needle: &str) -> bool {
        let needle = needle.to_lowercase();
        self.name.to_lowercase().contains(&needle)
            || self.description.to_lowercase().contains(&needle)
            || self.tags.iter().any(|t| t.to_lowercase().contains(&needle))
    }

    pub fn update_details(&mut self, details: ProductDetails) -> Result<(), ProductError> {
        if details.name.trim().is_empty() {
            return Err(ProductError::MissingName);
        }
        self.name = details.name.trim().to_string();
        self.description = details.description;
        self.category_id = details.category_id;
        self.images = details.images;
        self.tags = details.tags;
        self.touch();
        Ok(())
    }

    pub fn update_price(&mut self, new_price: Money) -> Result<(), ProductError> {
        if !new_price.is_positive() {
            return Err(ProductError::InvalidPrice);
        }
        self.price = new_price;
        self.touch();
        Ok(())
    }

    pub fn set_offer(&mut self, offer: Option<Percent>) {
        self.offer = offer;
        self.touch();
    }

    pub fn list(&mut self) { self.status = ProductStatus::Active; self.touch(); }
    pub fn unlist(&mut self) { self.status = ProductStatus::Unlisted; self.touch(); }

    pub fn add_stock(&mut self, qty: u32) {
        self.stock = self.stock.add(qty);
        self.touch();
        self.raise_event(DomainEvent::Product(ProductEvent::StockAdded { product_id: self.id, quantity: qty }));
    }

    pub fn remove_stock(&mut self, qty: u32) -> Result<(), ProductError> {
        self.stock = self.stock.subtract(qty).ok_or(ProductError::InsufficientStock {
            available: self.stock.value(),
            requested: qty,
        })?;
        self.touch();
        self.raise_event(DomainEvent::Product(ProductEvent::StockRemoved { product_id: self.id, quantity: qty }));
        Ok(())
    }

    pub fn take_events(&mut self) -> Vec<DomainEvent> { std::mem::take(&mut self.events) }
    fn raise_event(&mut self, e: DomainEvent) { self.events.push(e); }
    fn touch(&mut self) { self.updated_at = Utc::now(); }
}

fn best_offer(a: Option<Percent>, b: Option<Percent>) -> Option<Percent> {
    match (a, b) {
        (Some(x), Some(y)) => Some(x.max(y)),
        (x, y) => x.or(y),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProductError {
    #[error("Missing name")]
    MissingName,
    #[error("Price must be greater than zero")]
    InvalidPrice,
    #[error("Insufficient stock: {available} available, {requested} requested")]
    InsufficientStock { available: u32, requested: u32 },
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn details() -> ProductDetails {
        ProductDetails {
            name: "Test Product".into(),
            description: "A sturdy widget".into(),
            category_id: Uuid::nil(),
            images: vec![],
            tags: vec!["Garden".into()],
        }
    }

    fn pct(n: i64) -> Percent {
        Percent::new(Decimal::new(n, 0)).unwrap()
    }

    #[test]
    fn test_product_create() {
        let p = Product::create(Sku::new("TEST-001").unwrap(), details(), Money::from_cents(1999), 0).unwrap();
        assert_eq!(p.name(), "Test Product");
        assert!(p.is_active());
        assert!(!p.is_in_stock());
    }

    #[test]
    fn rejects_zero_price() {
        let err = Product::create(Sku::new("T").unwrap(), details(), Money::ZERO, 1).unwrap_err();
        assert_eq!(err, ProductError::InvalidPrice);
    }

    #[test]
    fn test_stock() {
        let mut p = Product::create(Sku::new("TEST").unwrap(), details(), Money::from_cents(1000), 0).unwrap();
        p.add_stock(10);
        assert!(p.is_in_stock());
        p.remove_stock(5).unwrap();
        assert_eq!(p.stock().value(), 5);
        assert_eq!(p.remove_stock(6), Err(ProductError::InsufficientStock { available: 5, requested: 6 }));
        assert_eq!(p.stock().value(), 5);
    }

    #[test]
    fn larger_offer_wins() {
        let mut p = Product::create(Sku::new("OFF").unwrap(), details(), Money::from_cents(20000), 1).unwrap();
        assert_eq!(p.effective_price(None), Money::from_cents(20000));
        p.set_offer(Some(pct(10)));
        assert_eq!(p.effective_price(None), Money::from_cents(18000));
        assert_eq!(p.effective_price(Some(pct(25))), Money::from_cents(15000));
        assert_eq!(p.effective_price(Some(pct(5))), Money::from_cents(18000));
    }

    #[test]
    fn search_matches_tags_case_insensitively() {
        let p = Product::create(Sku::new("S").unwrap(), details(), Money::from_cents(100), 1).unwrap();
        assert!(p.matches_search("garden"));
        assert!(p.matches_search("WIDGET"));
        assert!(!p.matches_search("kitchen"));
    }
}
