//! Cart Aggregate
//!
//! The cart stores product references and quantities only. Prices are
//! resolved when the cart is quoted so offer changes apply immediately.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Cart {
    id: Uuid,
    items: Vec<CartItem>,
    updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub product_id: Uuid,
    pub quantity: u32,
}

impl Cart {
    /// A cart is keyed by its owner's user id.
    pub fn for_user(user_id: Uuid) -> Self {
        Self { id: user_id, items: vec![], updated_at: Utc::now() }
    }

    pub fn id(&self) -> Uuid { self.id }
    pub fn items(&self) -> &[CartItem] { &self.items }
    pub fn item_count(&self) -> usize { self.items.len() }
    pub fn is_empty(&self) -> bool { self.items.is_empty() }

    pub fn quantity_of(&self, product_id: Uuid) -> u32 {
        self.items.iter().find(|i| i.product_id == product_id).map_or(0, |i| i.quantity)
    }

    pub fn add_item(&mut self, product_id: Uuid, quantity: u32) -> Result<u32, CartError> {
        if quantity == 0 {
            return Err(CartError::InvalidQuantity);
        }
        let total = match self.items.iter_mut().find(|i| i.product_id == product_id) {
            Some(existing) => {
                existing.quantity = existing
                    .quantity
                    .checked_add(quantity)
                    .ok_or(CartError::QuantityLimit { max: u32::MAX })?;
                existing.quantity
            }
            None => {
                self.items.push(CartItem { product_id, quantity });
                quantity
            }
        };
        self.touch();
        Ok(total)
    }

    pub fn update_quantity(&mut self, product_id: Uuid, quantity: u32) -> Result<(), CartError> {
        let item = self.items.iter_mut().find(|i| i.product_id == product_id).ok_or(CartError::ItemNotFound)?;
        if quantity == 0 {
            self.items.retain(|i| i.product_id != product_id);
        } else {
            item.quantity = quantity;
        }
        self.touch();
        Ok(())
    }

    pub fn remove_item(&mut self, product_id: Uuid) -> Result<(), CartError> {
        let before = self.items.len();
        self.items.retain(|i| i.product_id != product_id);
        if self.items.len() == before {
            return Err(CartError::ItemNotFound);
        }
        self.touch();
        Ok(())
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.touch();
    }

    fn touch(&mut self) { self.updated_at = Utc::now(); }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CartError {
    #[error("Item not found in cart")]
    ItemNotFound,
    #[error("Quantity must be at least 1")]
    InvalidQuantity,
    #[error("Cart is empty")]
    Empty,
    #[error("At most {max} units of one product per order")]
    QuantityLimit { max: u32 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cart_operations() {
        let p1 = Uuid::now_v7();
        let mut cart = Cart::for_user(Uuid::now_v7());
        cart.add_item(p1, 2).unwrap();
        assert_eq!(cart.item_count(), 1);
        assert_eq!(cart.add_item(p1, 1).unwrap(), 3); // Merged
        assert_eq!(cart.items()[0].quantity, 3);
        assert_eq!(cart.add_item(p1, 0), Err(CartError::InvalidQuantity));
        assert_eq!(cart.add_item(p1, u32::MAX), Err(CartError::QuantityLimit { max: u32::MAX }));
        assert_eq!(cart.quantity_of(p1), 3);
    }

    #[test]
    fn zero_quantity_update_removes_line() {
        let p1 = Uuid::now_v7();
        let mut cart = Cart::for_user(Uuid::now_v7());
        cart.add_item(p1, 2).unwrap();
        cart.update_quantity(p1, 0).unwrap();
        assert!(cart.is_empty());
        assert_eq!(cart.remove_item(p1), Err(CartError::ItemNotFound));
    }
}
