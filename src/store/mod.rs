//! Document persistence.
//!
//! Every aggregate is stored whole, as one JSON document per id inside a
//! named collection. Lookups are by id or by equality on a top-level field.
//! Two backends share these semantics: Postgres (JSONB) for deployments and
//! an in-memory map for tests and database-less runs.

mod memory;
mod postgres;

use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::aggregates::{Cart, Category, Coupon, Order, Product, Session, User, Wallet};
use crate::error::Result;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// An aggregate that can be persisted as a document.
pub trait Document: Serialize + DeserializeOwned + Send + Sync {
    const COLLECTION: &'static str;
    fn document_id(&self) -> Uuid;
}

#[derive(Clone)]
pub enum Store {
    Memory(Arc<MemoryStore>),
    Postgres(PgStore),
}

impl Store {
    pub fn in_memory() -> Self {
        Store::Memory(Arc::new(MemoryStore::default()))
    }

    pub async fn get<D: Document>(&self, id: Uuid) -> Result<Option<D>> {
        match self {
            Store::Memory(m) => m.get(id).await,
            Store::Postgres(p) => p.get(id).await,
        }
    }

    pub async fn put<D: Document>(&self, doc: &D) -> Result<()> {
        match self {
            Store::Memory(m) => m.put(doc).await,
            Store::Postgres(p) => p.put(doc).await,
        }
    }

    pub async fn delete<D: Document>(&self, id: Uuid) -> Result<bool> {
        match self {
            Store::Memory(m) => m.delete::<D>(id).await,
            Store::Postgres(p) => p.delete::<D>(id).await,
        }
    }

    /// Every document of the collection, oldest first.
    pub async fn all<D: Document>(&self) -> Result<Vec<D>> {
        match self {
            Store::Memory(m) => m.all().await,
            Store::Postgres(p) => p.all().await,
        }
    }

    /// Documents whose top-level string `field` equals `value`, oldest first.
    pub async fn find_by<D: Document>(&self, field: &str, value: &str) -> Result<Vec<D>> {
        match self {
            Store::Memory(m) => m.find_by(field, value).await,
            Store::Postgres(p) => p.find_by(field, value).await,
        }
    }

    pub async fn find_one_by<D: Document>(&self, field: &str, value: &str) -> Result<Option<D>> {
        Ok(self.find_by(field, value).await?.into_iter().next())
    }
}

impl Document for User {
    const COLLECTION: &'static str = "users";
    fn document_id(&self) -> Uuid { self.id() }
}

impl Document for Session {
    const COLLECTION: &'static str = "sessions";
    fn document_id(&self) -> Uuid { self.id }
}

impl Document for Category {
    const COLLECTION: &'static str = "categories";
    fn document_id(&self) -> Uuid { self.id() }
}

impl Document for Product {
    const COLLECTION: &'static str = "products";
    fn document_id(&self) -> Uuid { self.id() }
}

impl Document for Cart {
    const COLLECTION: &'static str = "carts";
    fn document_id(&self) -> Uuid { self.id() }
}

impl Document for Order {
    const COLLECTION: &'static str = "orders";
    fn document_id(&self) -> Uuid { self.id() }
}

impl Document for Wallet {
    const COLLECTION: &'static str = "wallets";
    fn document_id(&self) -> Uuid { self.id() }
}

impl Document for Coupon {
    const COLLECTION: &'static str = "coupons";
    fn document_id(&self) -> Uuid { self.id() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::Credentials;

    fn user(email: &str) -> User {
        User::register("T", email, Credentials { password_hash: "h".into(), salt: "s".into() }, email.to_uppercase(), None)
    }

    #[tokio::test]
    async fn memory_store_roundtrip_and_lookup() {
        let store = Store::in_memory();
        let a = user("a@x.io");
        let b = user("b@x.io");
        store.put(&a).await.unwrap();
        store.put(&b).await.unwrap();

        let got: User = store.get(a.id()).await.unwrap().unwrap();
        assert_eq!(got.email(), "a@x.io");

        let found: Option<User> = store.find_one_by("email", "b@x.io").await.unwrap();
        assert_eq!(found.unwrap().id(), b.id());

        let all: Vec<User> = store.all().await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].id(), a.id());

        assert!(store.delete::<User>(a.id()).await.unwrap());
        assert!(store.get::<User>(a.id()).await.unwrap().is_none());
        assert!(store.get::<Cart>(b.id()).await.unwrap().is_none());
    }
}
