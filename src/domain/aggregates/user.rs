//! User Aggregate

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::domain::events::{DomainEvent, UserEvent};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct User {
    id: Uuid,
    name: String,
    email: String,
    password_hash: String,
    salt: String,
    role: Role,
    blocked: bool,
    referral_code: String,
    referred_by: Option<Uuid>,
    addresses: Vec<Address>,
    created_at: DateTime<Utc>,
    #[serde(skip)]
    events: Vec<DomainEvent>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    #[default]
    Customer,
    Admin,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub id: Uuid,
    pub name: String,
    pub line1: String,
    pub line2: Option<String>,
    pub city: String,
    pub state: Option<String>,
    pub zip: String,
    pub country: String,
    pub phone: Option<String>,
}

/// Credentials as stored; see `auth::hash_password`.
pub struct Credentials {
    pub password_hash: String,
    pub salt: String,
}

impl User {
    pub fn register(
        name: impl Into<String>,
        email: &str,
        credentials: Credentials,
        referral_code: String,
        referred_by: Option<Uuid>,
    ) -> Self {
        let id = Uuid::now_v7();
        let mut user = Self {
            id,
            name: name.into(),
            email: normalize_email(email),
            password_hash: credentials.password_hash,
            salt: credentials.salt,
            role: Role::Customer,
            blocked: false,
            referral_code,
            referred_by,
            addresses: vec![],
            created_at: Utc::now(),
            events: vec![],
        };
        user.raise_event(DomainEvent::User(UserEvent::Registered { user_id: id, referred_by }));
        user
    }

    pub fn id(&self) -> Uuid { self.id }
    pub fn name(&self) -> &str { &self.name }
    pub fn email(&self) -> &str { &self.email }
    pub fn password_hash(&self) -> &str { &self.password_hash }
    pub fn salt(&self) -> &str { &self.salt }
    pub fn role(&self) -> Role { self.role }
    pub fn is_admin(&self) -> bool { self.role == Role::Admin }
    pub fn is_blocked(&self) -> bool { self.blocked }
    pub fn referral_code(&self) -> &str { &self.referral_code }
    pub fn referred_by(&self) -> Option<Uuid> { self.referred_by }
    pub fn addresses(&self) -> &[Address] { &self.addresses }
    pub fn created_at(&self) -> DateTime<Utc> { self.created_at }

    pub fn promote_to_admin(&mut self) {
        self.role = Role::Admin;
    }

    pub fn block(&mut self) -> Result<(), UserError> {
        if self.is_admin() {
            return Err(UserError::CannotBlockAdmin);
        }
        self.blocked = true;
        self.raise_event(DomainEvent::User(UserEvent::Blocked { user_id: self.id }));
        Ok(())
    }

    pub fn unblock(&mut self) {
        self.blocked = false;
    }

    pub fn set_credentials(&mut self, credentials: Credentials) {
        self.password_hash = credentials.password_hash;
        self.salt = credentials.salt;
    }

    pub fn add_address(&mut self, mut address: Address) -> &Address {
        address.id = Uuid::now_v7();
        self.addresses.push(address);
        &self.addresses[self.addresses.len() - 1]
    }

    pub fn remove_address(&mut self, address_id: Uuid) -> Result<(), UserError> {
        let before = self.addresses.len();
        self.addresses.retain(|a| a.id != address_id);
        if self.addresses.len() == before {
            return Err(UserError::AddressNotFound);
        }
        Ok(())
    }

    pub fn address(&self, address_id: Uuid) -> Option<&Address> {
        self.addresses.iter().find(|a| a.id == address_id)
    }

    pub fn take_events(&mut self) -> Vec<DomainEvent> { std::mem::take(&mut self.events) }
    fn raise_event(&mut self, e: DomainEvent) { self.events.push(e); }
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Bearer session issued at login.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Session {
    pub id: Uuid,
    pub user_id: Uuid,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn issue(user_id: Uuid, ttl: Duration) -> Self {
        Self { id: Uuid::new_v4(), user_id, expires_at: Utc::now() + ttl }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UserError {
    #[error("Address not found")]
    AddressNotFound,
    #[error("Admin accounts cannot be blocked")]
    CannotBlockAdmin,
}
