//! Wallet Aggregate
//!
//! A per-user balance with an append-only transaction log. Every entry
//! records the balance after it was applied, so the log can be audited
//! against the balance at any point.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::events::{DomainEvent, WalletEvent};
use crate::domain::value_objects::Money;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Wallet {
    id: Uuid,
    balance: Money,
    transactions: Vec<WalletTransaction>,
    updated_at: DateTime<Utc>,
    #[serde(skip)]
    events: Vec<DomainEvent>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletTransaction {
    pub id: Uuid,
    pub kind: EntryKind,
    pub amount: Money,
    pub source: TransactionSource,
    pub order_id: Option<Uuid>,
    pub reference: Option<String>,
    pub description: String,
    pub balance_after: Money,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    Credit,
    Debit,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionSource {
    OrderPayment,
    Refund,
    ReferralReward,
    TopUp,
}

impl fmt::Display for TransactionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::OrderPayment => "order_payment",
            Self::Refund => "refund",
            Self::ReferralReward => "referral_reward",
            Self::TopUp => "top_up",
        };
        f.write_str(s)
    }
}

/// What a ledger entry is for.
#[derive(Clone, Debug)]
pub struct Entry {
    pub amount: Money,
    pub source: TransactionSource,
    pub order_id: Option<Uuid>,
    pub reference: Option<String>,
    pub description: String,
}

impl Wallet {
    /// A wallet is keyed by its owner's user id.
    pub fn open(user_id: Uuid) -> Self {
        Self { id: user_id, balance: Money::ZERO, transactions: vec![], updated_at: Utc::now(), events: vec![] }
    }

    pub fn id(&self) -> Uuid { self.id }
    pub fn user_id(&self) -> Uuid { self.id }
    pub fn balance(&self) -> Money { self.balance }
    pub fn transactions(&self) -> &[WalletTransaction] { &self.transactions }

    pub fn credit(&mut self, entry: Entry) -> Result<&WalletTransaction, WalletError> {
        if !entry.amount.is_positive() {
            return Err(WalletError::InvalidAmount);
        }
        self.balance += entry.amount;
        self.raise_event(DomainEvent::Wallet(WalletEvent::Credited {
            user_id: self.id,
            amount: entry.amount,
            source: entry.source.to_string(),
        }));
        Ok(self.append(EntryKind::Credit, entry))
    }

    pub fn debit(&mut self, entry: Entry) -> Result<&WalletTransaction, WalletError> {
        if !entry.amount.is_positive() {
            return Err(WalletError::InvalidAmount);
        }
        self.balance = self.balance.checked_sub(entry.amount).ok_or(WalletError::InsufficientBalance {
            balance: self.balance,
            requested: entry.amount,
        })?;
        self.raise_event(DomainEvent::Wallet(WalletEvent::Debited {
            user_id: self.id,
            amount: entry.amount,
            source: entry.source.to_string(),
        }));
        Ok(self.append(EntryKind::Debit, entry))
    }

    /// Recomputes the balance from the log; equal to `balance()` for any
    /// wallet built through `credit`/`debit`.
    pub fn replayed_balance(&self) -> Money {
        self.transactions.iter().fold(Money::ZERO, |acc, t| match t.kind {
            EntryKind::Credit => acc + t.amount,
            EntryKind::Debit => acc - t.amount,
        })
    }

    fn append(&mut self, kind: EntryKind, entry: Entry) -> &WalletTransaction {
        let now = Utc::now();
        self.transactions.push(WalletTransaction {
            id: Uuid::now_v7(),
            kind,
            amount: entry.amount,
            source: entry.source,
            order_id: entry.order_id,
            reference: entry.reference,
            description: entry.description,
            balance_after: self.balance,
            created_at: now,
        });
        self.updated_at = now;
        &self.transactions[self.transactions.len() - 1]
    }

    pub fn take_events(&mut self) -> Vec<DomainEvent> { std::mem::take(&mut self.events) }
    fn raise_event(&mut self, e: DomainEvent) { self.events.push(e); }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WalletError {
    #[error("Amount must be greater than zero")]
    InvalidAmount,
    #[error("Insufficient wallet balance: {balance} available, {requested} requested")]
    InsufficientBalance { balance: Money, requested: Money },
}
