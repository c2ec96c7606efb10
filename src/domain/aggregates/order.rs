//! Order Aggregate
//!
//! Status lifecycle: `Pending -> Processing -> Shipped -> Delivered`, with
//! `Pending | Processing -> Cancelled` and `Delivered -> Returned`. Every
//! change is appended to `history`.
//!
//! Money invariants held by every order:
//! - `total == subtotal - discount + tax + shipping`
//! - the per-line allocations of discount, tax and shipping each sum exactly
//!   to the order-level figure
//! - `refunded <= amount_paid <= total`, where `amount_paid` is what was
//!   actually collected: lines cancelled before payment are never charged

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::aggregates::user::Address;
use crate::domain::events::{DomainEvent, OrderEvent};
use crate::domain::value_objects::{Money, Sku};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Order {
    id: Uuid,
    order_number: String,
    user_id: Uuid,
    items: Vec<LineItem>,
    shipping_address: Address,
    payment_method: PaymentMethod,
    payment_status: PaymentStatus,
    payment_reference: Option<String>,
    status: OrderStatus,
    history: Vec<StatusChange>,
    coupon_code: Option<String>,
    subtotal: Money,
    discount: Money,
    tax: Money,
    shipping: Money,
    total: Money,
    #[serde(default)]
    amount_paid: Money,
    refunded: Money,
    delivered_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    #[serde(skip)]
    events: Vec<DomainEvent>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub id: Uuid,
    pub product_id: Uuid,
    pub name: String,
    pub sku: Sku,
    pub quantity: u32,
    pub unit_price: Money,
    pub line_total: Money,
    pub allocated_discount: Money,
    pub allocated_tax: Money,
    pub allocated_shipping: Money,
    pub status: ItemStatus,
    pub reason: Option<String>,
}

impl LineItem {
    /// What the customer paid for this line, shipping share excluded.
    pub fn net_amount(&self) -> Money {
        self.line_total - self.allocated_discount + self.allocated_tax
    }

    /// Amount returned to the customer when this line is refunded. The
    /// shipping share is only refundable when the goods were never shipped.
    pub fn refundable(&self, include_shipping: bool) -> Money {
        if include_shipping {
            self.net_amount() + self.allocated_shipping
        } else {
            self.net_amount()
        }
    }

    /// Lines that still count as sold.
    pub fn is_kept(&self) -> bool {
        matches!(self.status, ItemStatus::Active | ItemStatus::ReturnRequested | ItemStatus::ReturnRejected)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    #[default]
    Active,
    Cancelled,
    ReturnRequested,
    Returned,
    ReturnRejected,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    Pending,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
    Returned,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Shipped => "shipped",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
            Self::Returned => "returned",
        }
    }

    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (self, next),
            (Pending, Processing)
                | (Processing, Shipped)
                | (Shipped, Delivered)
                | (Pending, Cancelled)
                | (Processing, Cancelled)
                | (Delivered, Returned)
        )
    }

    pub fn is_cancellable(&self) -> bool {
        matches!(self, Self::Pending | Self::Processing)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    CashOnDelivery,
    Wallet,
    Online,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Paid,
    PartiallyRefunded,
    Refunded,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusChange {
    pub status: OrderStatus,
    pub note: Option<String>,
    pub at: DateTime<Utc>,
}

/// Everything needed to place an order; line allocations are computed by
/// the caller and verified here.
pub struct OrderDraft {
    pub order_number: String,
    pub user_id: Uuid,
    pub items: Vec<LineItem>,
    pub shipping_address: Address,
    pub payment_method: PaymentMethod,
    pub coupon_code: Option<String>,
    pub discount: Money,
    pub tax: Money,
    pub shipping: Money,
}

impl Order {
    pub fn place(draft: OrderDraft) -> Result<Self, OrderError> {
        if draft.items.is_empty() {
            return Err(OrderError::NoItems);
        }
        let subtotal: Money = draft.items.iter().map(|i| i.line_total).sum();
        check_allocation("discount", draft.items.iter().map(|i| i.allocated_discount).sum(), draft.discount)?;
        check_allocation("tax", draft.items.iter().map(|i| i.allocated_tax).sum(), draft.tax)?;
        check_allocation("shipping", draft.items.iter().map(|i| i.allocated_shipping).sum(), draft.shipping)?;
        let total = (subtotal + draft.tax + draft.shipping)
            .checked_sub(draft.discount)
            .ok_or(OrderError::Unbalanced("discount exceeds order value"))?;

        let id = Uuid::now_v7();
        let now = Utc::now();
        let mut order = Self {
            id,
            order_number: draft.order_number,
            user_id: draft.user_id,
            items: draft.items,
            shipping_address: draft.shipping_address,
            payment_method: draft.payment_method,
            payment_status: PaymentStatus::Pending,
            payment_reference: None,
            status: OrderStatus::Pending,
            history: vec![StatusChange { status: OrderStatus::Pending, note: Some("order placed".into()), at: now }],
            coupon_code: draft.coupon_code,
            subtotal,
            discount: draft.discount,
            tax: draft.tax,
            shipping: draft.shipping,
            total,
            amount_paid: Money::ZERO,
            refunded: Money::ZERO,
            delivered_at: None,
            created_at: now,
            updated_at: now,
            events: vec![],
        };
        order.raise_event(DomainEvent::Order(OrderEvent::Placed { order_id: id, user_id: order.user_id, total }));
        Ok(order)
    }

    pub fn id(&self) -> Uuid { self.id }
    pub fn order_number(&self) -> &str { &self.order_number }
    pub fn user_id(&self) -> Uuid { self.user_id }
    pub fn items(&self) -> &[LineItem] { &self.items }
    pub fn shipping_address(&self) -> &Address { &self.shipping_address }
    pub fn payment_method(&self) -> PaymentMethod { self.payment_method }
    pub fn payment_status(&self) -> PaymentStatus { self.payment_status }
    pub fn payment_reference(&self) -> Option<&str> { self.payment_reference.as_deref() }
    pub fn status(&self) -> OrderStatus { self.status }
    pub fn history(&self) -> &[StatusChange] { &self.history }
    pub fn coupon_code(&self) -> Option<&str> { self.coupon_code.as_deref() }
    pub fn subtotal(&self) -> Money { self.subtotal }
    pub fn discount(&self) -> Money { self.discount }
    pub fn tax(&self) -> Money { self.tax }
    pub fn shipping(&self) -> Money { self.shipping }
    pub fn total(&self) -> Money { self.total }
    pub fn amount_paid(&self) -> Money { self.amount_paid }
    pub fn refunded(&self) -> Money { self.refunded }
    pub fn delivered_at(&self) -> Option<DateTime<Utc>> { self.delivered_at }
    pub fn created_at(&self) -> DateTime<Utc> { self.created_at }

    pub fn item(&self, item_id: Uuid) -> Option<&LineItem> {
        self.items.iter().find(|i| i.id == item_id)
    }

    /// Money has been collected and not fully given back.
    pub fn is_paid(&self) -> bool {
        matches!(self.payment_status, PaymentStatus::Paid | PaymentStatus::PartiallyRefunded)
    }

    /// What collecting payment now would charge: every line not yet
    /// cancelled, shipping share included.
    pub fn amount_due(&self) -> Money {
        self.items
            .iter()
            .filter(|i| i.status != ItemStatus::Cancelled)
            .map(|i| i.refundable(true))
            .sum()
    }

    /// Records payment of `amount_due()`.
    pub fn mark_paid(&mut self, reference: Option<String>) -> Result<(), OrderError> {
        if self.payment_status != PaymentStatus::Pending {
            return Err(OrderError::AlreadyPaid);
        }
        if self.status == OrderStatus::Cancelled {
            return Err(OrderError::InvalidTransition { from: self.status, to: self.status });
        }
        self.collect();
        self.payment_reference = reference.clone();
        self.touch();
        self.raise_event(DomainEvent::Order(OrderEvent::Paid {
            order_id: self.id,
            amount: self.amount_paid,
            reference,
        }));
        Ok(())
    }

    fn collect(&mut self) {
        self.amount_paid = self.amount_due();
        self.payment_status = PaymentStatus::Paid;
    }

    /// Forward fulfilment transitions. Cancellation and returns go through
    /// the item operations so refunds stay per line.
    pub fn advance(&mut self, to: OrderStatus, note: Option<String>) -> Result<(), OrderError> {
        if matches!(to, OrderStatus::Cancelled | OrderStatus::Returned) || !self.status.can_transition_to(to) {
            return Err(OrderError::InvalidTransition { from: self.status, to });
        }
        if to == OrderStatus::Processing
            && self.payment_method == PaymentMethod::Online
            && self.payment_status == PaymentStatus::Pending
        {
            return Err(OrderError::AwaitingPayment);
        }
        if to == OrderStatus::Delivered {
            self.delivered_at = Some(Utc::now());
            if self.payment_method == PaymentMethod::CashOnDelivery && self.payment_status == PaymentStatus::Pending {
                self.collect();
            }
        }
        self.set_status(to, note);
        Ok(())
    }

    pub fn cancel_item(&mut self, item_id: Uuid, reason: Option<String>) -> Result<LineItem, OrderError> {
        if !self.status.is_cancellable() {
            return Err(OrderError::NotCancellable(self.status));
        }
        let item = self.item_mut(item_id)?;
        if item.status != ItemStatus::Active {
            return Err(OrderError::ItemNotActive);
        }
        item.status = ItemStatus::Cancelled;
        item.reason = reason;
        let cancelled = item.clone();
        self.raise_event(DomainEvent::Order(OrderEvent::ItemCancelled { order_id: self.id, item_id }));
        if self.items.iter().all(|i| i.status == ItemStatus::Cancelled) {
            self.set_status(OrderStatus::Cancelled, cancelled.reason.clone());
        } else {
            self.touch();
        }
        Ok(cancelled)
    }

    pub fn request_return(
        &mut self,
        item_id: Uuid,
        reason: String,
        window: Duration,
        now: DateTime<Utc>,
    ) -> Result<(), OrderError> {
        if self.status != OrderStatus::Delivered {
            return Err(OrderError::NotDelivered);
        }
        if self.delivered_at.is_some_and(|at| now >= at + window) {
            return Err(OrderError::ReturnWindowClosed);
        }
        let item = self.item_mut(item_id)?;
        if item.status != ItemStatus::Active {
            return Err(OrderError::ItemNotActive);
        }
        item.status = ItemStatus::ReturnRequested;
        item.reason = Some(reason);
        self.touch();
        self.raise_event(DomainEvent::Order(OrderEvent::ReturnRequested { order_id: self.id, item_id }));
        Ok(())
    }

    pub fn approve_return(&mut self, item_id: Uuid) -> Result<LineItem, OrderError> {
        let item = self.item_mut(item_id)?;
        if item.status != ItemStatus::ReturnRequested {
            return Err(OrderError::NoReturnRequested);
        }
        item.status = ItemStatus::Returned;
        let returned = item.clone();
        self.raise_event(DomainEvent::Order(OrderEvent::ItemReturned { order_id: self.id, item_id }));
        let all_back = self
            .items
            .iter()
            .filter(|i| i.status != ItemStatus::Cancelled)
            .all(|i| i.status == ItemStatus::Returned);
        if all_back {
            self.set_status(OrderStatus::Returned, Some("all items returned".into()));
        } else {
            self.touch();
        }
        Ok(returned)
    }

    pub fn reject_return(&mut self, item_id: Uuid) -> Result<(), OrderError> {
        let item = self.item_mut(item_id)?;
        if item.status != ItemStatus::ReturnRequested {
            return Err(OrderError::NoReturnRequested);
        }
        item.status = ItemStatus::ReturnRejected;
        self.touch();
        Ok(())
    }

    pub fn record_refund(&mut self, amount: Money) -> Result<(), OrderError> {
        let refunded = self.refunded + amount;
        if refunded > self.amount_paid {
            return Err(OrderError::RefundExceedsPayment);
        }
        self.refunded = refunded;
        self.payment_status = if refunded == self.amount_paid {
            PaymentStatus::Refunded
        } else {
            PaymentStatus::PartiallyRefunded
        };
        self.touch();
        self.raise_event(DomainEvent::Order(OrderEvent::Refunded { order_id: self.id, amount }));
        Ok(())
    }

    fn item_mut(&mut self, item_id: Uuid) -> Result<&mut LineItem, OrderError> {
        self.items.iter_mut().find(|i| i.id == item_id).ok_or(OrderError::ItemNotFound)
    }

    fn set_status(&mut self, status: OrderStatus, note: Option<String>) {
        let now = Utc::now();
        self.status = status;
        self.history.push(StatusChange { status, note, at: now });
        self.updated_at = now;
        self.raise_event(DomainEvent::Order(OrderEvent::StatusChanged { order_id: self.id, status: status.to_string() }));
    }

    pub fn take_events(&mut self) -> Vec<DomainEvent> { std::mem::take(&mut self.events) }
    fn raise_event(&mut self, e: DomainEvent) { self.events.push(e); }
    fn touch(&mut self) { self.updated_at = Utc::now(); }
}

fn check_allocation(what: &'static str, allocated: Money, expected: Money) -> Result<(), OrderError> {
    if allocated != expected {
        return Err(OrderError::Unbalanced(what));
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrderError {
    #[error("Order has no items")]
    NoItems,
    #[error("Order allocation does not balance: {0}")]
    Unbalanced(&'static str),
    #[error("Cannot move order from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },
    #[error("Order can no longer be cancelled (status {0})")]
    NotCancellable(OrderStatus),
    #[error("Order item not found")]
    ItemNotFound,
    #[error("Order item is not active")]
    ItemNotActive,
    #[error("Only delivered orders can be returned")]
    NotDelivered,
    #[error("Return window has closed")]
    ReturnWindowClosed,
    #[error("No return was requested for this item")]
    NoReturnRequested,
    #[error("Order is awaiting payment")]
    AwaitingPayment,
    #[error("Order payment already settled")]
    AlreadyPaid,
    #[error("Refund would exceed the amount paid")]
    RefundExceedsPayment,
}
