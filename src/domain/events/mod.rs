//! Domain events
use crate::domain::value_objects::{Money, Sku};
use serde::Serialize;
use uuid::Uuid;

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "aggregate", content = "event", rename_all = "snake_case")]
pub enum DomainEvent {
    Product(ProductEvent),
    Order(OrderEvent),
    Wallet(WalletEvent),
    Coupon(CouponEvent),
    User(UserEvent),
}

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProductEvent {
    Created { product_id: Uuid, sku: Sku },
    StockAdded { product_id: Uuid, quantity: u32 },
    StockRemoved { product_id: Uuid, quantity: u32 },
}

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OrderEvent {
    Placed { order_id: Uuid, user_id: Uuid, total: Money },
    Paid { order_id: Uuid, amount: Money, reference: Option<String> },
    StatusChanged { order_id: Uuid, status: String },
    ItemCancelled { order_id: Uuid, item_id: Uuid },
    ReturnRequested { order_id: Uuid, item_id: Uuid },
    ItemReturned { order_id: Uuid, item_id: Uuid },
    Refunded { order_id: Uuid, amount: Money },
}

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WalletEvent {
    Credited { user_id: Uuid, amount: Money, source: String },
    Debited { user_id: Uuid, amount: Money, source: String },
}

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CouponEvent {
    Redeemed { code: String, user_id: Uuid },
    Released { code: String, user_id: Uuid },
}

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum UserEvent {
    Registered { user_id: Uuid, referred_by: Option<Uuid> },
    Blocked { user_id: Uuid },
}

impl DomainEvent {
    /// Subject suffix used when the event is published, e.g. `order.placed`.
    pub fn subject(&self) -> String {
        let (aggregate, kind) = match self {
            DomainEvent::Product(e) => ("product", match e {
                ProductEvent::Created { .. } => "created",
                ProductEvent::StockAdded { .. } => "stock_added",
                ProductEvent::StockRemoved { .. } => "stock_removed",
            }),
            DomainEvent::Order(e) => ("order", match e {
                OrderEvent::Placed { .. } => "placed",
                OrderEvent::Paid { .. } => "paid",
                OrderEvent::StatusChanged { .. } => "status_changed",
                OrderEvent::ItemCancelled { .. } => "item_cancelled",
                OrderEvent::ReturnRequested { .. } => "return_requested",
                OrderEvent::ItemReturned { .. } => "item_returned",
                OrderEvent::Refunded { .. } => "refunded",
            }),
            DomainEvent::Wallet(e) => ("wallet", match e {
                WalletEvent::Credited { .. } => "credited",
                WalletEvent::Debited { .. } => "debited",
            }),
            DomainEvent::Coupon(e) => ("coupon", match e {
                CouponEvent::Redeemed { .. } => "redeemed",
                CouponEvent::Released { .. } => "released",
            }),
            DomainEvent::User(e) => ("user", match e {
                UserEvent::Registered { .. } => "registered",
                UserEvent::Blocked { .. } => "blocked",
            }),
        };
        format!("{aggregate}.{kind}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subject_and_payload_shape() {
        let id = Uuid::nil();
        let e = DomainEvent::Wallet(WalletEvent::Credited { user_id: id, amount: Money::from_cents(500), source: "refund".into() });
        assert_eq!(e.subject(), "wallet.credited");
        let json = serde_json::to_value(&e).unwrap();
        assert_eq!(json["aggregate"], "wallet");
        assert_eq!(json["event"]["type"], "credited");
        assert_eq!(json["event"]["amount"], "5.00");
    }
}
