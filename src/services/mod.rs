//! Application services: each operation loads aggregates from the store,
//! applies domain rules, persists, then publishes the raised events.

pub mod accounts;
pub mod allocation;
pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod coupons;
pub mod ledger;
pub mod lifecycle;
pub mod pricing;
pub mod referral;
pub mod report;
