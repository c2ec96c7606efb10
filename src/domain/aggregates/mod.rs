//! Aggregates module
pub mod cart;
pub mod category;
pub mod coupon;
pub mod order;
pub mod product;
pub mod user;
pub mod wallet;

pub use cart::{Cart, CartError, CartItem};
pub use category::Category;
pub use coupon::{Coupon, CouponError, CouponTerms, Discount};
pub use order::{
    ItemStatus, LineItem, Order, OrderDraft, OrderError, OrderStatus, PaymentMethod, PaymentStatus, StatusChange,
};
pub use product::{Product, ProductDetails, ProductError, ProductStatus};
pub use user::{Address, Credentials, Role, Session, User, UserError};
pub use wallet::{Entry, EntryKind, TransactionSource, Wallet, WalletError, WalletTransaction};
