//! Domain models for marketplace-service.
//!
//! These are the stored document shapes. Wire shapes live in `crate::dtos`.

mod customer;
mod message;
mod notification;
mod order;
mod product;
mod transaction;
mod user;

pub use customer::Customer;
pub use message::Message;
pub use notification::{Notification, NotificationKind};
pub use order::{
    CreditNoteRecord, Order, OrderItem, OrderStatus, PaymentRecord, PaymentStatus,
};
pub use product::Product;
pub use transaction::{Allocation, CreditNoteReason, PaymentMethod, Transaction, TransactionKind};
pub use user::{Role, User};
