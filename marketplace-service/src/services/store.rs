use crate::models::{
    Customer, Message, Notification, Order, OrderStatus, PaymentStatus, Product, Transaction,
    TransactionKind, User,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use service_core::error::AppError;

#[derive(Debug, Clone, Default)]
pub struct CustomerFilter {
    pub seller_id: Option<String>,
    pub parent_customer_id: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ProductFilter {
    pub seller_id: Option<String>,
    pub active_only: bool,
}

#[derive(Debug, Clone, Default)]
pub struct OrderFilter {
    pub seller_id: Option<String>,
    pub customer_id: Option<String>,
    pub status: Option<OrderStatus>,
    pub payment_status: Option<PaymentStatus>,
    pub created_from: Option<DateTime<Utc>>,
    pub created_to: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default)]
pub struct TransactionFilter {
    pub seller_id: Option<String>,
    pub customer_id: Option<String>,
    pub kind: Option<TransactionKind>,
    pub related_order_id: Option<String>,
    pub date_from: Option<DateTime<Utc>>,
    pub date_to: Option<DateTime<Utc>>,
}

/// One atomic ledger write.
///
/// Each order carries the `version` it was read at; the store refuses the
/// whole commit with a conflict if any of them has moved on, and writes the
/// orders back with `version + 1`.
#[derive(Debug, Clone, Default)]
pub struct LedgerCommit {
    pub insert_transaction: Option<Transaction>,
    pub delete_transaction_id: Option<String>,
    pub orders: Vec<Order>,
}

impl LedgerCommit {
    pub fn insert(transaction: Transaction, orders: Vec<Order>) -> Self {
        Self {
            insert_transaction: Some(transaction),
            delete_transaction_id: None,
            orders,
        }
    }

    pub fn delete(transaction_id: String, orders: Vec<Order>) -> Self {
        Self {
            insert_transaction: None,
            delete_transaction_id: Some(transaction_id),
            orders,
        }
    }

    pub fn orders(orders: Vec<Order>) -> Self {
        Self {
            orders,
            ..Default::default()
        }
    }
}

#[async_trait]
pub trait MarketplaceStore: Send + Sync {
    async fn health_check(&self) -> Result<(), AppError>;

    // Users
    async fn insert_user(&self, user: &User) -> Result<(), AppError>;
    async fn get_user(&self, id: &str) -> Result<Option<User>, AppError>;
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError>;

    // Customers
    async fn insert_customer(&self, customer: &Customer) -> Result<(), AppError>;
    async fn get_customer(&self, id: &str) -> Result<Option<Customer>, AppError>;
    async fn list_customers(&self, filter: &CustomerFilter) -> Result<Vec<Customer>, AppError>;
    async fn update_customer(&self, customer: &Customer) -> Result<(), AppError>;
    async fn delete_customer(&self, id: &str) -> Result<bool, AppError>;

    // Products
    async fn insert_product(&self, product: &Product) -> Result<(), AppError>;
    async fn get_product(&self, id: &str) -> Result<Option<Product>, AppError>;
    async fn list_products(&self, filter: &ProductFilter) -> Result<Vec<Product>, AppError>;
    async fn update_product(&self, product: &Product) -> Result<(), AppError>;
    async fn delete_product(&self, id: &str) -> Result<bool, AppError>;

    // Orders and transactions
    async fn insert_order(&self, order: &Order) -> Result<(), AppError>;
    async fn get_order(&self, id: &str) -> Result<Option<Order>, AppError>;
    /// Orders sorted by `created_at` ascending.
    async fn list_orders(&self, filter: &OrderFilter) -> Result<Vec<Order>, AppError>;
    async fn get_transaction(&self, id: &str) -> Result<Option<Transaction>, AppError>;
    /// Transactions sorted by `transaction_date` ascending.
    async fn list_transactions(
        &self,
        filter: &TransactionFilter,
    ) -> Result<Vec<Transaction>, AppError>;
    async fn commit_ledger(&self, commit: LedgerCommit) -> Result<(), AppError>;

    // Chat and notifications
    async fn insert_message(&self, message: &Message) -> Result<(), AppError>;
    async fn list_messages(
        &self,
        customer_id: &str,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<Message>, AppError>;
    async fn insert_notification(&self, notification: &Notification) -> Result<(), AppError>;
    async fn list_notifications(
        &self,
        user_id: &str,
        since: Option<DateTime<Utc>>,
        unread_only: bool,
    ) -> Result<Vec<Notification>, AppError>;
    async fn mark_notification_read(&self, user_id: &str, id: &str) -> Result<bool, AppError>;
    async fn mark_all_notifications_read(&self, user_id: &str) -> Result<u64, AppError>;
}
