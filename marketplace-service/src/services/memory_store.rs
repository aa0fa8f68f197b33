use super::store::{
    CustomerFilter, LedgerCommit, MarketplaceStore, OrderFilter, ProductFilter, TransactionFilter,
};
use crate::ledger::order_ledger::payment_status_at;
use crate::models::{Customer, Message, Notification, Order, Product, Transaction, User};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use service_core::error::AppError;
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Default)]
struct Collections {
    users: HashMap<String, User>,
    customers: HashMap<String, Customer>,
    products: HashMap<String, Product>,
    orders: HashMap<String, Order>,
    transactions: HashMap<String, Transaction>,
    messages: Vec<Message>,
    notifications: Vec<Notification>,
}

/// Process-local store used by tests and the `memory` backend.
///
/// A single lock guards every collection, which makes ledger commits atomic.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Collections>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Collections>, AppError> {
        self.inner
            .read()
            .map_err(|_| AppError::InternalError(anyhow::anyhow!("memory store lock poisoned")))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Collections>, AppError> {
        self.inner
            .write()
            .map_err(|_| AppError::InternalError(anyhow::anyhow!("memory store lock poisoned")))
    }
}

fn within(at: DateTime<Utc>, from: Option<DateTime<Utc>>, to: Option<DateTime<Utc>>) -> bool {
    from.is_none_or(|f| at >= f) && to.is_none_or(|t| at <= t)
}

#[async_trait]
impl MarketplaceStore for MemoryStore {
    async fn health_check(&self) -> Result<(), AppError> {
        self.read().map(|_| ())
    }

    async fn insert_user(&self, user: &User) -> Result<(), AppError> {
        let mut data = self.write()?;
        if data.users.values().any(|u| u.email == user.email) {
            return Err(AppError::conflict("An account with this email already exists"));
        }
        data.users.insert(user.id.clone(), user.clone());
        Ok(())
    }

    async fn get_user(&self, id: &str) -> Result<Option<User>, AppError> {
        Ok(self.read()?.users.get(id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let email = email.to_lowercase();
        Ok(self.read()?.users.values().find(|u| u.email == email).cloned())
    }

    async fn insert_customer(&self, customer: &Customer) -> Result<(), AppError> {
        self.write()?
            .customers
            .insert(customer.id.clone(), customer.clone());
        Ok(())
    }

    async fn get_customer(&self, id: &str) -> Result<Option<Customer>, AppError> {
        Ok(self.read()?.customers.get(id).cloned())
    }

    async fn list_customers(&self, filter: &CustomerFilter) -> Result<Vec<Customer>, AppError> {
        let data = self.read()?;
        let mut customers: Vec<Customer> = data
            .customers
            .values()
            .filter(|c| filter.seller_id.as_ref().is_none_or(|s| &c.seller_id == s))
            .filter(|c| {
                filter
                    .parent_customer_id
                    .as_ref()
                    .is_none_or(|p| c.parent_customer_id.as_ref() == Some(p))
            })
            .cloned()
            .collect();
        customers.sort_by(|a, b| a.business_name.cmp(&b.business_name));
        Ok(customers)
    }

    async fn update_customer(&self, customer: &Customer) -> Result<(), AppError> {
        let mut data = self.write()?;
        match data.customers.get_mut(&customer.id) {
            Some(existing) => {
                *existing = customer.clone();
                Ok(())
            }
            None => Err(AppError::not_found("Customer not found")),
        }
    }

    async fn delete_customer(&self, id: &str) -> Result<bool, AppError> {
        Ok(self.write()?.customers.remove(id).is_some())
    }

    async fn insert_product(&self, product: &Product) -> Result<(), AppError> {
        self.write()?
            .products
            .insert(product.id.clone(), product.clone());
        Ok(())
    }

    async fn get_product(&self, id: &str) -> Result<Option<Product>, AppError> {
        Ok(self.read()?.products.get(id).cloned())
    }

    async fn list_products(&self, filter: &ProductFilter) -> Result<Vec<Product>, AppError> {
        let data = self.read()?;
        let mut products: Vec<Product> = data
            .products
            .values()
            .filter(|p| filter.seller_id.as_ref().is_none_or(|s| &p.seller_id == s))
            .filter(|p| !filter.active_only || p.active)
            .cloned()
            .collect();
        products.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(products)
    }

    async fn update_product(&self, product: &Product) -> Result<(), AppError> {
        let mut data = self.write()?;
        match data.products.get_mut(&product.id) {
            Some(existing) => {
                *existing = product.clone();
                Ok(())
            }
            None => Err(AppError::not_found("Product not found")),
        }
    }

    async fn delete_product(&self, id: &str) -> Result<bool, AppError> {
        Ok(self.write()?.products.remove(id).is_some())
    }

    async fn insert_order(&self, order: &Order) -> Result<(), AppError> {
        self.write()?.orders.insert(order.id.clone(), order.clone());
        Ok(())
    }

    async fn get_order(&self, id: &str) -> Result<Option<Order>, AppError> {
        Ok(self.read()?.orders.get(id).cloned())
    }

    async fn list_orders(&self, filter: &OrderFilter) -> Result<Vec<Order>, AppError> {
        let now = Utc::now();
        let data = self.read()?;
        let mut orders: Vec<Order> = data
            .orders
            .values()
            .filter(|o| filter.seller_id.as_ref().is_none_or(|s| &o.seller_id == s))
            .filter(|o| filter.customer_id.as_ref().is_none_or(|c| &o.customer_id == c))
            .filter(|o| filter.status.is_none_or(|s| o.status == s))
            .filter(|o| filter.payment_status.is_none_or(|s| payment_status_at(o, now) == s))
            .filter(|o| within(o.created_at, filter.created_from, filter.created_to))
            .cloned()
            .collect();
        orders.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(orders)
    }

    async fn get_transaction(&self, id: &str) -> Result<Option<Transaction>, AppError> {
        Ok(self.read()?.transactions.get(id).cloned())
    }

    async fn list_transactions(
        &self,
        filter: &TransactionFilter,
    ) -> Result<Vec<Transaction>, AppError> {
        let data = self.read()?;
        let mut transactions: Vec<Transaction> = data
            .transactions
            .values()
            .filter(|t| filter.seller_id.as_ref().is_none_or(|s| &t.seller_id == s))
            .filter(|t| filter.customer_id.as_ref().is_none_or(|c| &t.customer_id == c))
            .filter(|t| filter.kind.is_none_or(|k| t.kind == k))
            .filter(|t| {
                filter
                    .related_order_id
                    .as_ref()
                    .is_none_or(|o| t.related_order_id.as_ref() == Some(o))
            })
            .filter(|t| within(t.transaction_date, filter.date_from, filter.date_to))
            .cloned()
            .collect();
        transactions.sort_by(|a, b| {
            a.transaction_date
                .cmp(&b.transaction_date)
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(transactions)
    }

    async fn commit_ledger(&self, commit: LedgerCommit) -> Result<(), AppError> {
        let mut data = self.write()?;

        // Check everything before touching anything.
        for order in &commit.orders {
            match data.orders.get(&order.id) {
                Some(current) if current.version == order.version => {}
                Some(_) => {
                    return Err(AppError::conflict(format!(
                        "Order {} was modified concurrently, please retry",
                        order.id
                    )));
                }
                None => return Err(AppError::not_found(format!("Order {} not found", order.id))),
            }
        }
        if let Some(id) = &commit.delete_transaction_id {
            if !data.transactions.contains_key(id) {
                return Err(AppError::not_found("Transaction not found"));
            }
        }

        if let Some(id) = &commit.delete_transaction_id {
            data.transactions.remove(id);
        }
        if let Some(tx) = commit.insert_transaction {
            data.transactions.insert(tx.id.clone(), tx);
        }
        for mut order in commit.orders {
            order.version += 1;
            data.orders.insert(order.id.clone(), order);
        }
        Ok(())
    }

    async fn insert_message(&self, message: &Message) -> Result<(), AppError> {
        self.write()?.messages.push(message.clone());
        Ok(())
    }

    async fn list_messages(
        &self,
        customer_id: &str,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<Message>, AppError> {
        let data = self.read()?;
        let mut messages: Vec<Message> = data
            .messages
            .iter()
            .filter(|m| m.customer_id == customer_id)
            .filter(|m| since.is_none_or(|s| m.created_at > s))
            .cloned()
            .collect();
        messages.sort_by_key(|m| m.created_at);
        Ok(messages)
    }

    async fn insert_notification(&self, notification: &Notification) -> Result<(), AppError> {
        self.write()?.notifications.push(notification.clone());
        Ok(())
    }

    async fn list_notifications(
        &self,
        user_id: &str,
        since: Option<DateTime<Utc>>,
        unread_only: bool,
    ) -> Result<Vec<Notification>, AppError> {
        let data = self.read()?;
        let mut notifications: Vec<Notification> = data
            .notifications
            .iter()
            .filter(|n| n.user_id == user_id)
            .filter(|n| since.is_none_or(|s| n.created_at > s))
            .filter(|n| !unread_only || !n.read)
            .cloned()
            .collect();
        notifications.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(notifications)
    }

    async fn mark_notification_read(&self, user_id: &str, id: &str) -> Result<bool, AppError> {
        let mut data = self.write()?;
        match data
            .notifications
            .iter_mut()
            .find(|n| n.id == id && n.user_id == user_id)
        {
            Some(n) => {
                n.read = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn mark_all_notifications_read(&self, user_id: &str) -> Result<u64, AppError> {
        let mut data = self.write()?;
        let mut count = 0;
        for n in data
            .notifications
            .iter_mut()
            .filter(|n| n.user_id == user_id && !n.read)
        {
            n.read = true;
            count += 1;
        }
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::fixtures::{at, order};
    use crate::models::TransactionKind;
    use axum::http::StatusCode;
    use rust_decimal::Decimal;

    fn payment(id: &str) -> Transaction {
        Transaction {
            id: id.into(),
            customer_id: "cust-1".into(),
            seller_id: "seller-1".into(),
            kind: TransactionKind::Payment,
            amount: Decimal::from(10),
            payment_method: None,
            reference: None,
            related_order_id: None,
            allocations: vec![],
            unallocated_amount: Decimal::ZERO,
            credit_reason: None,
            notes: None,
            created_by: "seller-1".into(),
            transaction_date: at(2026, 1, 2),
            created_at: at(2026, 1, 2),
        }
    }

    #[tokio::test]
    async fn commit_bumps_versions() {
        let store = MemoryStore::new();
        store.insert_order(&order("o-1", 100, at(2026, 1, 1))).await.unwrap();

        let read = store.get_order("o-1").await.unwrap().unwrap();
        store
            .commit_ledger(LedgerCommit::insert(payment("t-1"), vec![read]))
            .await
            .unwrap();

        assert_eq!(store.get_order("o-1").await.unwrap().unwrap().version, 1);
        assert!(store.get_transaction("t-1").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn stale_version_rejects_the_whole_commit() {
        let store = MemoryStore::new();
        store.insert_order(&order("o-1", 100, at(2026, 1, 1))).await.unwrap();

        let first = store.get_order("o-1").await.unwrap().unwrap();
        let second = first.clone();
        store
            .commit_ledger(LedgerCommit::insert(payment("t-1"), vec![first]))
            .await
            .unwrap();

        let err = store
            .commit_ledger(LedgerCommit::insert(payment("t-2"), vec![second]))
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::CONFLICT);
        assert!(store.get_transaction("t-2").await.unwrap().is_none());
    }
}
