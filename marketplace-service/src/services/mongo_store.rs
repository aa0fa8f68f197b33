use super::store::{
    CustomerFilter, LedgerCommit, MarketplaceStore, OrderFilter, ProductFilter, TransactionFilter,
};
use crate::models::{
    Customer, Message, Notification, Order, PaymentStatus, Product, Transaction, User,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use mongodb::{
    bson::{doc, Bson, Document},
    options::{FindOptions, IndexOptions},
    Client as MongoClient, Collection, Database, IndexModel,
};
use serde::Serialize;
use service_core::error::AppError;

#[derive(Clone)]
pub struct MongoStore {
    client: MongoClient,
    db: Database,
}

fn to_bson<T: Serialize>(value: &T) -> Result<Bson, AppError> {
    mongodb::bson::to_bson(value).map_err(|e| AppError::DatabaseError(anyhow::Error::new(e)))
}

fn bson_date(at: DateTime<Utc>) -> mongodb::bson::DateTime {
    mongodb::bson::DateTime::from_chrono(at)
}

fn date_range(from: Option<DateTime<Utc>>, to: Option<DateTime<Utc>>) -> Option<Document> {
    let mut range = Document::new();
    if let Some(from) = from {
        range.insert("$gte", bson_date(from));
    }
    if let Some(to) = to {
        range.insert("$lte", bson_date(to));
    }
    (!range.is_empty()).then_some(range)
}

/// Match orders whose status as of `now` is `status`.
///
/// The stored `payment_status` turns stale once an untouched order passes its
/// due date, so anything unpaid is checked against `due_date` as well.
fn payment_status_query(
    status: PaymentStatus,
    now: DateTime<Utc>,
) -> Result<Document, AppError> {
    let now = bson_date(now);
    Ok(match status {
        PaymentStatus::Paid => doc! { "payment_status": to_bson(&status)? },
        PaymentStatus::Overdue => doc! {
            "payment_status": { "$ne": to_bson(&PaymentStatus::Paid)? },
            "due_date": { "$lt": now },
        },
        PaymentStatus::Pending | PaymentStatus::Partial => doc! {
            "payment_status": to_bson(&status)?,
            "$or": [
                { "due_date": Bson::Null },
                { "due_date": { "$gte": now } },
            ],
        },
    })
}

fn sorted_by(keys: Document) -> FindOptions {
    FindOptions::builder().sort(keys).build()
}

fn index(keys: Document, name: &str, unique: bool) -> IndexModel {
    IndexModel::builder()
        .keys(keys)
        .options(
            IndexOptions::builder()
                .name(name.to_string())
                .unique(unique)
                .build(),
        )
        .build()
}

impl MongoStore {
    pub async fn connect(uri: &str, database: &str) -> Result<Self, AppError> {
        tracing::info!(database = %database, "Connecting to MongoDB");
        let client = MongoClient::with_uri_str(uri).await.map_err(|e| {
            tracing::error!(error = %e, "Failed to connect to MongoDB");
            AppError::from(e)
        })?;
        let db = client.database(database);
        tracing::info!(database = %database, "Connected to MongoDB");
        Ok(Self { client, db })
    }

    fn users(&self) -> Collection<User> {
        self.db.collection("users")
    }

    fn customers(&self) -> Collection<Customer> {
        self.db.collection("customers")
    }

    fn products(&self) -> Collection<Product> {
        self.db.collection("products")
    }

    fn orders(&self) -> Collection<Order> {
        self.db.collection("orders")
    }

    fn transactions(&self) -> Collection<Transaction> {
        self.db.collection("transactions")
    }

    fn messages(&self) -> Collection<Message> {
        self.db.collection("messages")
    }

    fn notifications(&self) -> Collection<Notification> {
        self.db.collection("notifications")
    }

    /// Create the seller-scoped lookup indexes and the unique login email.
    pub async fn initialize_indexes(&self) -> Result<(), AppError> {
        tracing::info!("Creating MongoDB indexes for marketplace-service");

        self.users()
            .create_index(index(doc! { "email": 1 }, "user_email_unique", true), None)
            .await?;

        self.customers()
            .create_indexes(
                [
                    index(doc! { "seller_id": 1, "business_name": 1 }, "seller_customers", false),
                    index(doc! { "parent_customer_id": 1 }, "customer_branches", false),
                ],
                None,
            )
            .await?;

        self.products()
            .create_index(index(doc! { "seller_id": 1, "name": 1 }, "seller_products", false), None)
            .await?;

        self.orders()
            .create_indexes(
                [
                    index(doc! { "seller_id": 1, "created_at": 1 }, "seller_orders", false),
                    index(
                        doc! { "customer_id": 1, "created_at": 1 },
                        "customer_orders",
                        false,
                    ),
                    index(
                        doc! { "seller_id": 1, "payment_status": 1 },
                        "seller_payment_status",
                        false,
                    ),
                ],
                None,
            )
            .await?;

        self.transactions()
            .create_indexes(
                [
                    index(
                        doc! { "customer_id": 1, "transaction_date": 1 },
                        "customer_transactions",
                        false,
                    ),
                    index(
                        doc! { "seller_id": 1, "transaction_date": 1 },
                        "seller_transactions",
                        false,
                    ),
                    index(doc! { "related_order_id": 1 }, "order_transactions", false),
                ],
                None,
            )
            .await?;

        self.messages()
            .create_index(
                index(doc! { "customer_id": 1, "created_at": 1 }, "conversation_messages", false),
                None,
            )
            .await?;

        self.notifications()
            .create_index(
                index(doc! { "user_id": 1, "created_at": -1 }, "user_notifications", false),
                None,
            )
            .await?;

        tracing::info!("Marketplace indexes initialized");
        Ok(())
    }
}

#[async_trait]
impl MarketplaceStore for MongoStore {
    async fn health_check(&self) -> Result<(), AppError> {
        self.db.run_command(doc! { "ping": 1 }, None).await?;
        Ok(())
    }

    #[tracing::instrument(skip(self, user), fields(user_id = %user.id))]
    async fn insert_user(&self, user: &User) -> Result<(), AppError> {
        if self.find_user_by_email(&user.email).await?.is_some() {
            return Err(AppError::conflict("An account with this email already exists"));
        }
        self.users().insert_one(user, None).await?;
        Ok(())
    }

    async fn get_user(&self, id: &str) -> Result<Option<User>, AppError> {
        Ok(self.users().find_one(doc! { "_id": id }, None).await?)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        Ok(self
            .users()
            .find_one(doc! { "email": email.to_lowercase() }, None)
            .await?)
    }

    #[tracing::instrument(skip(self, customer), fields(customer_id = %customer.id))]
    async fn insert_customer(&self, customer: &Customer) -> Result<(), AppError> {
        self.customers().insert_one(customer, None).await?;
        Ok(())
    }

    async fn get_customer(&self, id: &str) -> Result<Option<Customer>, AppError> {
        Ok(self.customers().find_one(doc! { "_id": id }, None).await?)
    }

    async fn list_customers(&self, filter: &CustomerFilter) -> Result<Vec<Customer>, AppError> {
        let mut query = Document::new();
        if let Some(seller_id) = &filter.seller_id {
            query.insert("seller_id", seller_id);
        }
        if let Some(parent) = &filter.parent_customer_id {
            query.insert("parent_customer_id", parent);
        }
        let cursor = self
            .customers()
            .find(query, sorted_by(doc! { "business_name": 1 }))
            .await?;
        Ok(cursor.try_collect().await?)
    }

    async fn update_customer(&self, customer: &Customer) -> Result<(), AppError> {
        let result = self
            .customers()
            .replace_one(doc! { "_id": &customer.id }, customer, None)
            .await?;
        if result.matched_count == 0 {
            return Err(AppError::not_found("Customer not found"));
        }
        Ok(())
    }

    async fn delete_customer(&self, id: &str) -> Result<bool, AppError> {
        let result = self.customers().delete_one(doc! { "_id": id }, None).await?;
        Ok(result.deleted_count > 0)
    }

    async fn insert_product(&self, product: &Product) -> Result<(), AppError> {
        self.products().insert_one(product, None).await?;
        Ok(())
    }

    async fn get_product(&self, id: &str) -> Result<Option<Product>, AppError> {
        Ok(self.products().find_one(doc! { "_id": id }, None).await?)
    }

    async fn list_products(&self, filter: &ProductFilter) -> Result<Vec<Product>, AppError> {
        let mut query = Document::new();
        if let Some(seller_id) = &filter.seller_id {
            query.insert("seller_id", seller_id);
        }
        if filter.active_only {
            query.insert("active", true);
        }
        let cursor = self
            .products()
            .find(query, sorted_by(doc! { "name": 1 }))
            .await?;
        Ok(cursor.try_collect().await?)
    }

    async fn update_product(&self, product: &Product) -> Result<(), AppError> {
        let result = self
            .products()
            .replace_one(doc! { "_id": &product.id }, product, None)
            .await?;
        if result.matched_count == 0 {
            return Err(AppError::not_found("Product not found"));
        }
        Ok(())
    }

    async fn delete_product(&self, id: &str) -> Result<bool, AppError> {
        let result = self.products().delete_one(doc! { "_id": id }, None).await?;
        Ok(result.deleted_count > 0)
    }

    #[tracing::instrument(skip(self, order), fields(order_id = %order.id))]
    async fn insert_order(&self, order: &Order) -> Result<(), AppError> {
        self.orders().insert_one(order, None).await?;
        Ok(())
    }

    async fn get_order(&self, id: &str) -> Result<Option<Order>, AppError> {
        Ok(self.orders().find_one(doc! { "_id": id }, None).await?)
    }

    async fn list_orders(&self, filter: &OrderFilter) -> Result<Vec<Order>, AppError> {
        let mut query = Document::new();
        if let Some(seller_id) = &filter.seller_id {
            query.insert("seller_id", seller_id);
        }
        if let Some(customer_id) = &filter.customer_id {
            query.insert("customer_id", customer_id);
        }
        if let Some(status) = &filter.status {
            query.insert("status", to_bson(status)?);
        }
        if let Some(payment_status) = filter.payment_status {
            query.extend(payment_status_query(payment_status, Utc::now())?);
        }
        if let Some(range) = date_range(filter.created_from, filter.created_to) {
            query.insert("created_at", range);
        }
        let cursor = self
            .orders()
            .find(query, sorted_by(doc! { "created_at": 1, "_id": 1 }))
            .await?;
        Ok(cursor.try_collect().await?)
    }

    async fn get_transaction(&self, id: &str) -> Result<Option<Transaction>, AppError> {
        Ok(self.transactions().find_one(doc! { "_id": id }, None).await?)
    }

    async fn list_transactions(
        &self,
        filter: &TransactionFilter,
    ) -> Result<Vec<Transaction>, AppError> {
        let mut query = Document::new();
        if let Some(seller_id) = &filter.seller_id {
            query.insert("seller_id", seller_id);
        }
        if let Some(customer_id) = &filter.customer_id {
            query.insert("customer_id", customer_id);
        }
        if let Some(kind) = &filter.kind {
            query.insert("kind", to_bson(kind)?);
        }
        if let Some(order_id) = &filter.related_order_id {
            query.insert("related_order_id", order_id);
        }
        if let Some(range) = date_range(filter.date_from, filter.date_to) {
            query.insert("transaction_date", range);
        }
        let cursor = self
            .transactions()
            .find(query, sorted_by(doc! { "transaction_date": 1, "_id": 1 }))
            .await?;
        Ok(cursor.try_collect().await?)
    }

    /// Runs inside a multi-document transaction, so the deployment must be
    /// a replica set.
    #[tracing::instrument(skip(self, commit), fields(orders = commit.orders.len()))]
    async fn commit_ledger(&self, commit: LedgerCommit) -> Result<(), AppError> {
        let mut session = self.client.start_session(None).await?;
        session.start_transaction(None).await?;

        let result: Result<(), AppError> = async {
            if let Some(id) = &commit.delete_transaction_id {
                let deleted = self
                    .transactions()
                    .delete_one_with_session(doc! { "_id": id }, None, &mut session)
                    .await?;
                if deleted.deleted_count == 0 {
                    return Err(AppError::not_found("Transaction not found"));
                }
            }
            if let Some(tx) = &commit.insert_transaction {
                self.transactions()
                    .insert_one_with_session(tx, None, &mut session)
                    .await?;
            }
            for order in &commit.orders {
                let mut next = order.clone();
                next.version = order.version + 1;
                let replaced = self
                    .orders()
                    .replace_one_with_session(
                        doc! { "_id": &order.id, "version": order.version },
                        &next,
                        None,
                        &mut session,
                    )
                    .await?;
                if replaced.matched_count == 0 {
                    return Err(AppError::conflict(format!(
                        "Order {} was modified concurrently, please retry",
                        order.id
                    )));
                }
            }
            Ok(())
        }
        .await;

        match result {
            Ok(()) => {
                session.commit_transaction().await?;
                Ok(())
            }
            Err(e) => {
                if let Err(abort) = session.abort_transaction().await {
                    tracing::warn!(error = %abort, "Failed to abort ledger transaction");
                }
                Err(e)
            }
        }
    }

    async fn insert_message(&self, message: &Message) -> Result<(), AppError> {
        self.messages().insert_one(message, None).await?;
        Ok(())
    }

    async fn list_messages(
        &self,
        customer_id: &str,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<Message>, AppError> {
        let mut query = doc! { "customer_id": customer_id };
        if let Some(since) = since {
            query.insert("created_at", doc! { "$gt": bson_date(since) });
        }
        let cursor = self
            .messages()
            .find(query, sorted_by(doc! { "created_at": 1 }))
            .await?;
        Ok(cursor.try_collect().await?)
    }

    async fn insert_notification(&self, notification: &Notification) -> Result<(), AppError> {
        self.notifications().insert_one(notification, None).await?;
        Ok(())
    }

    async fn list_notifications(
        &self,
        user_id: &str,
        since: Option<DateTime<Utc>>,
        unread_only: bool,
    ) -> Result<Vec<Notification>, AppError> {
        let mut query = doc! { "user_id": user_id };
        if let Some(since) = since {
            query.insert("created_at", doc! { "$gt": bson_date(since) });
        }
        if unread_only {
            query.insert("read", false);
        }
        let cursor = self
            .notifications()
            .find(query, sorted_by(doc! { "created_at": -1 }))
            .await?;
        Ok(cursor.try_collect().await?)
    }

    async fn mark_notification_read(&self, user_id: &str, id: &str) -> Result<bool, AppError> {
        let result = self
            .notifications()
            .update_one(
                doc! { "_id": id, "user_id": user_id },
                doc! { "$set": { "read": true } },
                None,
            )
            .await?;
        Ok(result.matched_count > 0)
    }

    async fn mark_all_notifications_read(&self, user_id: &str) -> Result<u64, AppError> {
        let result = self
            .notifications()
            .update_many(
                doc! { "user_id": user_id, "read": false },
                doc! { "$set": { "read": true } },
                None,
            )
            .await?;
        Ok(result.modified_count)
    }
}
