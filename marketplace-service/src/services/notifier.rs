use super::store::MarketplaceStore;
use crate::models::{Notification, NotificationKind};
use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

/// Writes in-app notifications for the polling clients.
///
/// Delivery is best effort: a failed write is logged and never fails the
/// request that triggered it.
#[derive(Clone)]
pub struct Notifier {
    store: Arc<dyn MarketplaceStore>,
}

pub struct NotificationDraft {
    pub kind: NotificationKind,
    pub title: String,
    pub body: String,
    pub link: Option<String>,
}

impl Notifier {
    pub fn new(store: Arc<dyn MarketplaceStore>) -> Self {
        Self { store }
    }

    pub async fn notify_user(&self, user_id: &str, draft: NotificationDraft) {
        let notification = Notification {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            kind: draft.kind,
            title: draft.title,
            body: draft.body,
            link: draft.link,
            read: false,
            created_at: Utc::now(),
        };
        if let Err(e) = self.store.insert_notification(&notification).await {
            tracing::warn!(user_id = %user_id, error = %e, "Failed to store notification");
        }
    }

    /// The seller account is the seller's own user.
    pub async fn notify_seller(&self, seller_id: &str, draft: NotificationDraft) {
        self.notify_user(seller_id, draft).await
    }

    /// Notify the login attached to a customer, or to its parent account for
    /// branches without their own login.
    pub async fn notify_customer(&self, customer_id: &str, draft: NotificationDraft) {
        let mut id = customer_id.to_string();
        // A branch sits one level below its parent.
        for _ in 0..2 {
            match self.store.get_customer(&id).await {
                Ok(Some(customer)) => match (customer.user_id, customer.parent_customer_id) {
                    (Some(user_id), _) => return self.notify_user(&user_id, draft).await,
                    (None, Some(parent)) => id = parent,
                    (None, None) => break,
                },
                Ok(None) => break,
                Err(e) => {
                    tracing::warn!(customer_id = %id, error = %e, "Failed to resolve notification recipient");
                    break;
                }
            }
        }
        tracing::debug!(customer_id = %customer_id, "Customer has no login, notification skipped");
    }
}
