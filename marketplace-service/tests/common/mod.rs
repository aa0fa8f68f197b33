//! Common test utilities for marketplace-service integration tests.
//!
//! The router runs in-process on the in-memory store, so these tests need
//! no database.
#![allow(dead_code)]

use axum::body::{Body, Bytes};
use axum::http::{header, HeaderMap, Method, Request, StatusCode};
use axum::Router;
use chrono::{DateTime, Duration, Utc};
use http_body_util::BodyExt;
use marketplace_service::config::{MarketplaceConfig, StoreBackend};
use marketplace_service::ledger::round_money;
use marketplace_service::models::{
    Customer, Order, OrderItem, OrderStatus, PaymentStatus, Product, User,
};
use marketplace_service::services::memory_store::MemoryStore;
use marketplace_service::services::pdf::PdfRenderer;
use marketplace_service::services::revocation::MemoryRevocations;
use marketplace_service::startup::{build_router, AppState};
use rust_decimal::Decimal;
use serde_json::Value;
use service_core::config::Config as CommonConfig;
use service_core::error::AppError;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tower::ServiceExt;
use uuid::Uuid;

/// Stands in for Chromium and keeps the last document it was given.
#[derive(Default)]
pub struct FakePdf {
    pub last_html: Mutex<Option<String>>,
}

#[async_trait::async_trait]
impl PdfRenderer for FakePdf {
    async fn render(&self, html: &str) -> Result<Vec<u8>, AppError> {
        *self.last_html.lock().unwrap() = Some(html.to_string());
        Ok(b"%PDF-1.4\n% fake\n".to_vec())
    }
}

/// A logged-in user and the cookie header that carries their session.
#[derive(Clone)]
pub struct Actor {
    pub user: User,
    pub cookie: String,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl TestResponse {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).unwrap_or_else(|e| {
            panic!(
                "Response is not JSON ({}): {}",
                e,
                String::from_utf8_lossy(&self.body)
            )
        })
    }

    pub fn data(&self) -> Value {
        self.json()["data"].clone()
    }
}

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub pdf: Arc<FakePdf>,
}

pub fn money(value: &str) -> Decimal {
    round_money(value.parse().unwrap())
}

pub fn days_ago(days: i64) -> DateTime<Utc> {
    Utc::now() - Duration::days(days)
}

pub fn test_config() -> MarketplaceConfig {
    let common = CommonConfig {
        port: 0,
        log_level: "debug".to_string(),
    };
    let vars: HashMap<&str, &str> = HashMap::from([
        ("STORE_BACKEND", "memory"),
        ("SESSION_SECRET", "integration-test-secret-0123456789"),
        ("LOGIN_RATE_LIMIT", "50"),
    ]);
    MarketplaceConfig::from_lookup(common, false, |k| vars.get(k).map(|v| v.to_string()))
        .expect("Failed to build test configuration")
}

/// Build the application on fresh in-memory state.
pub fn spawn_app() -> TestApp {
    let config = test_config();
    assert_eq!(config.store_backend, StoreBackend::Memory);

    let pdf = Arc::new(FakePdf::default());
    let state = AppState::new(
        config,
        Arc::new(MemoryStore::new()),
        Arc::new(MemoryRevocations::new()),
        pdf.clone(),
    );
    TestApp {
        router: build_router(state.clone()),
        state,
        pdf,
    }
}

impl TestApp {
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        cookie: Option<&str>,
        body: Option<Value>,
    ) -> TestResponse {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::ACCEPT, "application/json");
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        TestResponse {
            status,
            headers,
            body,
        }
    }

    pub async fn get(&self, uri: &str, actor: &Actor) -> TestResponse {
        self.request(Method::GET, uri, Some(&actor.cookie), None).await
    }

    pub async fn post(&self, uri: &str, actor: &Actor, body: Value) -> TestResponse {
        self.request(Method::POST, uri, Some(&actor.cookie), Some(body))
            .await
    }

    pub async fn patch(&self, uri: &str, actor: &Actor, body: Value) -> TestResponse {
        self.request(Method::PATCH, uri, Some(&actor.cookie), Some(body))
            .await
    }

    pub async fn delete(&self, uri: &str, actor: &Actor) -> TestResponse {
        self.request(Method::DELETE, uri, Some(&actor.cookie), None)
            .await
    }

    /// Log a seeded user in without going through the password endpoint.
    pub fn sign_in(&self, user: User) -> Actor {
        let (token, _) = self.state.sessions.issue(&user).unwrap();
        Actor {
            cookie: format!("{}={}", self.state.sessions.cookie_name(), token),
            user,
        }
    }

    pub async fn seller(&self, email: &str) -> Actor {
        let user = User::new_seller(email.to_string(), Some(email.to_string()), "unused".into());
        self.state.store.insert_user(&user).await.unwrap();
        self.sign_in(user)
    }

    pub async fn admin(&self) -> Actor {
        let user = User::new_admin("admin@example.com".into(), "unused".into());
        self.state.store.insert_user(&user).await.unwrap();
        self.sign_in(user)
    }

    pub async fn customer_account(&self, seller: &Actor, name: &str) -> Customer {
        let now = Utc::now();
        let customer = Customer {
            id: Uuid::new_v4().to_string(),
            seller_id: seller.user.seller_id.clone().unwrap(),
            business_name: name.to_string(),
            contact_name: None,
            email: None,
            phone: None,
            address: None,
            vat_number: None,
            prices: HashMap::new(),
            parent_customer_id: None,
            user_id: None,
            payment_terms_days: None,
            created_at: now,
            updated_at: now,
        };
        self.state.store.insert_customer(&customer).await.unwrap();
        customer
    }

    /// A customer account with its own login.
    pub async fn customer(&self, seller: &Actor, name: &str) -> (Customer, Actor) {
        let mut customer = self.customer_account(seller, name).await;
        let email = format!("{}@example.com", Uuid::new_v4().simple());
        let user = User::new_customer(
            email,
            "unused".into(),
            customer.seller_id.clone(),
            customer.id.clone(),
        );
        self.state.store.insert_user(&user).await.unwrap();
        customer.user_id = Some(user.id.clone());
        self.state.store.update_customer(&customer).await.unwrap();
        (customer, self.sign_in(user))
    }

    pub async fn product(&self, seller: &Actor, name: &str, price: &str) -> Product {
        let now = Utc::now();
        let product = Product {
            id: Uuid::new_v4().to_string(),
            seller_id: seller.user.seller_id.clone().unwrap(),
            name: name.to_string(),
            sku: None,
            unit: None,
            price: money(price),
            active: true,
            created_at: now,
            updated_at: now,
        };
        self.state.store.insert_product(&product).await.unwrap();
        product
    }

    /// A confirmed, unpaid order for `total`, placed at `created_at`.
    pub async fn order(&self, customer: &Customer, total: &str, created_at: DateTime<Utc>) -> Order {
        self.order_due(customer, total, created_at, None).await
    }

    /// Like [`TestApp::order`], stored as `pending` whatever the due date.
    pub async fn order_due(
        &self,
        customer: &Customer,
        total: &str,
        created_at: DateTime<Utc>,
        due_date: Option<DateTime<Utc>>,
    ) -> Order {
        let total = money(total);
        let order = Order {
            id: Uuid::new_v4().to_string(),
            customer_id: customer.id.clone(),
            seller_id: customer.seller_id.clone(),
            items: vec![OrderItem {
                product_id: "p-seeded".into(),
                name: "Seeded goods".into(),
                quantity: 1,
                unit_price: total,
                line_total: total,
            }],
            subtotal: total,
            delivery_fee: money("0"),
            total,
            original_total: None,
            total_paid: money("0"),
            remaining_amount: total,
            payment_status: PaymentStatus::Pending,
            status: OrderStatus::Confirmed,
            payments: vec![],
            credit_notes: vec![],
            notes: None,
            due_date,
            created_at,
            updated_at: created_at,
            version: 0,
        };
        self.state.store.insert_order(&order).await.unwrap();
        order
    }

    pub async fn stored_order(&self, id: &str) -> Order {
        self.state.store.get_order(id).await.unwrap().unwrap()
    }
}
