//! Bulk payments across a customer's orders, and deleting transactions.

mod common;

use axum::http::StatusCode;
use common::{days_ago, money, spawn_app};
use marketplace_service::models::PaymentStatus;
use serde_json::{json, Value};
use std::collections::HashMap;

fn allocations(tx: &Value) -> HashMap<String, String> {
    tx["allocations"]
        .as_array()
        .unwrap()
        .iter()
        .map(|a| {
            (
                a["orderId"].as_str().unwrap().to_string(),
                a["amount"].as_str().unwrap().to_string(),
            )
        })
        .collect()
}

#[tokio::test]
async fn auto_allocation_pays_oldest_orders_first() {
    let app = spawn_app();
    let seller = app.seller("seller@example.com").await;
    let customer = app.customer_account(&seller, "Corner Cafe").await;
    let older = app.order(&customer, "50", days_ago(10)).await;
    let newer = app.order(&customer, "100", days_ago(2)).await;

    let res = app
        .post(
            "/api/transactions",
            &seller,
            json!({ "customerId": customer.id, "amount": 30, "method": "cash" }),
        )
        .await;
    assert_eq!(res.status, StatusCode::CREATED);
    let tx = &res.data()["transaction"];
    let split = allocations(tx);
    assert_eq!(split[&older.id], "30.00");
    assert_eq!(split[&newer.id], "0.00");
    assert_eq!(tx["unallocatedAmount"], "0.00");
    assert_eq!(res.data()["orders"].as_array().unwrap().len(), 1);

    let stored = app.stored_order(&older.id).await;
    assert_eq!(stored.total_paid, money("30"));
    assert_eq!(stored.payment_status, PaymentStatus::Partial);
    assert_eq!(app.stored_order(&newer.id).await.total_paid, money("0"));
}

#[tokio::test]
async fn exact_payment_settles_every_order() {
    let app = spawn_app();
    let seller = app.seller("seller@example.com").await;
    let customer = app.customer_account(&seller, "Corner Cafe").await;
    let older = app.order(&customer, "50", days_ago(10)).await;
    let newer = app.order(&customer, "100", days_ago(2)).await;

    let res = app
        .post(
            "/api/transactions",
            &seller,
            json!({
                "customerId": customer.id,
                "amount": "150.00",
                "method": "bank_transfer",
                "reference": "INV-2024-001",
                "allocation": { "mode": "auto" }
            }),
        )
        .await;
    assert_eq!(res.status, StatusCode::CREATED);
    let split = allocations(&res.data()["transaction"]);
    assert_eq!(split[&older.id], "50.00");
    assert_eq!(split[&newer.id], "100.00");

    for id in [&older.id, &newer.id] {
        let stored = app.stored_order(id).await;
        assert_eq!(stored.payment_status, PaymentStatus::Paid);
        assert_eq!(stored.remaining_amount, money("0"));
    }
}

#[tokio::test]
async fn surplus_is_kept_as_unallocated() {
    let app = spawn_app();
    let seller = app.seller("seller@example.com").await;
    let customer = app.customer_account(&seller, "Corner Cafe").await;
    app.order(&customer, "50", days_ago(4)).await;

    let res = app
        .post(
            "/api/transactions",
            &seller,
            json!({ "customerId": customer.id, "amount": 80, "method": "cash" }),
        )
        .await;
    assert_eq!(res.status, StatusCode::CREATED);
    let tx = &res.data()["transaction"];
    assert_eq!(tx["amount"], "80.00");
    assert_eq!(tx["unallocatedAmount"], "30.00");
}

#[tokio::test]
async fn manual_split_must_match_the_payment() {
    let app = spawn_app();
    let seller = app.seller("seller@example.com").await;
    let customer = app.customer_account(&seller, "Corner Cafe").await;
    let older = app.order(&customer, "50", days_ago(10)).await;
    let newer = app.order(&customer, "100", days_ago(2)).await;

    let res = app
        .post(
            "/api/transactions",
            &seller,
            json!({
                "customerId": customer.id,
                "amount": 50,
                "method": "cash",
                "allocation": { "mode": "manual", "allocations": [
                    { "orderId": older.id, "amount": 10 },
                    { "orderId": newer.id, "amount": 30 }
                ] }
            }),
        )
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(app.stored_order(&older.id).await.total_paid, money("0"));

    let res = app
        .post(
            "/api/transactions",
            &seller,
            json!({
                "customerId": customer.id,
                "amount": 40,
                "method": "cash",
                "allocation": { "mode": "manual", "allocations": [
                    { "orderId": older.id, "amount": 10 },
                    { "orderId": newer.id, "amount": 30 }
                ] }
            }),
        )
        .await;
    assert_eq!(res.status, StatusCode::CREATED);
    assert_eq!(app.stored_order(&older.id).await.total_paid, money("10"));
    assert_eq!(app.stored_order(&newer.id).await.total_paid, money("30"));
}

#[tokio::test]
async fn customers_cannot_record_bulk_payments() {
    let app = spawn_app();
    let seller = app.seller("seller@example.com").await;
    let (customer, customer_actor) = app.customer(&seller, "Corner Cafe").await;
    app.order(&customer, "50", days_ago(4)).await;

    let res = app
        .post(
            "/api/transactions",
            &customer_actor,
            json!({ "customerId": customer.id, "amount": 50, "method": "cash" }),
        )
        .await;
    assert_eq!(res.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn deleting_with_reversal_restores_balances() {
    let app = spawn_app();
    let seller = app.seller("seller@example.com").await;
    let customer = app.customer_account(&seller, "Corner Cafe").await;
    let older = app.order(&customer, "50", days_ago(10)).await;
    let newer = app.order(&customer, "100", days_ago(2)).await;

    let res = app
        .post(
            "/api/transactions",
            &seller,
            json!({ "customerId": customer.id, "amount": 120, "method": "cash" }),
        )
        .await;
    let tx_id = res.data()["transaction"]["id"].as_str().unwrap().to_string();

    let res = app.delete(&format!("/api/transactions/{}", tx_id), &seller).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.data()["deleted"], true);
    assert_eq!(res.data()["reversed"], true);
    assert_eq!(res.data()["orders"].as_array().unwrap().len(), 2);

    for order in [&older, &newer] {
        let stored = app.stored_order(&order.id).await;
        assert_eq!(stored.total_paid, money("0"));
        assert_eq!(stored.remaining_amount, order.total);
        assert!(stored.payments.is_empty());
    }

    let res = app.get("/api/transactions", &seller).await;
    assert!(res.data().as_array().unwrap().is_empty());
}

#[tokio::test]
async fn deleting_without_reversal_keeps_balances() {
    let app = spawn_app();
    let seller = app.seller("seller@example.com").await;
    let customer = app.customer_account(&seller, "Corner Cafe").await;
    let order = app.order(&customer, "50", days_ago(10)).await;

    let res = app
        .post(
            "/api/transactions",
            &seller,
            json!({ "customerId": customer.id, "amount": 20, "method": "cash" }),
        )
        .await;
    let tx_id = res.data()["transaction"]["id"].as_str().unwrap().to_string();

    let res = app
        .delete(&format!("/api/transactions/{}?reverse=false", tx_id), &seller)
        .await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.data()["reversed"], false);
    assert_eq!(app.stored_order(&order.id).await.total_paid, money("20"));
}

#[tokio::test]
async fn credit_note_deletion_restores_the_total() {
    let app = spawn_app();
    let seller = app.seller("seller@example.com").await;
    let customer = app.customer_account(&seller, "Corner Cafe").await;
    let order = app.order(&customer, "100", days_ago(3)).await;

    let res = app
        .patch(
            &format!("/api/orders/{}", order.id),
            &seller,
            json!({ "action": "creditNote", "amount": 25, "reason": "pricing_error", "notes": "Wrong list price" }),
        )
        .await;
    let tx_id = res.data()["transaction"]["id"].as_str().unwrap().to_string();

    let res = app.delete(&format!("/api/transactions/{}", tx_id), &seller).await;
    assert_eq!(res.status, StatusCode::OK);

    let stored = app.stored_order(&order.id).await;
    assert_eq!(stored.total, money("100"));
    assert!(stored.credit_notes.is_empty());
}

#[tokio::test]
async fn other_sellers_cannot_delete() {
    let app = spawn_app();
    let seller = app.seller("seller@example.com").await;
    let rival = app.seller("rival@example.com").await;
    let customer = app.customer_account(&seller, "Corner Cafe").await;
    let order = app.order(&customer, "50", days_ago(10)).await;

    let res = app
        .post(
            "/api/transactions",
            &seller,
            json!({ "customerId": customer.id, "amount": 50, "method": "cash" }),
        )
        .await;
    let tx_id = res.data()["transaction"]["id"].as_str().unwrap().to_string();

    let res = app.delete(&format!("/api/transactions/{}", tx_id), &rival).await;
    assert_eq!(res.status, StatusCode::FORBIDDEN);
    assert_eq!(app.stored_order(&order.id).await.total_paid, money("50"));

    let res = app.get("/api/transactions", &seller).await;
    assert_eq!(res.data().as_array().unwrap().len(), 1);
}
