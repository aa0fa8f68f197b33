//! Payments, credit notes and status changes on single orders.

mod common;

use axum::http::StatusCode;
use common::{days_ago, money, spawn_app};
use marketplace_service::models::PaymentStatus;
use serde_json::json;

#[tokio::test]
async fn partial_then_full_payment() {
    let app = spawn_app();
    let seller = app.seller("seller@example.com").await;
    let customer = app.customer_account(&seller, "Corner Cafe").await;
    let order = app.order(&customer, "100", days_ago(3)).await;
    let uri = format!("/api/orders/{}", order.id);

    let res = app
        .patch(&uri, &seller, json!({ "action": "recordPayment", "amount": 40, "method": "cash" }))
        .await;
    assert_eq!(res.status, StatusCode::OK);
    let updated = &res.data()["orders"][0];
    assert_eq!(updated["paymentStatus"], "partial");
    assert_eq!(updated["totalPaid"], "40.00");
    assert_eq!(updated["remainingAmount"], "60.00");
    assert_eq!(res.data()["transaction"]["type"], "payment");

    let res = app
        .patch(&uri, &seller, json!({ "action": "recordPayment", "amount": "60.00", "method": "bank_transfer" }))
        .await;
    assert_eq!(res.status, StatusCode::OK);
    let updated = &res.data()["orders"][0];
    assert_eq!(updated["paymentStatus"], "paid");
    assert_eq!(updated["remainingAmount"], "0.00");

    let stored = app.stored_order(&order.id).await;
    assert_eq!(stored.payments.len(), 2);
    assert_eq!(stored.total_paid, money("100"));
    assert_eq!(stored.version, 2);
}

#[tokio::test]
async fn overpayment_is_rejected_without_changes() {
    let app = spawn_app();
    let seller = app.seller("seller@example.com").await;
    let customer = app.customer_account(&seller, "Corner Cafe").await;
    let order = app.order(&customer, "100", days_ago(3)).await;

    let res = app
        .patch(
            &format!("/api/orders/{}", order.id),
            &seller,
            json!({ "action": "recordPayment", "amount": 150, "method": "cash" }),
        )
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);

    let stored = app.stored_order(&order.id).await;
    assert_eq!(stored.total_paid, money("0"));
    assert_eq!(stored.payment_status, PaymentStatus::Pending);
    assert_eq!(stored.version, 0);
}

#[tokio::test]
async fn credit_note_reduces_the_total() {
    let app = spawn_app();
    let seller = app.seller("seller@example.com").await;
    let customer = app.customer_account(&seller, "Corner Cafe").await;
    let order = app.order(&customer, "100", days_ago(3)).await;

    let res = app
        .patch(
            &format!("/api/orders/{}", order.id),
            &seller,
            json!({
                "action": "creditNote",
                "amount": 30,
                "reason": "damaged_goods",
                "notes": "Two crates arrived broken"
            }),
        )
        .await;
    assert_eq!(res.status, StatusCode::OK);
    let updated = &res.data()["orders"][0];
    assert_eq!(updated["total"], "70.00");
    assert_eq!(updated["originalTotal"], "100.00");
    assert_eq!(updated["remainingAmount"], "70.00");
    assert_eq!(updated["creditNotes"][0]["reasonLabel"], "Damaged Goods");

    let tx = &res.data()["transaction"];
    assert_eq!(tx["type"], "credit_note");
    assert_eq!(tx["amount"], "-30.00");
    assert_eq!(tx["relatedOrderId"], order.id.as_str());

    let res = app
        .get("/api/transactions?reason=Damaged%20Goods", &seller)
        .await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.data().as_array().unwrap().len(), 1);

    let res = app.get("/api/transactions?reason=quality_issue", &seller).await;
    assert!(res.data().as_array().unwrap().is_empty());
}

#[tokio::test]
async fn credit_note_above_total_changes_nothing() {
    let app = spawn_app();
    let seller = app.seller("seller@example.com").await;
    let customer = app.customer_account(&seller, "Corner Cafe").await;
    let order = app.order(&customer, "100", days_ago(3)).await;

    let res = app
        .patch(
            &format!("/api/orders/{}", order.id),
            &seller,
            json!({ "action": "creditNote", "amount": 120, "reason": "other", "notes": "Goodwill" }),
        )
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);

    let stored = app.stored_order(&order.id).await;
    assert_eq!(stored.total, money("100"));
    assert!(stored.original_total.is_none());
    assert!(stored.credit_notes.is_empty());

    let res = app.get("/api/transactions", &seller).await;
    assert!(res.data().as_array().unwrap().is_empty());
}

#[tokio::test]
async fn credit_note_requires_notes() {
    let app = spawn_app();
    let seller = app.seller("seller@example.com").await;
    let customer = app.customer_account(&seller, "Corner Cafe").await;
    let order = app.order(&customer, "100", days_ago(3)).await;

    let res = app
        .patch(
            &format!("/api/orders/{}", order.id),
            &seller,
            json!({ "action": "creditNote", "amount": 10, "reason": "other", "notes": "   " }),
        )
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn customers_cannot_record_payments() {
    let app = spawn_app();
    let seller = app.seller("seller@example.com").await;
    let (customer, customer_actor) = app.customer(&seller, "Corner Cafe").await;
    let order = app.order(&customer, "100", days_ago(3)).await;

    let res = app
        .patch(
            &format!("/api/orders/{}", order.id),
            &customer_actor,
            json!({ "action": "recordPayment", "amount": 10, "method": "cash" }),
        )
        .await;
    assert_eq!(res.status, StatusCode::FORBIDDEN);

    let res = app.get(&format!("/api/orders/{}", order.id), &customer_actor).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.data()["totalPaid"], "0.00");
}

#[tokio::test]
async fn other_sellers_cannot_see_the_order() {
    let app = spawn_app();
    let seller = app.seller("seller@example.com").await;
    let rival = app.seller("rival@example.com").await;
    let customer = app.customer_account(&seller, "Corner Cafe").await;
    let order = app.order(&customer, "100", days_ago(3)).await;

    let res = app.get(&format!("/api/orders/{}", order.id), &rival).await;
    assert_eq!(res.status, StatusCode::FORBIDDEN);

    let res = app.get("/api/orders", &rival).await;
    assert!(res.data().as_array().unwrap().is_empty());
}

#[tokio::test]
async fn checkout_prices_items_and_delivery() {
    let app = spawn_app();
    let seller = app.seller("seller@example.com").await;
    let (mut customer, customer_actor) = app.customer(&seller, "Corner Cafe").await;
    let flour = app.product(&seller, "Flour 25kg", "20").await;
    let sugar = app.product(&seller, "Sugar 10kg", "12.50").await;

    customer.prices.insert(flour.id.clone(), money("18"));
    app.state.store.update_customer(&customer).await.unwrap();

    let res = app
        .post(
            "/api/orders",
            &customer_actor,
            json!({ "items": [
                { "productId": flour.id, "quantity": 2 },
                { "productId": sugar.id, "quantity": 1 }
            ] }),
        )
        .await;
    assert_eq!(res.status, StatusCode::CREATED);
    let order = res.data();
    assert_eq!(order["items"][0]["unitPrice"], "18.00");
    assert_eq!(order["subtotal"], "48.50");
    assert_eq!(order["deliveryFee"], "5.00");
    assert_eq!(order["total"], "53.50");
    assert_eq!(order["status"], "pending");
    assert_eq!(order["paymentStatus"], "pending");
    assert!(order["dueDate"].is_string());

    let res = app
        .post(
            "/api/orders",
            &customer_actor,
            json!({ "items": [{ "productId": flour.id, "quantity": 10 }] }),
        )
        .await;
    assert_eq!(res.data()["deliveryFee"], "0.00");
    assert_eq!(res.data()["total"], "180.00");

    let res = app.get("/api/notifications", &seller).await;
    let kinds: Vec<String> = res
        .data()
        .as_array()
        .unwrap()
        .iter()
        .map(|n| n["kind"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(kinds, vec!["order_placed", "order_placed"]);
}

#[tokio::test]
async fn checkout_rejects_other_sellers_products() {
    let app = spawn_app();
    let seller = app.seller("seller@example.com").await;
    let rival = app.seller("rival@example.com").await;
    let (_, customer_actor) = app.customer(&seller, "Corner Cafe").await;
    let foreign = app.product(&rival, "Rival flour", "10").await;

    let res = app
        .post(
            "/api/orders",
            &customer_actor,
            json!({ "items": [{ "productId": foreign.id, "quantity": 1 }] }),
        )
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn status_moves_one_step_and_customers_only_cancel() {
    let app = spawn_app();
    let seller = app.seller("seller@example.com").await;
    let (customer, customer_actor) = app.customer(&seller, "Corner Cafe").await;
    let order = app.order(&customer, "100", days_ago(1)).await;
    let uri = format!("/api/orders/{}", order.id);

    let res = app
        .patch(&uri, &seller, json!({ "action": "updateStatus", "status": "delivered" }))
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);

    let res = app
        .patch(&uri, &customer_actor, json!({ "action": "updateStatus", "status": "cancelled" }))
        .await;
    assert_eq!(res.status, StatusCode::FORBIDDEN);

    let res = app
        .patch(&uri, &seller, json!({ "action": "updateStatus", "status": "prepared" }))
        .await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.data()["status"], "prepared");

    let res = app
        .patch(&uri, &seller, json!({ "action": "updateStatus", "status": "cancelled" }))
        .await;
    assert_eq!(res.data()["status"], "cancelled");

    let res = app
        .patch(&uri, &seller, json!({ "action": "recordPayment", "amount": 10, "method": "cash" }))
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn untouched_orders_turn_overdue_after_the_due_date() {
    let app = spawn_app();
    let seller = app.seller("seller@example.com").await;
    let customer = app.customer_account(&seller, "Corner Cafe").await;
    let late = app
        .order_due(&customer, "100", days_ago(40), Some(days_ago(10)))
        .await;
    let current = app
        .order_due(&customer, "50", days_ago(5), Some(days_ago(-25)))
        .await;
    assert_eq!(app.stored_order(&late.id).await.payment_status, PaymentStatus::Pending);

    let res = app.get(&format!("/api/orders/{}", late.id), &seller).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.data()["paymentStatus"], "overdue");

    let res = app.get("/api/orders?paymentStatus=overdue", &seller).await;
    let ids: Vec<String> = res
        .data()
        .as_array()
        .unwrap()
        .iter()
        .map(|o| o["id"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(ids, vec![late.id.clone()]);

    let res = app.get("/api/orders?paymentStatus=pending", &seller).await;
    let ids: Vec<String> = res
        .data()
        .as_array()
        .unwrap()
        .iter()
        .map(|o| o["id"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(ids, vec![current.id.clone()]);
}
