//! Customer statements in every output format, and the PDF reports.

mod common;

use axum::http::{header, StatusCode};
use common::{days_ago, money, spawn_app, Actor, TestApp};
use marketplace_service::ledger::csv_export::parse_statement_csv;
use marketplace_service::models::Customer;
use serde_json::json;

/// Invoice of 100, a credit note of 20 and a payment of 50.
async fn customer_with_activity(app: &TestApp, seller: &Actor) -> Customer {
    let customer = app.customer_account(seller, "Corner Cafe").await;
    let order = app.order(&customer, "100", days_ago(5)).await;

    let res = app
        .patch(
            &format!("/api/orders/{}", order.id),
            seller,
            json!({ "action": "creditNote", "amount": 20, "reason": "returned_goods", "notes": "Two boxes back" }),
        )
        .await;
    assert_eq!(res.status, StatusCode::OK);

    let res = app
        .post(
            "/api/transactions",
            seller,
            json!({ "customerId": customer.id, "amount": 50, "method": "cash" }),
        )
        .await;
    assert_eq!(res.status, StatusCode::CREATED);
    customer
}

#[tokio::test]
async fn json_statement_runs_the_balance() {
    let app = spawn_app();
    let seller = app.seller("seller@example.com").await;
    let customer = customer_with_activity(&app, &seller).await;

    let res = app
        .get(&format!("/api/customers/{}/statement", customer.id), &seller)
        .await;
    assert_eq!(res.status, StatusCode::OK);
    let statement = res.data();
    assert_eq!(statement["totalInvoiced"], "100.00");
    assert_eq!(statement["totalPaid"], "50.00");
    assert_eq!(statement["totalCredited"], "20.00");
    assert_eq!(statement["closingBalance"], "30.00");

    let lines = statement["lines"].as_array().unwrap();
    let kinds: Vec<&str> = lines.iter().map(|l| l["kind"].as_str().unwrap()).collect();
    assert_eq!(kinds, vec!["invoice", "credit_note", "payment"]);
    assert_eq!(lines[2]["balance"], "30.00");
    assert_eq!(statement["creditNotesByReason"][0]["reason"], "Returned Goods");
}

#[tokio::test]
async fn csv_export_matches_the_json_lines() {
    let app = spawn_app();
    let seller = app.seller("seller@example.com").await;
    let customer = customer_with_activity(&app, &seller).await;
    let uri = format!("/api/customers/{}/statement", customer.id);

    let json_lines = app.get(&uri, &seller).await.data()["lines"].clone();

    let res = app.get(&format!("{}?format=csv", uri), &seller).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.headers[header::CONTENT_TYPE], "text/csv; charset=utf-8");
    let disposition = res.headers[header::CONTENT_DISPOSITION].to_str().unwrap();
    assert!(disposition.starts_with("attachment; filename=\"statement-corner-cafe-"));
    assert!(res.body.starts_with(b"\xEF\xBB\xBF"));

    let rows = parse_statement_csv(&res.body).unwrap();
    assert_eq!(rows.len(), 3);
    for (row, line) in rows.iter().zip(json_lines.as_array().unwrap()) {
        assert_eq!(row.reference, line["reference"].as_str().unwrap());
        assert_eq!(row.balance, line["balance"].as_str().unwrap());
    }
    assert_eq!(rows[1].kind, "Credit Note");
    assert_eq!(rows[1].amount, "-20.00");
}

#[tokio::test]
async fn unknown_format_is_rejected() {
    let app = spawn_app();
    let seller = app.seller("seller@example.com").await;
    let customer = app.customer_account(&seller, "Corner Cafe").await;

    let res = app
        .get(&format!("/api/customers/{}/statement?format=xml", customer.id), &seller)
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);

    let res = app
        .get(
            &format!("/api/customers/{}/statement?from=2026-03-10&to=2026-03-01", customer.id),
            &seller,
        )
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn customers_only_read_their_own_statement() {
    let app = spawn_app();
    let seller = app.seller("seller@example.com").await;
    let (own, actor) = app.customer(&seller, "Corner Cafe").await;
    let other = app.customer_account(&seller, "Harbour Bistro").await;

    let res = app
        .get(&format!("/api/customers/{}/statement", own.id), &actor)
        .await;
    assert_eq!(res.status, StatusCode::OK);

    let res = app
        .get(&format!("/api/customers/{}/statement", other.id), &actor)
        .await;
    assert_eq!(res.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn customer_report_renders_the_statement() {
    let app = spawn_app();
    let seller = app.seller("seller@example.com").await;
    let customer = customer_with_activity(&app, &seller).await;

    let res = app
        .post(
            "/api/generate-customer-report",
            &seller,
            json!({ "customerId": customer.id }),
        )
        .await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.headers[header::CONTENT_TYPE], "application/pdf");
    assert!(res.body.starts_with(b"%PDF"));

    let html = app.pdf.last_html.lock().unwrap().clone().unwrap();
    assert!(html.contains("Corner Cafe"));
}

#[tokio::test]
async fn sales_report_is_for_sellers() {
    let app = spawn_app();
    let seller = app.seller("seller@example.com").await;
    let (customer, actor) = app.customer(&seller, "Corner Cafe").await;
    app.order(&customer, "75", days_ago(1)).await;

    let res = app.post("/api/generate-report", &seller, json!({})).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.headers[header::CONTENT_TYPE], "application/pdf");

    let res = app.post("/api/generate-report", &actor, json!({})).await;
    assert_eq!(res.status, StatusCode::FORBIDDEN);

    let admin = app.admin().await;
    let res = app.post("/api/generate-report", &admin, json!({})).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn customers_with_a_balance_cannot_be_deleted() {
    let app = spawn_app();
    let seller = app.seller("seller@example.com").await;
    let customer = app.customer_account(&seller, "Corner Cafe").await;
    app.order(&customer, "40", days_ago(2)).await;

    let res = app.delete(&format!("/api/customers/{}", customer.id), &seller).await;
    assert_eq!(res.status, StatusCode::CONFLICT);

    let idle = app.customer_account(&seller, "Harbour Bistro").await;
    let res = app.delete(&format!("/api/customers/{}", idle.id), &seller).await;
    assert_eq!(res.status, StatusCode::OK);
}

#[tokio::test]
async fn credited_orders_stay_on_the_statement_until_entries_are_removed() {
    let app = spawn_app();
    let seller = app.seller("seller@example.com").await;
    let customer = app.customer_account(&seller, "Corner Cafe").await;
    let order = app.order(&customer, "100", days_ago(5)).await;
    let uri = format!("/api/orders/{}", order.id);

    let res = app
        .patch(
            &uri,
            &seller,
            json!({ "action": "creditNote", "amount": 30, "reason": "damaged_goods", "notes": "Crushed crate" }),
        )
        .await;
    assert_eq!(res.status, StatusCode::OK);
    let credit_note_id = res.data()["transaction"]["id"].as_str().unwrap().to_string();

    let res = app
        .patch(&uri, &seller, json!({ "action": "updateStatus", "status": "cancelled" }))
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);

    let statement_uri = format!("/api/customers/{}/statement", customer.id);
    let res = app.get(&statement_uri, &seller).await;
    assert_eq!(res.data()["closingBalance"], "70.00");

    let res = app
        .delete(&format!("/api/transactions/{}", credit_note_id), &seller)
        .await;
    assert_eq!(res.status, StatusCode::OK);

    let res = app
        .patch(&uri, &seller, json!({ "action": "updateStatus", "status": "cancelled" }))
        .await;
    assert_eq!(res.status, StatusCode::OK);

    let res = app.get(&statement_uri, &seller).await;
    assert!(res.data()["lines"].as_array().unwrap().is_empty());
    assert_eq!(money(res.data()["closingBalance"].as_str().unwrap()), money("0"));
}
