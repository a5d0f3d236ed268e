mod common;

use axum::http::StatusCode;
use cablebill_service::models::MonthKey;
use common::TestApp;
use serde_json::json;

#[tokio::test]
async fn test_dashboard_totals() {
    let app = TestApp::new();
    let token = app.admin_token().await;
    let current = MonthKey::current();
    let this_month = current.to_string();
    let last_month = current.previous().to_string();

    let a1 = app.create_customer(&token, "One", "017", "A", 300).await;
    let a2 = app.create_customer(&token, "Two", "018", "A", 200).await;
    let b1 = app.create_customer(&token, "Three", "019", "B", 500).await;

    app.set_payment(&token, &a1, &last_month, "unpaid").await;
    app.set_payment(&token, &a2, &this_month, "paid").await;
    app.set_payment(&token, &b1, &last_month, "unpaid").await;
    app.set_payment(&token, &b1, &this_month, "paid").await;

    let (status, body) = app.get("/dashboard", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["totalCustomers"], 3);
    assert_eq!(body["totalDue"], 800);
    assert_eq!(body["totalCollectedThisMonth"], 700);

    let months = body["last6Months"].as_array().unwrap();
    assert_eq!(months.len(), 6);
    assert_eq!(months[5]["month"], this_month.as_str());
    assert_eq!(months[5]["collected"], 700);
    assert_eq!(months[4]["collected"], 0);

    assert_eq!(
        body["villageSummary"],
        json!({
            "A": { "customers": 2, "totalDue": 300 },
            "B": { "customers": 1, "totalDue": 500 }
        })
    );

    let (_, listed) = app.get("/customers", Some(&token)).await;
    let summed: i64 = listed["customers"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["totalDue"].as_i64().unwrap())
        .sum();
    assert_eq!(summed, body["totalDue"].as_i64().unwrap());
}

#[tokio::test]
async fn test_dashboard_refreshes_after_writes() {
    let app = TestApp::new();
    let token = app.admin_token().await;
    let id = app.create_customer(&token, "One", "017", "A", 300).await;

    let (_, before) = app.get("/dashboard", Some(&token)).await;
    assert_eq!(before["totalDue"], 0);

    app.set_payment(&token, &id, "2025-01", "unpaid").await;
    let (_, after) = app.get("/dashboard", Some(&token)).await;
    assert_eq!(after["totalDue"], 300);
}

#[tokio::test]
async fn test_bill_change_reprices_unpaid_history() {
    let app = TestApp::new();
    let token = app.admin_token().await;
    let id = app.create_customer(&token, "One", "017", "A", 300).await;
    app.set_payment(&token, &id, "2025-01", "unpaid").await;
    app.set_payment(&token, &id, "2025-02", "unpaid").await;

    app.put(
        &format!("/customers/{}", id),
        Some(&token),
        json!({ "billAmount": 350 }),
    )
    .await;

    let (_, body) = app.get("/dashboard", Some(&token)).await;
    assert_eq!(body["totalDue"], 700);
}

#[tokio::test]
async fn test_user_dashboard() {
    let app = TestApp::new();
    let admin = app.admin_token().await;
    let current = MonthKey::current();
    let id = app
        .create_customer(&admin, "Abdul Rahim", "01711111111", "Baliadangi", 300)
        .await;
    app.set_payment(&admin, &id, &current.to_string(), "paid").await;
    app.set_payment(&admin, &id, "2020-01", "unpaid").await;

    let (_, login) = app
        .post(
            "/auth/user/login",
            None,
            json!({ "name": "Rahim", "phone": "01711111111", "village": "Baliadangi" }),
        )
        .await;
    let token = login["token"].as_str().unwrap().to_string();

    let (status, body) = app.get("/user/dashboard", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["customer"]["id"], id.as_str());
    assert_eq!(body["totalDue"], 300);
    assert_eq!(body["unpaidMonths"], 1);

    let window = body["last6Months"].as_array().unwrap();
    assert_eq!(window.len(), 6);
    assert_eq!(window[5]["status"], "paid");
    assert_eq!(window[0]["status"], "unpaid");
    assert_eq!(body["allPayments"].as_array().unwrap().len(), 2);
}

fn keys(body: &serde_json::Value) -> Vec<&str> {
    let mut keys: Vec<&str> = body
        .as_object()
        .unwrap()
        .keys()
        .map(String::as_str)
        .collect();
    keys.sort_unstable();
    keys
}

#[tokio::test]
async fn test_response_field_names() {
    let app = TestApp::new();
    let admin = app.admin_token().await;
    let id = app
        .create_customer(&admin, "Abdul Rahim", "01711111111", "Baliadangi", 300)
        .await;
    app.set_payment(&admin, &id, "2025-01", "unpaid").await;

    let (_, dashboard) = app.get("/dashboard", Some(&admin)).await;
    assert_eq!(
        keys(&dashboard),
        vec![
            "last6Months",
            "totalCollectedThisMonth",
            "totalCustomers",
            "totalDue",
            "villageSummary"
        ]
    );

    let (_, analytics) = app
        .get(&format!("/customers/{}/analytics", id), Some(&admin))
        .await;
    assert_eq!(
        keys(&analytics),
        vec![
            "allPayments",
            "customer",
            "last6Months",
            "paidMonths",
            "totalCollected",
            "totalDue",
            "unpaidMonths"
        ]
    );

    let (_, login) = app
        .post(
            "/auth/user/login",
            None,
            json!({ "name": "Rahim", "phone": "01711111111", "village": "Baliadangi" }),
        )
        .await;
    let token = login["token"].as_str().unwrap().to_string();
    let (_, user) = app.get("/user/dashboard", Some(&token)).await;
    assert_eq!(
        keys(&user),
        vec!["allPayments", "customer", "last6Months", "totalDue", "unpaidMonths"]
    );
}
