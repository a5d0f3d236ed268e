mod common;

use axum::http::StatusCode;
use common::TestApp;
use serde_json::json;

#[tokio::test]
async fn test_create_customer_validation() {
    let app = TestApp::new();
    let token = app.admin_token().await;

    let (status, _) = app
        .post("/customers", Some(&token), json!({ "name": "Rahim" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .post(
            "/customers",
            Some(&token),
            json!({ "name": "Rahim", "village": "  " }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .post(
            "/customers",
            Some(&token),
            json!({ "name": "Rahim", "village": "V", "billAmount": -5 }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app
        .post(
            "/customers",
            Some(&token),
            json!({ "name": "Rahim", "village": "V" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["message"], "Customer created");
    assert_eq!(body["customer"]["phone"], "");
    assert_eq!(body["customer"]["billAmount"], 0);
}

#[tokio::test]
async fn test_get_customer_ids() {
    let app = TestApp::new();
    let token = app.admin_token().await;
    let id = app.create_customer(&token, "Rahim", "017", "V", 300).await;

    let (status, body) = app.get(&format!("/customers/{}", id), Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["customer"]["id"], id.as_str());

    let (status, _) = app.get("/customers/not-an-id", Some(&token)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = app
        .get("/customers/65a1b2c3d4e5f6a7b8c9d0e1", Some(&token))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Customer not found");
}

#[tokio::test]
async fn test_update_customer_is_partial() {
    let app = TestApp::new();
    let token = app.admin_token().await;
    let id = app.create_customer(&token, "Rahim", "017", "V", 300).await;

    let (status, body) = app
        .put(
            &format!("/customers/{}", id),
            Some(&token),
            json!({ "billAmount": 450 }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["customer"]["billAmount"], 450);
    assert_eq!(body["customer"]["name"], "Rahim");
    assert_eq!(body["customer"]["phone"], "017");

    let (status, _) = app
        .put(
            "/customers/65a1b2c3d4e5f6a7b8c9d0e1",
            Some(&token),
            json!({ "name": "X" }),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_cascades_payments() {
    let app = TestApp::new();
    let token = app.admin_token().await;
    let id = app.create_customer(&token, "Rahim", "017", "V", 300).await;
    app.set_payment(&token, &id, "2025-01", "unpaid").await;
    app.set_payment(&token, &id, "2025-02", "paid").await;

    let (status, body) = app.delete(&format!("/customers/{}", id), Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Customer deleted");

    let (status, _) = app.delete(&format!("/customers/{}", id), Some(&token)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let remaining = app.state.store.list_all_payments().await.unwrap();
    assert!(remaining.is_empty());
}

#[tokio::test]
async fn test_listing_order_and_dues() {
    let app = TestApp::new();
    let token = app.admin_token().await;

    let zed = app.create_customer(&token, "Zed", "017", "A", 100).await;
    let amy = app.create_customer(&token, "Amy", "018", "A", 100).await;
    let big = app.create_customer(&token, "Big", "019", "A", 400).await;
    let bob = app.create_customer(&token, "Bob", "016", "B", 900).await;
    for id in [&zed, &amy, &big, &bob] {
        app.set_payment(&token, id, "2025-01", "unpaid").await;
    }
    app.set_payment(&token, &big, "2025-02", "unpaid").await;

    let (status, body) = app.get("/customers", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    let customers = body["customers"].as_array().unwrap();
    let names: Vec<&str> = customers
        .iter()
        .map(|c| c["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Big", "Amy", "Zed", "Bob"]);
    assert_eq!(customers[0]["unpaidMonths"], 2);
    assert_eq!(customers[0]["totalDue"], 800);
}

#[tokio::test]
async fn test_listing_reflects_writes() {
    let app = TestApp::new();
    let token = app.admin_token().await;
    let id = app.create_customer(&token, "Rahim", "017", "V", 300).await;

    let (_, before) = app.get("/customers", Some(&token)).await;
    assert_eq!(before["customers"][0]["totalDue"], 0);

    app.set_payment(&token, &id, "2025-01", "unpaid").await;
    let (_, after) = app.get("/customers", Some(&token)).await;
    assert_eq!(after["customers"][0]["totalDue"], 300);
}

#[tokio::test]
async fn test_customer_analytics() {
    let app = TestApp::new();
    let token = app.admin_token().await;
    let id = app.create_customer(&token, "C", "017", "V", 500).await;
    app.set_payment(&token, &id, "2025-01", "paid").await;
    app.set_payment(&token, &id, "2025-02", "unpaid").await;
    app.set_payment(&token, &id, "2025-03", "unpaid").await;

    let (status, body) = app
        .get(&format!("/customers/{}/analytics", id), Some(&token))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["totalDue"], 1000);
    assert_eq!(body["unpaidMonths"], 2);
    assert_eq!(body["paidMonths"], 1);
    assert_eq!(body["totalCollected"], 1);
    assert_eq!(body["last6Months"].as_array().unwrap().len(), 6);
    assert_eq!(body["allPayments"].as_array().unwrap().len(), 3);
    assert_eq!(body["allPayments"][0]["month"], "2025-03");

    let (_, body) = app
        .get(&format!("/customers/{}/analytics?months=12", id), Some(&token))
        .await;
    assert_eq!(body["last6Months"].as_array().unwrap().len(), 12);

    let (status, _) = app
        .get(&format!("/customers/{}/analytics?months=0", id), Some(&token))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = app
        .get(&format!("/customers/{}/analytics?months=25", id), Some(&token))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
