mod common;

use axum::http::{Method, StatusCode};
use common::{TestApp, ADMIN_EMAIL, ADMIN_PASSWORD};
use serde_json::json;

#[tokio::test]
async fn test_setup_creates_admin_once() {
    let app = TestApp::new();
    let body = json!({ "email": ADMIN_EMAIL, "password": ADMIN_PASSWORD, "name": "Owner" });

    let (status, created) = app.post("/setup/create-admin", None, body.clone()).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["admin"]["name"], "Owner");
    assert_eq!(created["admin"]["email"], ADMIN_EMAIL);
    assert!(created["admin"].get("password").is_none());

    let (status, conflict) = app.post("/setup/create-admin", None, body).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(conflict["code"], "conflict");
}

#[tokio::test]
async fn test_setup_disabled_is_not_found() {
    let mut config = common::test_config();
    config.security.setup_enabled = false;
    let app = TestApp::with_config(config);

    let (status, _) = app
        .post(
            "/setup/create-admin",
            None,
            json!({ "email": ADMIN_EMAIL, "password": ADMIN_PASSWORD }),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_setup_rejects_short_password() {
    let app = TestApp::new();
    let (status, body) = app
        .post(
            "/setup/create-admin",
            None,
            json!({ "email": ADMIN_EMAIL, "password": "abc" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "validation_error");
}

#[tokio::test]
async fn test_admin_login() {
    let app = TestApp::new();
    app.admin_token().await;

    let (status, body) = app
        .post(
            "/auth/admin/login",
            None,
            json!({ "email": ADMIN_EMAIL, "password": ADMIN_PASSWORD }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Login successful");
    assert_eq!(body["admin"]["email"], ADMIN_EMAIL);
    assert!(body["token"].as_str().is_some());

    let (status, wrong) = app
        .post(
            "/auth/admin/login",
            None,
            json!({ "email": ADMIN_EMAIL, "password": "wrong-password" }),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, unknown) = app
        .post(
            "/auth/admin/login",
            None,
            json!({ "email": "nobody@example.com", "password": ADMIN_PASSWORD }),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong["error"], unknown["error"]);
}

#[tokio::test]
async fn test_protected_routes_need_a_session() {
    let app = TestApp::new();

    let (status, body) = app.get("/customers", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "unauthorized");

    let (status, _) = app.get("/dashboard", Some("not-a-token")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app.get("/user/dashboard", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_user_login_and_role_separation() {
    let app = TestApp::new();
    let admin = app.admin_token().await;
    app.create_customer(&admin, "Abdul Rahim", "01711111111", "Baliadangi", 300)
        .await;

    let (status, _) = app
        .post(
            "/auth/user/login",
            None,
            json!({ "name": "rahim", "phone": "01799999999", "village": "balia" }),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = app
        .post(
            "/auth/user/login",
            None,
            json!({ "name": "rahim", "phone": "01711111111", "village": "balia" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["customer"]["name"], "Abdul Rahim");
    let user = body["token"].as_str().unwrap().to_string();

    let (status, _) = app.get("/user/dashboard", Some(&user)).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app.get("/customers", Some(&user)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = app.get("/user/dashboard", Some(&admin)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_forgot_password_conceals_unknown_email() {
    let app = TestApp::new();
    app.admin_token().await;

    let (status, body) = app
        .post(
            "/auth/admin/forgot-password",
            None,
            json!({ "email": "nobody@example.com" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.get("resetToken").is_none());

    let (status, body) = app
        .post(
            "/auth/admin/forgot-password",
            None,
            json!({ "email": ADMIN_EMAIL }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["resetToken"].as_str().is_some());
}

#[tokio::test]
async fn test_reset_password_requires_reset_token() {
    let app = TestApp::new();
    let session = app.admin_token().await;

    let (status, _) = app
        .post(
            "/auth/admin/reset-password",
            None,
            json!({ "token": session, "newPassword": "brandnew1" }),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (_, body) = app
        .post(
            "/auth/admin/forgot-password",
            None,
            json!({ "email": ADMIN_EMAIL }),
        )
        .await;
    let reset = body["resetToken"].as_str().unwrap().to_string();

    // A reset token is not a session either.
    let (status, _) = app.get("/customers", Some(&reset)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app
        .post(
            "/auth/admin/reset-password",
            None,
            json!({ "token": reset, "newPassword": "brandnew1" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app
        .post(
            "/auth/admin/login",
            None,
            json!({ "email": ADMIN_EMAIL, "password": "brandnew1" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_change_password() {
    let app = TestApp::new();
    let token = app.admin_token().await;

    let (status, _) = app
        .post(
            "/auth/admin/change-password",
            Some(&token),
            json!({ "currentPassword": "not-it", "newPassword": "another1" }),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app
        .post(
            "/auth/admin/change-password",
            Some(&token),
            json!({ "currentPassword": ADMIN_PASSWORD, "newPassword": "abc" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .post(
            "/auth/admin/change-password",
            Some(&token),
            json!({ "currentPassword": ADMIN_PASSWORD, "newPassword": "another1" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app
        .post(
            "/auth/admin/login",
            None,
            json!({ "email": ADMIN_EMAIL, "password": "another1" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_login_rate_limit() {
    let mut config = common::test_config();
    config.rate_limit.login_attempts = 2;
    config.rate_limit.login_window_seconds = 3600;
    let app = TestApp::with_config(config);

    let body = json!({ "email": ADMIN_EMAIL, "password": "whatever" });
    for _ in 0..2 {
        let (status, _) = app.post("/auth/admin/login", None, body.clone()).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    let (status, headers, body) = app
        .request_with_headers(Method::POST, "/auth/admin/login", None, Some(body))
        .await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["code"], "too_many_requests");
    assert!(headers.get("retry-after").is_some());
}

#[tokio::test]
async fn test_health_and_metrics() {
    let app = TestApp::new();
    let (status, body) = app.get("/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");

    let (status, _) = app.get("/metrics", None).await;
    assert_eq!(status, StatusCode::OK);
}
