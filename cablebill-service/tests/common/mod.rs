//! Test helpers for cablebill-service integration tests.
//!
//! Every test builds the full router over the in-memory store and drives it
//! with `tower::ServiceExt::oneshot`.

#![allow(dead_code)]

use axum::{
    body::{to_bytes, Body},
    extract::ConnectInfo,
    http::{header, Method, Request, StatusCode},
    Router,
};
use cablebill_service::{
    build_router,
    config::{
        BillingConfig, CacheBackend, CacheConfig, Environment, JwtConfig, MongoConfig,
        PasswordConfig, RateLimitConfig, SecurityConfig, StoreBackend, StoreConfig,
    },
    services::{
        CredentialStore, InMemoryStore, LedgerService, LedgerStore, MemoryCache, Reconciler,
        TokenService,
    },
    utils::PasswordHasherConfig,
    AppState,
};
use secrecy::Secret;
use serde_json::{json, Value};
use service_core::config::Config as CoreConfig;
use service_core::middleware::rate_limit::create_ip_rate_limiter;
use std::net::SocketAddr;
use std::sync::{Arc, Once};
use tower::util::ServiceExt;

static INIT: Once = Once::new();

/// Initialize tracing for tests (only once).
pub fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter("warn,cablebill_service=debug")
            .with_test_writer()
            .try_init()
            .ok();
    });
}

pub const ADMIN_EMAIL: &str = "owner@example.com";
pub const ADMIN_PASSWORD: &str = "secret123";

pub fn test_config() -> BillingConfig {
    BillingConfig {
        common: CoreConfig {
            host: "127.0.0.1".to_string(),
            port: 8080,
        },
        environment: Environment::Dev,
        service_name: "cablebill-service".to_string(),
        service_version: "test".to_string(),
        log_level: "error".to_string(),
        otlp_endpoint: None,
        store: StoreConfig {
            backend: StoreBackend::Memory,
            mongodb: MongoConfig {
                uri: "mongodb://localhost:27017".to_string(),
                database: "cablebill_test".to_string(),
                use_transactions: false,
            },
        },
        cache: CacheConfig {
            backend: CacheBackend::Memory,
            redis_url: "redis://localhost:6379".to_string(),
            dashboard_ttl_seconds: 30,
            list_ttl_seconds: 10,
            payment_requests_ttl_seconds: 5,
        },
        jwt: JwtConfig {
            secret: Secret::new("integration-test-secret-at-least-32-bytes".to_string()),
            session_ttl_hours: 1,
            reset_ttl_minutes: 10,
        },
        password: PasswordConfig {
            memory_kib: 1024,
            iterations: 1,
            parallelism: 1,
        },
        security: SecurityConfig {
            allowed_origins: vec!["http://localhost:3000".to_string()],
            setup_enabled: true,
        },
        rate_limit: RateLimitConfig {
            login_attempts: 1000,
            login_window_seconds: 60,
            forgot_password_attempts: 1000,
            forgot_password_window_seconds: 60,
            submit_attempts: 1000,
            submit_window_seconds: 60,
        },
    }
}

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_config(test_config())
    }

    pub fn with_config(config: BillingConfig) -> Self {
        init_tracing();
        let store: Arc<dyn LedgerStore> = Arc::new(InMemoryStore::new());
        let hasher = PasswordHasherConfig::new(&config.password).expect("argon2 params");

        let state = AppState {
            jwt: TokenService::new(&config.jwt),
            credentials: CredentialStore::new(store.clone(), hasher),
            ledger: LedgerService::new(store.clone()),
            reconciler: Reconciler::new(store.clone()),
            store,
            cache: Arc::new(MemoryCache::new()),
            login_rate_limiter: create_ip_rate_limiter(
                config.rate_limit.login_attempts,
                config.rate_limit.login_window_seconds,
            ),
            forgot_password_rate_limiter: create_ip_rate_limiter(
                config.rate_limit.forgot_password_attempts,
                config.rate_limit.forgot_password_window_seconds,
            ),
            submit_rate_limiter: create_ip_rate_limiter(
                config.rate_limit.submit_attempts,
                config.rate_limit.submit_window_seconds,
            ),
            config,
        };

        let router = build_router(state.clone()).expect("Failed to build router");
        Self { router, state }
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let (status, _, body) = self.request_with_headers(method, uri, token, body).await;
        (status, body)
    }

    pub async fn request_with_headers(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, axum::http::HeaderMap, Value) {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .extension(ConnectInfo(SocketAddr::from(([127, 0, 0, 1], 40000))));
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
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
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };
        (status, headers, body)
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.request(Method::GET, uri, token, None).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.request(Method::POST, uri, token, Some(body)).await
    }

    pub async fn put(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.request(Method::PUT, uri, token, Some(body)).await
    }

    pub async fn delete(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.request(Method::DELETE, uri, token, None).await
    }

    /// Create the admin through the setup endpoint and log in.
    pub async fn admin_token(&self) -> String {
        let (status, _) = self
            .post(
                "/setup/create-admin",
                None,
                json!({ "email": ADMIN_EMAIL, "password": ADMIN_PASSWORD }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, body) = self
            .post(
                "/auth/admin/login",
                None,
                json!({ "email": ADMIN_EMAIL, "password": ADMIN_PASSWORD }),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        body["token"].as_str().unwrap().to_string()
    }

    pub async fn create_customer(
        &self,
        token: &str,
        name: &str,
        phone: &str,
        village: &str,
        bill_amount: i64,
    ) -> String {
        let (status, body) = self
            .post(
                "/customers",
                Some(token),
                json!({
                    "name": name,
                    "phone": phone,
                    "village": village,
                    "billAmount": bill_amount,
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["customer"]["id"].as_str().unwrap().to_string()
    }

    pub async fn set_payment(&self, token: &str, customer_id: &str, month: &str, status: &str) {
        let (code, body) = self
            .put(
                "/payments",
                Some(token),
                json!({ "customerId": customer_id, "month": month, "status": status }),
            )
            .await;
        assert_eq!(code, StatusCode::OK, "{body}");
    }
}
