pub mod config;
pub mod dtos;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod utils;

use service_core::axum::{
    extract::State,
    http::{header, HeaderValue, Method, StatusCode},
    middleware::{from_fn, from_fn_with_state},
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};
use service_core::error::AppError;
use service_core::middleware::{
    metrics::metrics_middleware,
    rate_limit::{ip_rate_limit_middleware, IpRateLimiter},
    security_headers::security_headers_middleware,
    tracing::request_id_middleware,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::BillingConfig;
use crate::services::{
    CredentialStore, LedgerService, LedgerStore, ReadCache, Reconciler, TokenService,
};

#[derive(Clone)]
pub struct AppState {
    pub config: BillingConfig,
    pub store: Arc<dyn LedgerStore>,
    pub cache: Arc<dyn ReadCache>,
    pub jwt: TokenService,
    pub credentials: CredentialStore,
    pub ledger: LedgerService,
    pub reconciler: Reconciler,
    pub login_rate_limiter: IpRateLimiter,
    pub forgot_password_rate_limiter: IpRateLimiter,
    pub submit_rate_limiter: IpRateLimiter,
}

pub fn build_router(state: AppState) -> Result<Router, AppError> {
    // Login routes with rate limiting
    let login_routes = Router::new()
        .route("/auth/admin/login", post(handlers::auth::admin_login))
        .route("/auth/user/login", post(handlers::auth::user_login))
        .layer(from_fn_with_state(
            state.login_rate_limiter.clone(),
            ip_rate_limit_middleware,
        ));

    let forgot_password_route = Router::new()
        .route(
            "/auth/admin/forgot-password",
            post(handlers::auth::forgot_password),
        )
        .layer(from_fn_with_state(
            state.forgot_password_rate_limiter.clone(),
            ip_rate_limit_middleware,
        ));

    // Submission is open to customers, so it is rate limited; listing is admin only
    let submit_route = Router::new()
        .route(
            "/payment-requests",
            post(handlers::payment_requests::submit_payment_request),
        )
        .layer(from_fn_with_state(
            state.submit_rate_limiter.clone(),
            ip_rate_limit_middleware,
        ));

    let origins = state
        .config
        .security
        .allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::error!("Invalid CORS origin '{}': {}. Skipping.", origin, e);
                None
            }
        })
        .collect::<Vec<HeaderValue>>();

    let app = Router::new()
        .route("/health", get(health_check))
        .route("/metrics", get(handlers::metrics::metrics))
        .merge(login_routes)
        .merge(forgot_password_route)
        .route(
            "/auth/admin/reset-password",
            post(handlers::auth::reset_password),
        )
        .route(
            "/auth/admin/change-password",
            post(handlers::auth::change_password),
        )
        .route("/setup/create-admin", post(handlers::setup::create_admin))
        .route(
            "/customers",
            get(handlers::customers::list_customers).post(handlers::customers::create_customer),
        )
        .route(
            "/customers/:id",
            get(handlers::customers::get_customer)
                .put(handlers::customers::update_customer)
                .delete(handlers::customers::delete_customer),
        )
        .route(
            "/customers/:id/analytics",
            get(handlers::customers::customer_analytics),
        )
        .route(
            "/customers/:id/payments",
            get(handlers::customers::list_customer_payments)
                .post(handlers::customers::upsert_customer_payment),
        )
        .route("/payments", put(handlers::payments::upsert_payment))
        .merge(submit_route)
        .route(
            "/payment-requests",
            get(handlers::payment_requests::list_payment_requests),
        )
        .route(
            "/payment-requests/:id/verify",
            post(handlers::payment_requests::verify_payment_request),
        )
        .route("/dashboard", get(handlers::dashboard::admin_dashboard))
        .route("/user/dashboard", get(handlers::dashboard::user_dashboard))
        .with_state(state)
        // Add metrics middleware
        .layer(from_fn(metrics_middleware))
        // Add tracing layer
        .layer(TraceLayer::new_for_http().make_span_with(
            |request: &service_core::axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get("x-request-id")
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                    version = ?request.version(),
                )
            },
        ))
        // Add tracing middleware for request_id
        .layer(from_fn(request_id_middleware))
        // Add security headers middleware
        .layer(from_fn(security_headers_middleware))
        // Add CORS layer
        .layer(
            CorsLayer::new()
                .allow_origin(origins)
                .allow_methods([
                    Method::GET,
                    Method::POST,
                    Method::PUT,
                    Method::DELETE,
                    Method::OPTIONS,
                ])
                .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]),
        );

    Ok(app)
}

pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    match state.store.health_check().await {
        Ok(()) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "status": "healthy",
                "service": state.config.service_name,
                "version": state.config.service_version,
            })),
        ),
        Err(e) => {
            tracing::error!(error = %e, "Health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(serde_json::json!({
                    "status": "unhealthy",
                    "service": state.config.service_name,
                    "error": "store unavailable",
                })),
            )
        }
    }
}
