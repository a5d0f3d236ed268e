use service_core::{
    axum::{extract::State, http::StatusCode, response::IntoResponse, Json},
    error::AppError,
};

use super::ttl;
use crate::{
    dtos::dashboard::{DashboardResponse, UserDashboardResponse},
    middleware::{AdminAuth, CustomerAuth},
    services::cache,
    AppState,
};

pub async fn admin_dashboard(
    State(state): State<AppState>,
    _auth: AdminAuth,
) -> Result<impl IntoResponse, AppError> {
    let response = cache::cached(
        state.cache.as_ref(),
        "dashboard",
        ttl(state.config.cache.dashboard_ttl_seconds),
        async {
            let totals = state.ledger.dashboard().await?;
            Ok::<_, AppError>(DashboardResponse::from(&totals))
        },
    )
    .await?;

    Ok((StatusCode::OK, Json(response)))
}

pub async fn user_dashboard(
    State(state): State<AppState>,
    auth: CustomerAuth,
) -> Result<impl IntoResponse, AppError> {
    let key = format!("user_dashboard:{}", auth.customer_id.to_hex());
    let response = cache::cached(
        state.cache.as_ref(),
        &key,
        ttl(state.config.cache.list_ttl_seconds),
        async {
            let dashboard = state.ledger.user_dashboard(auth.customer_id).await?;
            Ok::<_, AppError>(UserDashboardResponse::from(&dashboard))
        },
    )
    .await?;

    Ok((StatusCode::OK, Json(response)))
}
