use service_core::{
    axum::{
        extract::{Path, Query, State},
        http::StatusCode,
        response::IntoResponse,
        Json,
    },
    error::AppError,
};

use super::ttl;
use crate::{
    dtos::{
        customers::{
            AnalyticsQuery, AnalyticsResponse, CreateCustomerRequest, CustomerEnvelope,
            CustomerListResponse, CustomerWithDueResponse, UpdateCustomerRequest,
        },
        payments::{CustomerPaymentRequest, PaymentEnvelope, PaymentListResponse, PaymentResponse},
        MessageResponse,
    },
    middleware::AdminAuth,
    services::{aggregation::DEFAULT_ANALYTICS_WINDOW_MONTHS, cache},
    utils::{parse_path_id, ValidatedJson},
    AppState,
};

pub async fn list_customers(
    State(state): State<AppState>,
    _auth: AdminAuth,
) -> Result<impl IntoResponse, AppError> {
    let response = cache::cached(
        state.cache.as_ref(),
        "customers",
        ttl(state.config.cache.list_ttl_seconds),
        async {
            let dues = state.ledger.list_customers().await?;
            Ok::<_, AppError>(CustomerListResponse {
                customers: dues.iter().map(CustomerWithDueResponse::from).collect(),
            })
        },
    )
    .await?;

    Ok((StatusCode::OK, Json(response)))
}

pub async fn create_customer(
    State(state): State<AppState>,
    _auth: AdminAuth,
    ValidatedJson(req): ValidatedJson<CreateCustomerRequest>,
) -> Result<impl IntoResponse, AppError> {
    let customer = state.ledger.create_customer(req.into()).await?;
    cache::invalidate(state.cache.as_ref()).await;

    Ok((
        StatusCode::CREATED,
        Json(CustomerEnvelope::new(Some("Customer created"), &customer)),
    ))
}

pub async fn get_customer(
    State(state): State<AppState>,
    _auth: AdminAuth,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_path_id(&id, "Customer")?;
    let customer = state.ledger.get_customer(id).await?;
    Ok((StatusCode::OK, Json(CustomerEnvelope::new(None, &customer))))
}

pub async fn update_customer(
    State(state): State<AppState>,
    _auth: AdminAuth,
    Path(id): Path<String>,
    ValidatedJson(req): ValidatedJson<UpdateCustomerRequest>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_path_id(&id, "Customer")?;
    let customer = state.ledger.update_customer(id, req.into()).await?;
    cache::invalidate(state.cache.as_ref()).await;

    Ok((
        StatusCode::OK,
        Json(CustomerEnvelope::new(Some("Customer updated"), &customer)),
    ))
}

pub async fn delete_customer(
    State(state): State<AppState>,
    _auth: AdminAuth,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_path_id(&id, "Customer")?;
    state.ledger.delete_customer(id).await?;
    cache::invalidate(state.cache.as_ref()).await;

    Ok((StatusCode::OK, Json(MessageResponse::new("Customer deleted"))))
}

pub async fn customer_analytics(
    State(state): State<AppState>,
    _auth: AdminAuth,
    Path(id): Path<String>,
    Query(query): Query<AnalyticsQuery>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_path_id(&id, "Customer")?;
    let months = query.months.unwrap_or(DEFAULT_ANALYTICS_WINDOW_MONTHS);
    let key = format!("analytics:{}:{}", id.to_hex(), months);

    let response = cache::cached(
        state.cache.as_ref(),
        &key,
        ttl(state.config.cache.list_ttl_seconds),
        async {
            let (customer, analytics) = state.ledger.customer_analytics(id, Some(months)).await?;
            Ok::<_, AppError>(AnalyticsResponse::new(&customer, &analytics))
        },
    )
    .await?;

    Ok((StatusCode::OK, Json(response)))
}

pub async fn list_customer_payments(
    State(state): State<AppState>,
    _auth: AdminAuth,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_path_id(&id, "Customer")?;
    let payments = state.ledger.list_payments(id).await?;

    Ok((
        StatusCode::OK,
        Json(PaymentListResponse {
            payments: payments.iter().map(PaymentResponse::from).collect(),
        }),
    ))
}

pub async fn upsert_customer_payment(
    State(state): State<AppState>,
    _auth: AdminAuth,
    Path(id): Path<String>,
    ValidatedJson(req): ValidatedJson<CustomerPaymentRequest>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_path_id(&id, "Customer")?;
    let payment = state
        .ledger
        .upsert_payment(id, &req.month, req.status, req.transaction_id)
        .await?;
    cache::invalidate(state.cache.as_ref()).await;

    Ok((
        StatusCode::OK,
        Json(PaymentEnvelope {
            message: "Payment updated".to_string(),
            payment: PaymentResponse::from(&payment),
        }),
    ))
}
