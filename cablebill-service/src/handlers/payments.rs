use service_core::{
    axum::{extract::State, http::StatusCode, response::IntoResponse, Json},
    error::AppError,
};

use crate::{
    dtos::payments::{PaymentEnvelope, PaymentResponse, UpsertPaymentRequest},
    middleware::AdminAuth,
    services::cache,
    utils::{parse_body_id, ValidatedJson},
    AppState,
};

pub async fn upsert_payment(
    State(state): State<AppState>,
    _auth: AdminAuth,
    ValidatedJson(req): ValidatedJson<UpsertPaymentRequest>,
) -> Result<impl IntoResponse, AppError> {
    let customer_id = parse_body_id(&req.customer_id, "customerId")?;
    let payment = state
        .ledger
        .upsert_payment(customer_id, &req.month, req.status, req.transaction_id)
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
