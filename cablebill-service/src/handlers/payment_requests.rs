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
    dtos::payment_requests::{
        ListPaymentRequestsQuery, PaymentRequestEnvelope, PaymentRequestListResponse,
        PaymentRequestResponse, SubmitPaymentRequest, VerifyPaymentRequest,
    },
    middleware::AdminAuth,
    services::{cache, reconciliation::Decision},
    utils::{parse_path_id, ValidatedJson},
    AppState,
};

pub async fn list_payment_requests(
    State(state): State<AppState>,
    _auth: AdminAuth,
    Query(query): Query<ListPaymentRequestsQuery>,
) -> Result<impl IntoResponse, AppError> {
    let key = match query.verified {
        Some(verified) => format!("payment_requests:{}", verified),
        None => "payment_requests:all".to_string(),
    };

    let response = cache::cached(
        state.cache.as_ref(),
        &key,
        ttl(state.config.cache.payment_requests_ttl_seconds),
        async {
            let requests = state.reconciler.list(query.verified).await?;
            Ok::<_, AppError>(PaymentRequestListResponse {
                payment_requests: requests.iter().map(PaymentRequestResponse::from).collect(),
            })
        },
    )
    .await?;

    Ok((StatusCode::OK, Json(response)))
}

pub async fn submit_payment_request(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<SubmitPaymentRequest>,
) -> Result<impl IntoResponse, AppError> {
    let request = state.reconciler.submit(req.into()).await?;
    cache::invalidate(state.cache.as_ref()).await;

    Ok((
        StatusCode::CREATED,
        Json(PaymentRequestEnvelope {
            message: "Payment request submitted".to_string(),
            payment_request: PaymentRequestResponse::new(&request, None),
        }),
    ))
}

pub async fn verify_payment_request(
    State(state): State<AppState>,
    auth: AdminAuth,
    Path(id): Path<String>,
    ValidatedJson(req): ValidatedJson<VerifyPaymentRequest>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_path_id(&id, "Payment request")?;
    let decision: Decision = req.action.parse()?;

    let request = state.reconciler.decide(id, decision, auth.admin_id).await?;
    cache::invalidate(state.cache.as_ref()).await;

    let message = match decision {
        Decision::Approve => "Payment request approved",
        Decision::Reject => "Payment request rejected",
    };
    Ok((
        StatusCode::OK,
        Json(PaymentRequestEnvelope {
            message: message.to_string(),
            payment_request: PaymentRequestResponse::new(&request, None),
        }),
    ))
}
