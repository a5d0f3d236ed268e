use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::{Payment, PaymentStatus};
use crate::services::aggregation::MonthStatus;

/// Body of `PUT /payments`.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpsertPaymentRequest {
    #[validate(length(min = 1, message = "customerId is required"))]
    pub customer_id: String,

    #[validate(length(min = 1, message = "Month is required"))]
    pub month: String,

    pub status: Option<PaymentStatus>,
    pub transaction_id: Option<String>,
}

/// Body of `POST /customers/:id/payments`.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CustomerPaymentRequest {
    #[validate(length(min = 1, message = "Month is required"))]
    pub month: String,

    pub status: Option<PaymentStatus>,
    pub transaction_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentResponse {
    pub id: String,
    pub customer_id: String,
    pub month: String,
    pub status: PaymentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paid_at: Option<DateTime<Utc>>,
    pub transaction_id: String,
    pub verified_by_admin: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Payment> for PaymentResponse {
    fn from(payment: &Payment) -> Self {
        Self {
            id: payment.id.to_hex(),
            customer_id: payment.customer_id.to_hex(),
            month: payment.month.to_string(),
            status: payment.status,
            paid_at: payment.paid_at.map(|at| at.to_chrono()),
            transaction_id: payment.transaction_id.clone(),
            verified_by_admin: payment.verified_by_admin,
            created_at: payment.created_at.to_chrono(),
            updated_at: payment.updated_at.to_chrono(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthStatusResponse {
    pub month: String,
    pub status: PaymentStatus,
    pub paid_at: Option<DateTime<Utc>>,
}

impl From<&MonthStatus> for MonthStatusResponse {
    fn from(status: &MonthStatus) -> Self {
        Self {
            month: status.month.to_string(),
            status: status.status,
            paid_at: status.paid_at.map(|at| at.to_chrono()),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PaymentListResponse {
    pub payments: Vec<PaymentResponse>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PaymentEnvelope {
    pub message: String,
    pub payment: PaymentResponse,
}
