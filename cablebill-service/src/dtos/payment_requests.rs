use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::{Customer, PaymentRequest};
use crate::services::reconciliation::NewPaymentRequest;
use crate::services::store::PaymentRequestWithCustomer;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SubmitPaymentRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub village: String,
    #[serde(default)]
    pub transaction_id: String,
    #[serde(default)]
    pub month: String,

    #[validate(range(min = 1, message = "Amount must be greater than 0"))]
    pub amount: i64,

    #[serde(rename = "screenshotURL")]
    pub screenshot_url: Option<String>,
}

impl From<SubmitPaymentRequest> for NewPaymentRequest {
    fn from(req: SubmitPaymentRequest) -> Self {
        Self {
            name: req.name,
            phone: req.phone,
            village: req.village,
            transaction_id: req.transaction_id,
            month: req.month,
            amount: req.amount,
            screenshot_url: req.screenshot_url,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct VerifyPaymentRequest {
    #[validate(length(min = 1, message = "Action is required"))]
    pub action: String,
}

#[derive(Debug, Deserialize)]
pub struct ListPaymentRequestsQuery {
    pub verified: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkedCustomer {
    pub id: String,
    pub name: String,
    pub phone: String,
    pub village: String,
}

impl From<&Customer> for LinkedCustomer {
    fn from(customer: &Customer) -> Self {
        Self {
            id: customer.id.to_hex(),
            name: customer.name.clone(),
            phone: customer.phone.clone(),
            village: customer.village.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequestResponse {
    pub id: String,
    pub name: String,
    pub phone: String,
    pub village: String,
    pub customer_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer: Option<LinkedCustomer>,
    pub transaction_id: String,
    pub month: String,
    pub amount: i64,
    #[serde(rename = "screenshotURL")]
    pub screenshot_url: String,
    pub verified: bool,
    pub verified_by: Option<String>,
    pub verified_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl PaymentRequestResponse {
    pub fn new(request: &PaymentRequest, customer: Option<&Customer>) -> Self {
        Self {
            id: request.id.to_hex(),
            name: request.name.clone(),
            phone: request.phone.clone(),
            village: request.village.clone(),
            customer_id: request.customer_id.map(|id| id.to_hex()),
            customer: customer.map(LinkedCustomer::from),
            transaction_id: request.transaction_id.clone(),
            month: request.month.to_string(),
            amount: request.amount,
            screenshot_url: request.screenshot_url.clone(),
            verified: request.verified,
            verified_by: request.verified_by.map(|id| id.to_hex()),
            verified_at: request.verified_at.map(|at| at.to_chrono()),
            created_at: request.created_at.to_chrono(),
        }
    }
}

impl From<&PaymentRequestWithCustomer> for PaymentRequestResponse {
    fn from(joined: &PaymentRequestWithCustomer) -> Self {
        Self::new(&joined.request, joined.customer.as_ref())
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequestListResponse {
    pub payment_requests: Vec<PaymentRequestResponse>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequestEnvelope {
    pub message: String,
    pub payment_request: PaymentRequestResponse,
}
