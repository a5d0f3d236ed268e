use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::payments::{MonthStatusResponse, PaymentResponse};
use crate::models::Customer;
use crate::services::aggregation::{CustomerAnalytics, CustomerDue};
use crate::services::ledger::NewCustomer;
use crate::services::store::CustomerPatch;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateCustomerRequest {
    #[serde(default)]
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,

    pub phone: Option<String>,

    #[serde(default)]
    #[validate(length(min = 1, message = "Village is required"))]
    pub village: String,

    #[validate(range(min = 0, message = "Bill amount cannot be negative"))]
    pub bill_amount: Option<i64>,
}

impl From<CreateCustomerRequest> for NewCustomer {
    fn from(req: CreateCustomerRequest) -> Self {
        Self {
            name: req.name,
            phone: req.phone,
            village: req.village,
            bill_amount: req.bill_amount,
        }
    }
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCustomerRequest {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub village: Option<String>,

    #[validate(range(min = 0, message = "Bill amount cannot be negative"))]
    pub bill_amount: Option<i64>,
}

impl From<UpdateCustomerRequest> for CustomerPatch {
    fn from(req: UpdateCustomerRequest) -> Self {
        Self {
            name: req.name,
            phone: req.phone,
            village: req.village,
            bill_amount: req.bill_amount,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerResponse {
    pub id: String,
    pub name: String,
    pub phone: String,
    pub village: String,
    pub bill_amount: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Customer> for CustomerResponse {
    fn from(customer: &Customer) -> Self {
        Self {
            id: customer.id.to_hex(),
            name: customer.name.clone(),
            phone: customer.phone.clone(),
            village: customer.village.clone(),
            bill_amount: customer.bill_amount,
            created_at: customer.created_at.to_chrono(),
            updated_at: customer.updated_at.to_chrono(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerWithDueResponse {
    #[serde(flatten)]
    pub customer: CustomerResponse,
    pub unpaid_months: u32,
    pub total_due: i64,
}

impl From<&CustomerDue> for CustomerWithDueResponse {
    fn from(due: &CustomerDue) -> Self {
        Self {
            customer: CustomerResponse::from(&due.customer),
            unpaid_months: due.unpaid_months,
            total_due: due.total_due,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CustomerListResponse {
    pub customers: Vec<CustomerWithDueResponse>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CustomerEnvelope {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub customer: CustomerResponse,
}

impl CustomerEnvelope {
    pub fn new(message: Option<&str>, customer: &Customer) -> Self {
        Self {
            message: message.map(str::to_string),
            customer: CustomerResponse::from(customer),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct AnalyticsQuery {
    pub months: Option<usize>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsResponse {
    pub customer: CustomerResponse,
    pub total_due: i64,
    pub unpaid_months: u32,
    pub paid_months: u32,
    pub total_collected: u32,
    /// Rolling window of `?months=N` entries.
    #[serde(rename = "last6Months")]
    pub months: Vec<MonthStatusResponse>,
    #[serde(rename = "allPayments")]
    pub payments: Vec<PaymentResponse>,
}

impl AnalyticsResponse {
    pub fn new(customer: &Customer, analytics: &CustomerAnalytics) -> Self {
        Self {
            customer: CustomerResponse::from(customer),
            total_due: analytics.total_due,
            unpaid_months: analytics.unpaid_months,
            paid_months: analytics.paid_months,
            total_collected: analytics.total_collected,
            months: analytics.window.iter().map(MonthStatusResponse::from).collect(),
            payments: analytics.history.iter().map(PaymentResponse::from).collect(),
        }
    }
}
