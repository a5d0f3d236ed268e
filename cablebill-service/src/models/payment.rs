use mongodb::bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};

use super::MonthKey;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Paid,
    #[default]
    Unpaid,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Paid => "paid",
            PaymentStatus::Unpaid => "unpaid",
        }
    }
}

/// Paid/unpaid record for one customer and one month. At most one exists per
/// `(customer_id, month)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub customer_id: ObjectId,
    pub month: MonthKey,
    #[serde(default)]
    pub status: PaymentStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paid_at: Option<DateTime>,
    #[serde(default)]
    pub transaction_id: String,
    #[serde(default)]
    pub verified_by_admin: bool,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

impl Payment {
    pub fn new(customer_id: ObjectId, month: MonthKey) -> Self {
        let now = DateTime::now();
        Self {
            id: ObjectId::new(),
            customer_id,
            month,
            status: PaymentStatus::Unpaid,
            paid_at: None,
            transaction_id: String::new(),
            verified_by_admin: false,
            created_at: now,
            updated_at: now,
        }
    }
}
