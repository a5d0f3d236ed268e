use mongodb::bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};

use super::MonthKey;

/// A customer's self-reported bKash payment awaiting admin verification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequest {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub name: String,
    pub phone: String,
    pub village: String,
    #[serde(default)]
    pub customer_id: Option<ObjectId>,
    pub transaction_id: String,
    pub month: MonthKey,
    pub amount: i64,
    #[serde(rename = "screenshotURL", default)]
    pub screenshot_url: String,
    #[serde(default)]
    pub verified: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verified_by: Option<ObjectId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verified_at: Option<DateTime>,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}
