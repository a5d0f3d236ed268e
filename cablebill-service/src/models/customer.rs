//! Customer model - one household on the cable network.

use mongodb::bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub name: String,
    #[serde(default)]
    pub phone: String,
    pub village: String,
    /// Current monthly charge. Dues are always priced at this value.
    #[serde(default)]
    pub bill_amount: i64,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

impl Customer {
    pub fn new(name: String, phone: String, village: String, bill_amount: i64) -> Self {
        let now = DateTime::now();
        Self {
            id: ObjectId::new(),
            name,
            phone,
            village,
            bill_amount,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Free-text identity a customer presents at login or on a payment request.
#[derive(Debug, Clone)]
pub struct CustomerIdentity {
    pub name: String,
    pub phone: String,
    pub village: String,
}

impl CustomerIdentity {
    /// Case-insensitive substring match on name and village, exact match on phone.
    pub fn matches(&self, customer: &Customer) -> bool {
        customer.phone == self.phone
            && contains_ignore_case(&customer.name, &self.name)
            && contains_ignore_case(&customer.village, &self.village)
    }
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}
