use mongodb::bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};

pub const DEFAULT_ADMIN_NAME: &str = "Admin";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Admin {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub email: String,
    /// Argon2 PHC string, never the raw password.
    #[serde(rename = "password")]
    pub password_hash: String,
    pub name: String,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

impl Admin {
    pub fn new(email: String, password_hash: String, name: Option<String>) -> Self {
        let now = DateTime::now();
        Self {
            id: ObjectId::new(),
            email,
            password_hash,
            name: name
                .filter(|n| !n.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_ADMIN_NAME.to_string()),
            created_at: now,
            updated_at: now,
        }
    }
}
