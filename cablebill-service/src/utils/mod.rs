pub mod password;
pub mod validation;

pub use password::{Password, PasswordHasherConfig};
pub use validation::ValidatedJson;

use mongodb::bson::oid::ObjectId;
use service_core::error::AppError;

/// Path ids that do not parse cannot name anything, so they are a 404.
pub fn parse_path_id(raw: &str, what: &str) -> Result<ObjectId, AppError> {
    ObjectId::parse_str(raw).map_err(|_| AppError::NotFound(format!("{} not found", what)))
}

/// Malformed ids in a request body are the caller's mistake.
pub fn parse_body_id(raw: &str, field: &str) -> Result<ObjectId, AppError> {
    ObjectId::parse_str(raw).map_err(|_| AppError::BadRequest(format!("Invalid {}", field)))
}
