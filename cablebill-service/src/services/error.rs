use service_core::error::AppError;
use thiserror::Error;

use super::jwt::TokenError;
use super::store::StoreError;
use crate::models::MonthKeyError;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Token error: {0}")]
    Token(#[from] TokenError),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),

    #[error("Admin already exists with this email")]
    DuplicateEmail,

    #[error("Invalid email or password")]
    InvalidCredential,

    #[error("Action must be 'approve' or 'reject'")]
    InvalidAction,

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    InvalidMonth(#[from] MonthKeyError),
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        let message = err.to_string();
        match err {
            ServiceError::Store(StoreError::Database(e)) => AppError::from(e),
            ServiceError::Store(StoreError::Duplicate(e)) => AppError::Conflict(e),
            ServiceError::Store(StoreError::Internal(e)) => AppError::DatabaseError(e),
            ServiceError::Token(TokenError::Encoding(e)) => {
                AppError::InternalError(anyhow::anyhow!("Failed to issue token: {}", e))
            }
            ServiceError::Token(_) => {
                AppError::Unauthorized("Invalid or expired token".to_string())
            }
            ServiceError::Internal(e) => AppError::InternalError(e),
            ServiceError::DuplicateEmail => AppError::Conflict(message),
            ServiceError::InvalidCredential => AppError::Unauthorized(message),
            ServiceError::InvalidAction => AppError::BadRequest(message),
            ServiceError::NotFound(_) => AppError::NotFound(message),
            ServiceError::Validation(_) | ServiceError::InvalidMonth(_) => {
                AppError::BadRequest(message)
            }
        }
    }
}
