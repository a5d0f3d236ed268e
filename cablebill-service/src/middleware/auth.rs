use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap},
    response::{IntoResponse, Response},
};
use mongodb::bson::oid::ObjectId;
use service_core::error::AppError;
use thiserror::Error;

use crate::services::jwt::{Claims, Role, TokenService};
use crate::AppState;

#[derive(Debug, Error, PartialEq)]
pub enum AuthError {
    #[error("Missing or invalid Authorization header")]
    MissingToken,

    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("Insufficient permissions")]
    WrongRole,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        AppError::Unauthorized(self.to_string()).into_response()
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        AppError::Unauthorized(err.to_string())
    }
}

pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Verify the bearer token and require a session token for `role`.
/// Typed tokens (password reset) never pass.
pub fn require_role(
    tokens: &TokenService,
    headers: &HeaderMap,
    role: Role,
) -> Result<Claims, AuthError> {
    let token = bearer_token(headers).ok_or(AuthError::MissingToken)?;
    let claims = tokens.verify(token).map_err(|e| {
        tracing::debug!(error = %e, "Rejected bearer token");
        AuthError::InvalidToken
    })?;

    if claims.token_type.is_some() || claims.role != Some(role) {
        return Err(AuthError::WrongRole);
    }
    Ok(claims)
}

fn subject_id(claims: &Claims) -> Result<ObjectId, AuthError> {
    ObjectId::parse_str(&claims.sub).map_err(|_| AuthError::InvalidToken)
}

/// An authenticated admin session.
pub struct AdminAuth {
    pub admin_id: ObjectId,
    pub claims: Claims,
}

#[axum::async_trait]
impl FromRequestParts<AppState> for AdminAuth {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let claims = require_role(&state.jwt, &parts.headers, Role::Admin)?;
        Ok(AdminAuth {
            admin_id: subject_id(&claims)?,
            claims,
        })
    }
}

/// An authenticated customer session.
pub struct CustomerAuth {
    pub customer_id: ObjectId,
    pub claims: Claims,
}

#[axum::async_trait]
impl FromRequestParts<AppState> for CustomerAuth {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let claims = require_role(&state.jwt, &parts.headers, Role::User)?;
        Ok(CustomerAuth {
            customer_id: subject_id(&claims)?,
            claims,
        })
    }
}
