use service_core::{
    axum::{extract::State, http::StatusCode, response::IntoResponse, Json},
    error::AppError,
};

use crate::{
    dtos::{
        auth::{
            AdminLoginRequest, AdminLoginResponse, AdminSummary, ChangePasswordRequest,
            ForgotPasswordRequest, ForgotPasswordResponse, ResetPasswordRequest,
            UserLoginRequest, UserLoginResponse,
        },
        customers::CustomerResponse,
        MessageResponse,
    },
    middleware::AdminAuth,
    services::{metrics, ServiceError},
    utils::{Password, ValidatedJson},
    AppState,
};
use mongodb::bson::oid::ObjectId;

pub async fn admin_login(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<AdminLoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let password = Password::new(req.password);
    let admin = match state.credentials.authenticate(&req.email, &password).await {
        Ok(admin) => admin,
        Err(e) => {
            metrics::record_login("admin", "failure");
            tracing::warn!(email = %req.email, "Admin login failed");
            return Err(e.into());
        }
    };

    let token = state.jwt.issue_admin_session(&admin).map_err(ServiceError::from)?;
    metrics::record_login("admin", "success");
    tracing::info!(admin_id = %admin.id, "Admin logged in");

    Ok((
        StatusCode::OK,
        Json(AdminLoginResponse {
            message: "Login successful".to_string(),
            token,
            admin: AdminSummary::from(&admin),
        }),
    ))
}

pub async fn user_login(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<UserLoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let customer = state
        .ledger
        .login_customer(&req.name, &req.phone, &req.village)
        .await?;

    let token = state
        .jwt
        .issue_user_session(&customer)
        .map_err(ServiceError::from)?;
    tracing::info!(customer_id = %customer.id, "Customer logged in");

    Ok((
        StatusCode::OK,
        Json(UserLoginResponse {
            message: "Login successful".to_string(),
            token,
            customer: CustomerResponse::from(&customer),
        }),
    ))
}

/// Always answers 200 so the response does not reveal whether the email
/// belongs to an admin.
pub async fn forgot_password(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<ForgotPasswordRequest>,
) -> Result<impl IntoResponse, AppError> {
    let reset_token = match state.credentials.find_by_email(&req.email).await? {
        Some(admin) => {
            let token = state
                .jwt
                .issue_password_reset(&admin)
                .map_err(ServiceError::from)?;
            tracing::info!(admin_id = %admin.id, "Password reset token issued");
            Some(token)
        }
        None => {
            tracing::info!("Password reset requested for unknown email");
            None
        }
    };

    Ok((
        StatusCode::OK,
        Json(ForgotPasswordResponse {
            message: "If the email is registered, a reset token has been issued".to_string(),
            reset_token,
        }),
    ))
}

pub async fn reset_password(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<ResetPasswordRequest>,
) -> Result<impl IntoResponse, AppError> {
    let claims = state
        .jwt
        .verify_password_reset(&req.token)
        .map_err(ServiceError::from)?;
    let admin_id = ObjectId::parse_str(&claims.sub)
        .map_err(|_| AppError::Unauthorized("Invalid or expired token".to_string()))?;

    state
        .credentials
        .reset_password(admin_id, Password::new(req.new_password))
        .await?;

    Ok((
        StatusCode::OK,
        Json(MessageResponse::new("Password reset successful")),
    ))
}

pub async fn change_password(
    State(state): State<AppState>,
    auth: AdminAuth,
    ValidatedJson(req): ValidatedJson<ChangePasswordRequest>,
) -> Result<impl IntoResponse, AppError> {
    state
        .credentials
        .change_password(
            auth.admin_id,
            &Password::new(req.current_password),
            Password::new(req.new_password),
        )
        .await
        .map_err(|e| match e {
            ServiceError::InvalidCredential => {
                AppError::Unauthorized("Current password is incorrect".to_string())
            }
            other => other.into(),
        })?;

    Ok((
        StatusCode::OK,
        Json(MessageResponse::new("Password changed successfully")),
    ))
}
