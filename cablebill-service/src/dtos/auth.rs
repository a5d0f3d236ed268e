use serde::{Deserialize, Serialize};
use validator::Validate;

use super::customers::CustomerResponse;
use crate::models::Admin;

#[derive(Debug, Deserialize, Validate)]
pub struct AdminLoginRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AdminSummary {
    pub id: String,
    pub email: String,
    pub name: String,
}

impl From<&Admin> for AdminSummary {
    fn from(admin: &Admin) -> Self {
        Self {
            id: admin.id.to_hex(),
            email: admin.email.clone(),
            name: admin.name.clone(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AdminLoginResponse {
    pub message: String,
    pub token: String,
    pub admin: AdminSummary,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UserLoginRequest {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,

    #[validate(length(min = 1, message = "Phone is required"))]
    pub phone: String,

    #[validate(length(min = 1, message = "Village is required"))]
    pub village: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserLoginResponse {
    pub message: String,
    pub token: String,
    pub customer: CustomerResponse,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ForgotPasswordRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForgotPasswordResponse {
    pub message: String,
    /// Only present when the email belongs to an admin.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reset_token: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    #[validate(length(min = 1, message = "Token is required"))]
    pub token: String,

    #[validate(length(min = 1, message = "New password is required"))]
    pub new_password: String,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    #[validate(length(min = 1, message = "Current password is required"))]
    pub current_password: String,

    #[validate(length(min = 1, message = "New password is required"))]
    pub new_password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateAdminRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,

    pub name: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateAdminResponse {
    pub message: String,
    pub admin: AdminSummary,
}
