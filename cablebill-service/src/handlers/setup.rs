use service_core::{
    axum::{extract::State, http::StatusCode, response::IntoResponse, Json},
    error::AppError,
};

use crate::{
    dtos::auth::{AdminSummary, CreateAdminRequest, CreateAdminResponse},
    utils::{Password, ValidatedJson},
    AppState,
};

/// First-run admin bootstrap. Answers 404 once setup is disabled.
pub async fn create_admin(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<CreateAdminRequest>,
) -> Result<impl IntoResponse, AppError> {
    if !state.config.security.setup_enabled {
        return Err(AppError::NotFound("Setup is disabled".to_string()));
    }

    let admin = state
        .credentials
        .create_admin(&req.email, Password::new(req.password), req.name)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(CreateAdminResponse {
            message: "Admin created successfully".to_string(),
            admin: AdminSummary::from(&admin),
        }),
    ))
}
