use service_core::{
    axum::{extract::State, response::IntoResponse, Json},
    error::AppError,
};

use crate::{
    dtos::{
        auth::{ForgotPasswordRequest, ResetPasswordRequest},
        ErrorResponse, MessageResponse,
    },
    utils::ValidatedJson,
    AppState,
};

/// Email a password reset link
#[utoipa::path(
    post,
    path = "/auth/forgot-password",
    request_body = ForgotPasswordRequest,
    responses(
        (status = 200, description = "Reset email sent", body = MessageResponse),
        (status = 404, description = "No user with that email", body = ErrorResponse)
    ),
    tag = "Authentication"
)]
pub async fn forgot_password(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<ForgotPasswordRequest>,
) -> Result<impl IntoResponse, AppError> {
    state.auth.forgot_password(&req.email).await?;
    Ok(Json(MessageResponse::new("Password reset email sent.")))
}

/// Set a new password using a reset token
#[utoipa::path(
    post,
    path = "/auth/reset-password",
    request_body = ResetPasswordRequest,
    responses(
        (status = 200, description = "Password reset", body = MessageResponse),
        (status = 400, description = "Mismatch, weak password, or invalid or expired token", body = ErrorResponse)
    ),
    tag = "Authentication"
)]
pub async fn reset_password(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<ResetPasswordRequest>,
) -> Result<impl IntoResponse, AppError> {
    state
        .auth
        .reset_password(&req.token, &req.new_password, &req.confirm_new_password)
        .await?;
    Ok(Json(MessageResponse::new("Password reset successfully.")))
}
