use service_core::{
    axum::{
        extract::{Query, State},
        http::StatusCode,
        response::IntoResponse,
        Json,
    },
    error::AppError,
};

use crate::{
    dtos::{
        auth::{SignupRequest, VerifyEmailQuery},
        ErrorResponse, MessageResponse,
    },
    utils::ValidatedJson,
    AppState,
};

/// Create an account and send its verification email
#[utoipa::path(
    post,
    path = "/auth/signup",
    request_body = SignupRequest,
    responses(
        (status = 201, description = "User created", body = MessageResponse),
        (status = 400, description = "Invalid body, password mismatch, weak password or email taken", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "Authentication"
)]
pub async fn signup(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<SignupRequest>,
) -> Result<impl IntoResponse, AppError> {
    state
        .auth
        .signup(&req.email, &req.name, &req.password, &req.repeat_password)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(MessageResponse::new(
            "User created successfully. Please verify your email.",
        )),
    ))
}

/// Verify an email address with the token from the verification email
#[utoipa::path(
    get,
    path = "/auth/verify-email",
    params(VerifyEmailQuery),
    responses(
        (status = 200, description = "Email verified", body = MessageResponse),
        (status = 400, description = "Missing, invalid or used token", body = ErrorResponse)
    ),
    tag = "Authentication"
)]
pub async fn verify_email(
    State(state): State<AppState>,
    Query(query): Query<VerifyEmailQuery>,
) -> Result<impl IntoResponse, AppError> {
    state.auth.verify_email(query.token.as_deref()).await?;
    Ok(Json(MessageResponse::new("Email verified successfully.")))
}
