use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use service_core::{
    axum::{extract::State, response::IntoResponse, Json},
    error::AppError,
};

use crate::{
    dtos::{
        auth::{LoginRequest, LoginResponse},
        ErrorResponse, MessageResponse,
    },
    middleware::{MaybeUser, ACCESS_TOKEN_COOKIE},
    services::ServiceError,
    utils::ValidatedJson,
    AppState,
};

fn session_cookie(value: String, secure: bool) -> Cookie<'static> {
    Cookie::build((ACCESS_TOKEN_COOKIE, value))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Strict)
        .path("/")
        .build()
}

/// Log in with email and password
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in; credential set as cookie and returned", body = LoginResponse),
        (status = 401, description = "Invalid email or password", body = ErrorResponse),
        (status = 403, description = "Email not verified", body = ErrorResponse)
    ),
    tag = "Authentication"
)]
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    ValidatedJson(req): ValidatedJson<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let outcome = state.sessions.login(&req.email, &req.password).await?;

    let jar = jar.add(session_cookie(
        outcome.token.clone(),
        state.config.session.cookie_secure,
    ));

    Ok((
        jar,
        Json(LoginResponse {
            message: "Logged in successfully".to_string(),
            role: outcome.user.role,
            access_token: outcome.token,
        }),
    ))
}

/// Clear the session cookie
#[utoipa::path(
    post,
    path = "/auth/logout",
    responses(
        (status = 200, description = "Logged out", body = MessageResponse),
        (status = 401, description = "No current session and no session cookie", body = ErrorResponse)
    ),
    tag = "Authentication",
    security(("bearer_auth" = []))
)]
pub async fn logout(
    State(state): State<AppState>,
    MaybeUser(identity): MaybeUser,
    jar: CookieJar,
) -> Result<impl IntoResponse, AppError> {
    // A current session, or at least a cookie to clear.
    if identity.is_none() && jar.get(ACCESS_TOKEN_COOKIE).is_none() {
        return Err(ServiceError::NotAuthenticated.into());
    }

    let jar = jar.remove(session_cookie(String::new(), state.config.session.cookie_secure));
    Ok((jar, Json(MessageResponse::new("Logged out successfully"))))
}
