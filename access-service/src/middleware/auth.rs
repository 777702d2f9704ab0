use axum_extra::extract::cookie::CookieJar;
use service_core::axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};
use service_core::error::AppError;

use crate::services::metrics::record_denial;
use crate::services::{authorize, Action, Authentication, Denial, Identity, ServiceError};
use crate::AppState;

pub const ACCESS_TOKEN_COOKIE: &str = "accessToken";

/// Credential from `Authorization: Bearer`, else from the `accessToken` cookie.
pub fn credential_from(headers: &HeaderMap) -> Option<String> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty());

    match bearer {
        Some(token) => Some(token.to_string()),
        None => CookieJar::from_headers(headers)
            .get(ACCESS_TOKEN_COOKIE)
            .map(|cookie| cookie.value().to_string())
            .filter(|token| !token.is_empty()),
    }
}

/// Resolve the session credential, if any, and attach the [`Identity`].
///
/// Requests without a usable credential continue anonymously. The current
/// credential of an unverified account is refused outright.
pub async fn session_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let credential = credential_from(req.headers());

    match state.sessions.authenticate(credential.as_deref()).await? {
        Authentication::Authenticated(identity) => {
            req.extensions_mut().insert(identity);
        }
        Authentication::Anonymous => {}
        Authentication::Unverified => return Err(ServiceError::UnverifiedSession.into()),
    }

    Ok(next.run(req).await)
}

/// Gate for the management surface: ADMIN or STAFF, as currently stored.
pub async fn require_manager(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let Some(identity) = req.extensions().get::<Identity>() else {
        record_denial(Action::Manage.name());
        return Err(ServiceError::Denied(Denial::NotPrivileged).into());
    };

    let actor = state.management.load_actor(identity).await?;
    authorize(&actor, Action::Manage).into_result().map_err(|denial| {
        record_denial(Action::Manage.name());
        tracing::info!(user_id = %actor.id, "Management access denied");
        ServiceError::Denied(denial)
    })?;

    Ok(next.run(req).await)
}

/// Identity of an authenticated request. Rejects with 401 "Not authenticated".
pub struct AuthUser(pub Identity);

#[service_core::axum::async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Identity>()
            .cloned()
            .map(AuthUser)
            .ok_or_else(|| ServiceError::NotAuthenticated.into())
    }
}

/// Identity if the request carried a current session credential.
pub struct MaybeUser(pub Option<Identity>);

#[service_core::axum::async_trait]
impl<S> FromRequestParts<S> for MaybeUser
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(MaybeUser(parts.extensions.get::<Identity>().cloned()))
    }
}
