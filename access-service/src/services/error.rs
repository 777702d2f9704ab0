use service_core::error::AppError;
use thiserror::Error;

use super::authz::Denial;
use super::store::StoreError;

pub const PASSWORD_MISMATCH: &str = "Passwords do not match.";
pub const WEAK_PASSWORD: &str = "Password must contain at least 8 characters, 1 uppercase letter, 1 lowercase letter, 1 number and 1 special character.";
pub const VERIFY_EMAIL: &str = "Please verify your email.";

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Database error: {0}")]
    Database(anyhow::Error),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),

    #[error("Email error: {0}")]
    EmailError(String),

    #[error("Passwords do not match")]
    PasswordMismatch,

    #[error("Password too weak")]
    WeakPassword,

    #[error("Email already registered and verified")]
    EmailAlreadyVerified,

    #[error("Token is required")]
    TokenRequired,

    #[error("Invalid or expired token")]
    InvalidOrExpiredToken,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Email not verified")]
    EmailNotVerified,

    /// A valid session for an account that is not verified.
    #[error("Session belongs to an unverified account")]
    UnverifiedSession,

    #[error("Not authenticated")]
    NotAuthenticated,

    #[error("Unauthorized")]
    Unauthorized,

    #[error("No user with that email")]
    UnknownEmail,

    #[error("Invalid link token")]
    InvalidLinkToken,

    #[error("{0}")]
    NotFound(&'static str),

    #[error("{0}")]
    BadRequest(&'static str),

    #[error("{0}")]
    Conflict(&'static str),

    #[error("Denied: {0:?}")]
    Denied(Denial),
}

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Duplicate("company name") => ServiceError::Conflict("Company already exists."),
            StoreError::Duplicate(what) => {
                ServiceError::Database(anyhow::anyhow!("unexpected duplicate {}", what))
            }
            StoreError::Backend(e) => ServiceError::Database(e),
        }
    }
}

impl From<Denial> for ServiceError {
    fn from(denial: Denial) -> Self {
        ServiceError::Denied(denial)
    }
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        let msg = |m: &str| m.to_string();
        match err {
            ServiceError::Database(e) => AppError::DatabaseError(e),
            ServiceError::Internal(e) => AppError::InternalError(e),
            ServiceError::EmailError(e) => AppError::EmailError(e),
            ServiceError::PasswordMismatch => AppError::BadRequest(msg(PASSWORD_MISMATCH)),
            ServiceError::WeakPassword => AppError::BadRequest(msg(WEAK_PASSWORD)),
            ServiceError::EmailAlreadyVerified => {
                AppError::BadRequest(msg("Email already registered and verified."))
            }
            ServiceError::TokenRequired => AppError::BadRequest(msg("Token is required.")),
            ServiceError::InvalidOrExpiredToken => AppError::BadRequest(msg("Invalid or expired token.")),
            ServiceError::InvalidCredentials => AppError::AuthError(msg("Invalid email or password.")),
            ServiceError::EmailNotVerified => AppError::VerificationRequired(msg(VERIFY_EMAIL)),
            ServiceError::UnverifiedSession => AppError::AuthError(msg(VERIFY_EMAIL)),
            ServiceError::NotAuthenticated => AppError::AuthError(msg("Not authenticated")),
            ServiceError::Unauthorized => AppError::AuthError(msg("Unauthorized")),
            ServiceError::UnknownEmail => {
                AppError::NotFound(msg("No user found with that email address."))
            }
            ServiceError::InvalidLinkToken => AppError::BadRequest(msg("Invalid link token.")),
            ServiceError::NotFound(m) => AppError::NotFound(msg(m)),
            ServiceError::BadRequest(m) => AppError::BadRequest(msg(m)),
            ServiceError::Conflict(m) => AppError::Conflict(msg(m)),
            ServiceError::Denied(denial) => denial.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use service_core::axum::http::StatusCode;

    #[test]
    fn test_unverified_login_and_unverified_session_differ() {
        let login: AppError = ServiceError::EmailNotVerified.into();
        let session: AppError = ServiceError::UnverifiedSession.into();
        assert_eq!(login.status(), StatusCode::FORBIDDEN);
        assert_eq!(session.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_duplicate_company_name_is_conflict() {
        let err: ServiceError = StoreError::Duplicate("company name").into();
        let app: AppError = err.into();
        assert_eq!(app.status(), StatusCode::CONFLICT);
    }
}
