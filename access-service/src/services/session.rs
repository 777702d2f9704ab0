//! Session authority.
//!
//! A session credential is valid only while its `iat` equals the account's
//! stored `login_last_iat`. Each login moves that watermark forward, which
//! silently retires every credential issued earlier.
//!
//! Issue stamps are strictly increasing per account, so a burst of logins
//! within one second stamps credentials slightly in the future. Such a
//! credential is only honoured once the clock is at most
//! [`MAX_ISSUE_LEAD_SECS`] behind its stamp, which bounds every session to
//! the configured lifetime plus that lead.

use chrono::Duration;
use std::sync::Arc;

use super::clock::Clock;
use super::error::ServiceError;
use super::jwt::{JwtService, SessionClaims};
use super::metrics::record_login;
use super::store::CredentialStore;
use crate::models::{normalize_email, RoleName, User};
use crate::utils::{verify_password_blocking, Password, PasswordHashString};

/// Identity attached to an authenticated request.
#[derive(Debug, Clone, PartialEq)]
pub struct Identity {
    pub id: i64,
    pub email: String,
    pub role: Option<RoleName>,
    pub iat: i64,
}

impl From<SessionClaims> for Identity {
    fn from(claims: SessionClaims) -> Self {
        Self {
            id: claims.id,
            email: claims.email,
            role: claims.role,
            iat: claims.iat,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Authentication {
    Authenticated(Identity),
    Anonymous,
    /// Current credential of an account that has not verified its email.
    Unverified,
}

#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub token: String,
    pub user: User,
    pub iat: i64,
}

/// How far ahead of the clock an issue stamp may be and still authenticate.
pub const MAX_ISSUE_LEAD_SECS: i64 = 1;

#[derive(Clone)]
pub struct SessionAuthority {
    store: Arc<dyn CredentialStore>,
    jwt: JwtService,
    clock: Arc<dyn Clock>,
    lifetime: Duration,
}

impl SessionAuthority {
    pub fn new(
        store: Arc<dyn CredentialStore>,
        jwt: JwtService,
        clock: Arc<dyn Clock>,
        lifetime: Duration,
    ) -> Self {
        Self {
            store,
            jwt,
            clock,
            lifetime,
        }
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<LoginOutcome, ServiceError> {
        let email = normalize_email(email);

        let Some(user) = self.store.find_user_by_email(&email).await? else {
            record_login("invalid_credentials");
            return Err(ServiceError::InvalidCredentials);
        };

        let matched = verify_password_blocking(
            Password::new(password.to_string()),
            PasswordHashString::new(user.password_hash.clone()),
        )
        .await?;
        if !matched {
            record_login("invalid_credentials");
            tracing::info!(user_id = %user.id, "Login rejected: wrong password");
            return Err(ServiceError::InvalidCredentials);
        }

        if !user.is_verified {
            record_login("unverified");
            return Err(ServiceError::EmailNotVerified);
        }

        // Strictly after the previous watermark so a same-second relogin still
        // retires the older credential.
        let now = self.clock.now().timestamp();
        let iat = user.login_last_iat.map_or(now, |last| now.max(last + 1));

        let claims = SessionClaims {
            id: user.id,
            email: user.email.clone(),
            role: user.role,
            iat,
        };
        let token = self.jwt.encode_session(&claims)?;
        self.store.set_login_watermark(user.id, iat).await?;

        record_login("success");
        tracing::info!(user_id = %user.id, iat = iat, "User logged in");

        Ok(LoginOutcome { token, user, iat })
    }

    /// Resolve an optional credential. Anything unusable yields `Anonymous`.
    pub async fn authenticate(&self, credential: Option<&str>) -> Result<Authentication, ServiceError> {
        let Some(token) = credential else {
            return Ok(Authentication::Anonymous);
        };

        let claims = match self.jwt.decode_session(token) {
            Ok(claims) => claims,
            Err(e) => {
                tracing::debug!(error = %e, "Ignoring unverifiable session credential");
                return Ok(Authentication::Anonymous);
            }
        };

        let age = self.clock.now().timestamp() - claims.iat;
        if age < -MAX_ISSUE_LEAD_SECS {
            tracing::debug!(user_id = %claims.id, "Ignoring session credential stamped ahead of the clock");
            return Ok(Authentication::Anonymous);
        }
        if age > self.lifetime.num_seconds() {
            tracing::debug!(user_id = %claims.id, "Ignoring expired session credential");
            return Ok(Authentication::Anonymous);
        }

        match self.store.find_user_by_session(&claims.email, claims.iat).await? {
            None => {
                tracing::debug!(user_id = %claims.id, "Ignoring superseded session credential");
                Ok(Authentication::Anonymous)
            }
            Some(user) if !user.is_verified => Ok(Authentication::Unverified),
            Some(_) => Ok(Authentication::Authenticated(claims.into())),
        }
    }

    /// Like [`Self::authenticate`] but an absent or unusable credential is an error.
    pub async fn authenticate_required(&self, credential: Option<&str>) -> Result<Identity, ServiceError> {
        match self.authenticate(credential).await? {
            Authentication::Authenticated(identity) => Ok(identity),
            Authentication::Unverified => Err(ServiceError::UnverifiedSession),
            Authentication::Anonymous => Err(ServiceError::Unauthorized),
        }
    }
}
