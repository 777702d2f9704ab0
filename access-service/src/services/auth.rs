//! Signup, email verification and password recovery.

use std::sync::Arc;

use super::email::EmailProvider;
use super::error::ServiceError;
use super::store::CredentialStore;
use super::tokens::SecurityTokenIssuer;
use crate::models::{normalize_email, NewUser, User};
use crate::utils::{hash_password_blocking, passwords_match, validate_strength, Password};

#[derive(Clone)]
pub struct AuthService {
    store: Arc<dyn CredentialStore>,
    tokens: SecurityTokenIssuer,
    email: Arc<dyn EmailProvider>,
}

/// Mismatch is checked before strength so it wins when both fail.
fn check_new_password(password: &str, confirmation: &str) -> Result<(), ServiceError> {
    if !passwords_match(password, confirmation) {
        return Err(ServiceError::PasswordMismatch);
    }
    if !validate_strength(password) {
        return Err(ServiceError::WeakPassword);
    }
    Ok(())
}

impl AuthService {
    pub fn new(
        store: Arc<dyn CredentialStore>,
        tokens: SecurityTokenIssuer,
        email: Arc<dyn EmailProvider>,
    ) -> Self {
        Self { store, tokens, email }
    }

    /// Create an unverified account, or overwrite an existing unverified one,
    /// and send its verification link.
    pub async fn signup(
        &self,
        email: &str,
        name: &str,
        password: &str,
        repeat_password: &str,
    ) -> Result<User, ServiceError> {
        check_new_password(password, repeat_password)?;

        let email = normalize_email(email);
        let existing = self.store.find_user_by_email(&email).await?;
        if existing.as_ref().is_some_and(|u| u.is_verified) {
            return Err(ServiceError::EmailAlreadyVerified);
        }

        let password_hash = hash_password_blocking(Password::new(password.to_string()))
            .await?
            .into_string();
        let token = self.tokens.issue_verification_token();

        let user = match existing {
            Some(existing) => {
                tracing::info!(user_id = %existing.id, "Replacing unverified signup");
                self.store
                    .replace_unverified_user(existing.id, name, &password_hash, &token)
                    .await?
            }
            None => {
                self.store
                    .insert_user(NewUser::signup(name.to_string(), email.clone(), password_hash, token.clone()))
                    .await?
            }
        };

        tracing::info!(user_id = %user.id, "User signed up");

        if let Err(e) = self.email.send_verification_email(&user.email, &token).await {
            tracing::error!(user_id = %user.id, error = %e, "Failed to send verification email");
        }

        Ok(user)
    }

    pub async fn verify_email(&self, token: Option<&str>) -> Result<User, ServiceError> {
        let token = token
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(ServiceError::TokenRequired)?;

        self.tokens.consume_verification_token(token).await
    }

    /// Issue a reset token and email it.
    pub async fn forgot_password(&self, email: &str) -> Result<(), ServiceError> {
        let user = self
            .store
            .find_user_by_email(email)
            .await?
            .ok_or(ServiceError::UnknownEmail)?;

        let (token, expiry) = self.tokens.issue_reset_token(&user).await?;
        tracing::info!(user_id = %user.id, expires_at = %expiry, "Password reset requested");

        if let Err(e) = self.email.send_password_reset_email(&user.email, &token).await {
            tracing::error!(user_id = %user.id, error = %e, "Failed to send password reset email");
        }

        Ok(())
    }

    pub async fn reset_password(
        &self,
        token: &str,
        new_password: &str,
        confirm_new_password: &str,
    ) -> Result<User, ServiceError> {
        check_new_password(new_password, confirm_new_password)?;

        let token = token.trim();
        if token.is_empty() {
            return Err(ServiceError::InvalidOrExpiredToken);
        }

        let password_hash = hash_password_blocking(Password::new(new_password.to_string()))
            .await?
            .into_string();

        self.tokens.consume_reset_token(token, &password_hash).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::clock::ManualClock;
    use crate::services::email::{MockEmailService, SentEmailKind};
    use crate::services::memory::MemoryStore;
    use chrono::Duration;

    fn service() -> (AuthService, Arc<MemoryStore>, MockEmailService) {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(ManualClock::default());
        let mail = MockEmailService::new();
        let tokens = SecurityTokenIssuer::new(store.clone(), clock, Duration::hours(1));
        (AuthService::new(store.clone(), tokens, Arc::new(mail.clone())), store, mail)
    }

    #[test]
    fn test_mismatch_reported_before_weakness() {
        assert!(matches!(
            check_new_password("weak", "other"),
            Err(ServiceError::PasswordMismatch)
        ));
        assert!(matches!(
            check_new_password("weak", "weak"),
            Err(ServiceError::WeakPassword)
        ));
        assert!(check_new_password("GoodP@ss1", "GoodP@ss1").is_ok());
    }

    #[tokio::test]
    async fn test_signup_overwrites_unverified_account() {
        let (auth, store, mail) = service();
        let first = auth.signup("a@x.com", "A", "GoodP@ss1", "GoodP@ss1").await.unwrap();
        let second = auth.signup("A@x.com", "B", "OtherP@ss2", "OtherP@ss2").await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.name, "B");
        assert_ne!(first.email_verification_token, second.email_verification_token);
        assert_eq!(store.list_users().await.unwrap().len(), 1);
        assert_eq!(
            mail.last_token(SentEmailKind::Verification, "a@x.com"),
            second.email_verification_token
        );
    }

    #[tokio::test]
    async fn test_signup_refuses_verified_email() {
        let (auth, _store, mail) = service();
        auth.signup("a@x.com", "A", "GoodP@ss1", "GoodP@ss1").await.unwrap();
        let token = mail.last_token(SentEmailKind::Verification, "a@x.com").unwrap();
        auth.verify_email(Some(&token)).await.unwrap();

        assert!(matches!(
            auth.signup("a@x.com", "A", "GoodP@ss1", "GoodP@ss1").await,
            Err(ServiceError::EmailAlreadyVerified)
        ));
    }

    #[tokio::test]
    async fn test_signup_survives_email_failure() {
        let (auth, _store, mail) = service();
        mail.set_failing(true);
        assert!(auth.signup("a@x.com", "A", "GoodP@ss1", "GoodP@ss1").await.is_ok());
    }

    #[tokio::test]
    async fn test_verify_requires_token() {
        let (auth, _store, _mail) = service();
        assert!(matches!(auth.verify_email(None).await, Err(ServiceError::TokenRequired)));
        assert!(matches!(auth.verify_email(Some("  ")).await, Err(ServiceError::TokenRequired)));
        assert!(matches!(
            auth.verify_email(Some("deadbeef")).await,
            Err(ServiceError::InvalidOrExpiredToken)
        ));
    }

    #[tokio::test]
    async fn test_forgot_password_unknown_email() {
        let (auth, _store, _mail) = service();
        assert!(matches!(
            auth.forgot_password("ghost@x.com").await,
            Err(ServiceError::UnknownEmail)
        ));
    }
}
