//! Security token issuer: single-use random tokens for email verification and
//! password reset.

use chrono::{DateTime, Duration, Utc};
use rand::{rngs::OsRng, RngCore};
use std::sync::Arc;

use super::clock::Clock;
use super::error::ServiceError;
use super::metrics::record_token_consumption;
use super::store::{CredentialStore, ResetConsumption};
use crate::models::User;

/// 256 bits of entropy.
const TOKEN_BYTES: usize = 32;

/// Opaque hex token from the OS RNG.
pub fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

#[derive(Clone)]
pub struct SecurityTokenIssuer {
    store: Arc<dyn CredentialStore>,
    clock: Arc<dyn Clock>,
    reset_lifetime: Duration,
}

impl SecurityTokenIssuer {
    pub fn new(store: Arc<dyn CredentialStore>, clock: Arc<dyn Clock>, reset_lifetime: Duration) -> Self {
        Self {
            store,
            clock,
            reset_lifetime,
        }
    }

    /// A fresh verification token. Stored by signup, replacing any previous one.
    pub fn issue_verification_token(&self) -> String {
        generate_token()
    }

    /// Mint a reset token for the user and store it with its expiry.
    pub async fn issue_reset_token(&self, user: &User) -> Result<(String, DateTime<Utc>), ServiceError> {
        let token = generate_token();
        let expiry = self.clock.now() + self.reset_lifetime;
        self.store.set_reset_token(user.id, &token, expiry).await?;
        Ok((token, expiry))
    }

    /// Verify the owning account and clear the token.
    pub async fn consume_verification_token(&self, token: &str) -> Result<User, ServiceError> {
        match self.store.consume_verification_token(token).await? {
            Some(user) => {
                record_token_consumption("verification", "consumed");
                tracing::info!(user_id = %user.id, "Email verified");
                Ok(user)
            }
            None => {
                record_token_consumption("verification", "unknown");
                Err(ServiceError::InvalidOrExpiredToken)
            }
        }
    }

    /// Overwrite the password and clear the token, if the token is known and unexpired.
    pub async fn consume_reset_token(&self, token: &str, new_password_hash: &str) -> Result<User, ServiceError> {
        let now = self.clock.now();
        match self.store.consume_reset_token(token, new_password_hash, now).await? {
            ResetConsumption::Consumed(user) => {
                record_token_consumption("reset", "consumed");
                tracing::info!(user_id = %user.id, "Password reset");
                Ok(user)
            }
            ResetConsumption::Expired => {
                record_token_consumption("reset", "expired");
                tracing::debug!("Reset token presented after expiry");
                Err(ServiceError::InvalidOrExpiredToken)
            }
            ResetConsumption::Unknown => {
                record_token_consumption("reset", "unknown");
                Err(ServiceError::InvalidOrExpiredToken)
            }
        }
    }
}
