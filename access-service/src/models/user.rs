//! User model - accounts with verification/reset state and the session watermark.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use utoipa::ToSchema;

use super::{Company, RoleName};

/// User entity.
///
/// `login_last_iat` is the issued-at of the most recent accepted login; only a
/// session credential carrying exactly this value authenticates.
#[derive(Debug, Clone)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub profile_picture_path: String,
    pub is_verified: bool,
    pub email_verification_token: Option<String>,
    pub reset_token: Option<String>,
    pub reset_token_expiry: Option<DateTime<Utc>>,
    pub login_last_iat: Option<i64>,
    pub role: Option<RoleName>,
    pub company_id: Option<i64>,
}

impl User {
    /// Convert to a response without the password hash or any token.
    pub fn sanitized(&self, company: Option<Company>) -> UserResponse {
        UserResponse {
            id: self.id,
            name: self.name.clone(),
            email: self.email.clone(),
            is_verified: self.is_verified,
            profile_picture_path: self.profile_picture_path.clone(),
            role: self.role,
            company,
        }
    }
}

/// Fields needed to insert a user.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub profile_picture_path: String,
    pub is_verified: bool,
    pub email_verification_token: Option<String>,
    pub role: Option<RoleName>,
    pub company_id: Option<i64>,
}

impl NewUser {
    /// An unverified, roleless account as created by signup.
    pub fn signup(name: String, email: String, password_hash: String, token: String) -> Self {
        Self {
            name,
            email,
            password_hash,
            profile_picture_path: String::new(),
            is_verified: false,
            email_verification_token: Some(token),
            role: None,
            company_id: None,
        }
    }
}

/// Row shape of `users LEFT JOIN roles`.
#[derive(Debug, Clone, FromRow)]
pub struct UserRow {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub profile_picture_path: String,
    pub is_verified: bool,
    pub email_verification_token: Option<String>,
    pub reset_token: Option<String>,
    pub reset_token_expiry: Option<DateTime<Utc>>,
    pub login_last_iat: Option<i64>,
    pub role_name: Option<String>,
    pub company_id: Option<i64>,
}

impl TryFrom<UserRow> for User {
    type Error = anyhow::Error;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let role = row
            .role_name
            .map(|name| name.parse::<RoleName>())
            .transpose()
            .map_err(anyhow::Error::msg)?;

        Ok(Self {
            id: row.id,
            name: row.name,
            email: row.email,
            password_hash: row.password_hash,
            profile_picture_path: row.profile_picture_path,
            is_verified: row.is_verified,
            email_verification_token: row.email_verification_token,
            reset_token: row.reset_token,
            reset_token_expiry: row.reset_token_expiry,
            login_last_iat: row.login_last_iat,
            role,
            company_id: row.company_id,
        })
    }
}

/// User response for API (without sensitive fields).
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub is_verified: bool,
    pub profile_picture_path: String,
    pub role: Option<RoleName>,
    pub company: Option<Company>,
}

/// Canonical form used for storing and comparing emails.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_email_folds_case_and_whitespace() {
        assert_eq!(normalize_email("  Alice@Example.COM "), "alice@example.com");
    }

    #[test]
    fn test_row_with_unknown_role_is_rejected() {
        let row = UserRow {
            id: 1,
            name: "a".into(),
            email: "a@x.com".into(),
            password_hash: "h".into(),
            profile_picture_path: String::new(),
            is_verified: true,
            email_verification_token: None,
            reset_token: None,
            reset_token_expiry: None,
            login_last_iat: None,
            role_name: Some("OWNER".into()),
            company_id: None,
        };
        assert!(User::try_from(row).is_err());
    }
}
