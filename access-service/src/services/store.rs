//! Credential store contract shared by the Postgres and in-memory backends.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::models::{
    Company, NewCompany, NewPrivateLink, NewUser, PrivateLink, Role, RoleName, User,
};

#[derive(Debug, Error)]
pub enum StoreError {
    /// A unique field (email, company name) already holds this value.
    #[error("Duplicate {0}")]
    Duplicate(&'static str),

    #[error("Store backend error: {0}")]
    Backend(#[from] anyhow::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Result of presenting a reset token together with the replacement hash.
#[derive(Debug)]
pub enum ResetConsumption {
    /// Password overwritten; token and expiry cleared.
    Consumed(User),
    /// Token is on record but its expiry has passed. Nothing was changed.
    Expired,
    Unknown,
}

/// Profile fields the bootstrap administrator is reconciled with.
#[derive(Debug, Clone)]
pub struct AdminProfile {
    pub email: String,
    pub name: String,
    pub password_hash: String,
    pub profile_picture_path: String,
    pub company_id: i64,
}

/// Partial company update. `None` leaves the field unchanged.
#[derive(Debug, Clone, Default)]
pub struct CompanyChanges {
    pub name: Option<String>,
    pub location: Option<String>,
    pub website: Option<String>,
    pub wallet_address: Option<String>,
    pub slack: Option<String>,
    pub reward_vault: Option<String>,
}

/// Persistence for users, roles, companies and private links.
///
/// Emails and company names are matched case-insensitively. Token consumption
/// is compare-and-clear: of two concurrent callers presenting the same token,
/// at most one observes success.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn health_check(&self) -> StoreResult<()>;

    // Users
    async fn find_user_by_id(&self, id: i64) -> StoreResult<Option<User>>;
    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;
    /// The user whose email matches and whose watermark equals `iat`.
    async fn find_user_by_session(&self, email: &str, iat: i64) -> StoreResult<Option<User>>;
    async fn list_users(&self) -> StoreResult<Vec<User>>;
    async fn insert_user(&self, user: NewUser) -> StoreResult<User>;
    /// Overwrite an unverified account with fresh signup data.
    async fn replace_unverified_user(
        &self,
        id: i64,
        name: &str,
        password_hash: &str,
        verification_token: &str,
    ) -> StoreResult<User>;
    /// Mark verified and clear the token, if the token is on record.
    async fn consume_verification_token(&self, token: &str) -> StoreResult<Option<User>>;
    async fn set_reset_token(&self, user_id: i64, token: &str, expiry: DateTime<Utc>) -> StoreResult<()>;
    /// Valid while `now <= expiry`.
    async fn consume_reset_token(
        &self,
        token: &str,
        new_password_hash: &str,
        now: DateTime<Utc>,
    ) -> StoreResult<ResetConsumption>;
    async fn set_login_watermark(&self, user_id: i64, iat: i64) -> StoreResult<()>;
    /// Set the user's role and adjust both role counts.
    async fn assign_role(&self, user_id: i64, role: RoleName) -> StoreResult<()>;
    async fn assign_company(&self, user_id: i64, company_id: i64) -> StoreResult<()>;
    /// Delete the user and decrement their role count. Returns false if absent.
    async fn delete_user(&self, user_id: i64) -> StoreResult<bool>;
    async fn count_users_with_role(&self, role: RoleName) -> StoreResult<i64>;
    async fn find_users_with_role(&self, role: RoleName) -> StoreResult<Vec<User>>;
    /// Verified ADMIN account with the default company.
    async fn insert_admin(&self, profile: AdminProfile) -> StoreResult<User>;
    async fn update_admin(&self, user_id: i64, profile: AdminProfile) -> StoreResult<()>;

    // Roles
    async fn list_roles(&self) -> StoreResult<Vec<Role>>;
    async fn find_role_by_id(&self, id: i64) -> StoreResult<Option<Role>>;
    async fn find_role(&self, name: RoleName) -> StoreResult<Option<Role>>;
    /// Create the role with count 0 if it does not exist.
    async fn ensure_role(&self, name: RoleName) -> StoreResult<Role>;
    async fn set_role_count(&self, name: RoleName, count: i64) -> StoreResult<()>;

    // Companies
    async fn list_companies(&self) -> StoreResult<Vec<Company>>;
    async fn find_company(&self, id: i64) -> StoreResult<Option<Company>>;
    async fn find_company_by_name(&self, name: &str) -> StoreResult<Option<Company>>;
    async fn find_company_by_wallet(&self, wallet_address: &str) -> StoreResult<Option<Company>>;
    async fn insert_company(&self, company: NewCompany) -> StoreResult<Company>;
    async fn update_company(&self, id: i64, changes: CompanyChanges) -> StoreResult<Option<Company>>;
    /// Null members' company, delete its links and the company, atomically.
    async fn delete_company(&self, id: i64) -> StoreResult<bool>;

    // Private links
    async fn insert_private_link(&self, link: NewPrivateLink) -> StoreResult<PrivateLink>;
    async fn find_private_link(&self, id: i64) -> StoreResult<Option<PrivateLink>>;
    async fn delete_private_link(&self, id: i64) -> StoreResult<bool>;

    /// Remove every record. Only used by `RESET_DATA_ON_START`.
    async fn wipe(&self) -> StoreResult<()>;
}
