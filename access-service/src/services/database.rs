//! PostgreSQL credential store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{
    postgres::PgArguments,
    types::Json,
    PgPool, Postgres,
};

use super::store::{
    AdminProfile, CompanyChanges, CredentialStore, ResetConsumption, StoreError, StoreResult,
};
use crate::models::{
    normalize_email, Company, NewCompany, NewPrivateLink, NewUser, PrivateLink, PrivateLinkRow,
    Role, RoleName, RoleRow, User, UserRow,
};

const USER_COLUMNS: &str = "u.id, u.name, u.email, u.password_hash, u.profile_picture_path, \
     u.is_verified, u.email_verification_token, u.reset_token, u.reset_token_expiry, \
     u.login_last_iat, r.name AS role_name, u.company_id";

const COMPANY_COLUMNS: &str = "id, name, location, website, wallet_address, slack, reward_vault";

const LINK_COLUMNS: &str = "id, company_id, receiver_address, used, fund_validator_tx_data";

fn select_users(filter: &str) -> String {
    format!(
        "SELECT {} FROM users u LEFT JOIN roles r ON r.id = u.role_id {}",
        USER_COLUMNS, filter
    )
}

/// Run a user-mutating statement aliased as `updated` and return the joined row.
fn returning_user(update: &str) -> String {
    format!(
        "WITH updated AS ({} RETURNING *) SELECT {} FROM updated u LEFT JOIN roles r ON r.id = u.role_id",
        update, USER_COLUMNS
    )
}

fn db_err(what: &'static str) -> impl Fn(sqlx::Error) -> StoreError {
    move |e| {
        let unique = e
            .as_database_error()
            .is_some_and(|db| db.is_unique_violation());
        if unique {
            StoreError::Duplicate(what)
        } else {
            StoreError::Backend(anyhow::anyhow!(e))
        }
    }
}

fn backend(e: sqlx::Error) -> StoreError {
    StoreError::Backend(anyhow::anyhow!(e))
}

type UserQuery<'q> = sqlx::query::QueryAs<'q, Postgres, UserRow, PgArguments>;

fn into_user(row: UserRow) -> StoreResult<User> {
    User::try_from(row).map_err(StoreError::Backend)
}

fn into_users(rows: Vec<UserRow>) -> StoreResult<Vec<User>> {
    rows.into_iter().map(into_user).collect()
}

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch_user(&self, query: UserQuery<'_>) -> StoreResult<Option<User>> {
        let row = query.fetch_optional(&self.pool).await.map_err(backend)?;
        row.map(into_user).transpose()
    }
}

#[async_trait]
impl CredentialStore for PgStore {
    async fn health_check(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(backend)?;
        Ok(())
    }

    async fn find_user_by_id(&self, id: i64) -> StoreResult<Option<User>> {
        let sql = select_users("WHERE u.id = $1");
        self.fetch_user(sqlx::query_as(&sql).bind(id)).await
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let email = normalize_email(email);
        let sql = select_users("WHERE LOWER(u.email) = $1");
        self.fetch_user(sqlx::query_as(&sql).bind(email)).await
    }

    async fn find_user_by_session(&self, email: &str, iat: i64) -> StoreResult<Option<User>> {
        let email = normalize_email(email);
        let sql = select_users("WHERE LOWER(u.email) = $1 AND u.login_last_iat = $2");
        self.fetch_user(sqlx::query_as(&sql).bind(email).bind(iat))
            .await
    }

    async fn list_users(&self) -> StoreResult<Vec<User>> {
        let rows = sqlx::query_as::<_, UserRow>(&select_users("ORDER BY u.id"))
            .fetch_all(&self.pool)
            .await
            .map_err(backend)?;
        into_users(rows)
    }

    async fn insert_user(&self, user: NewUser) -> StoreResult<User> {
        let sql = returning_user(
            "INSERT INTO users (name, email, password_hash, profile_picture_path, is_verified, \
             email_verification_token, role_id, company_id) \
             VALUES ($1, $2, $3, $4, $5, $6, (SELECT id FROM roles WHERE name = $7), $8)",
        );
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(&user.name)
            .bind(normalize_email(&user.email))
            .bind(&user.password_hash)
            .bind(&user.profile_picture_path)
            .bind(user.is_verified)
            .bind(&user.email_verification_token)
            .bind(user.role.map(|r| r.as_str()))
            .bind(user.company_id)
            .fetch_one(&self.pool)
            .await
            .map_err(db_err("email"))?;
        into_user(row)
    }

    async fn replace_unverified_user(
        &self,
        id: i64,
        name: &str,
        password_hash: &str,
        verification_token: &str,
    ) -> StoreResult<User> {
        let sql = returning_user(
            "UPDATE users SET name = $2, password_hash = $3, email_verification_token = $4, \
             profile_picture_path = '' WHERE id = $1 AND is_verified = FALSE",
        );
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(id)
            .bind(name)
            .bind(password_hash)
            .bind(verification_token)
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?
            .ok_or_else(|| StoreError::Backend(anyhow::anyhow!("no unverified user {}", id)))?;
        into_user(row)
    }

    async fn consume_verification_token(&self, token: &str) -> StoreResult<Option<User>> {
        let sql = returning_user(
            "UPDATE users SET is_verified = TRUE, email_verification_token = NULL \
             WHERE email_verification_token = $1",
        );
        self.fetch_user(sqlx::query_as(&sql).bind(token)).await
    }

    async fn set_reset_token(&self, user_id: i64, token: &str, expiry: DateTime<Utc>) -> StoreResult<()> {
        sqlx::query("UPDATE users SET reset_token = $2, reset_token_expiry = $3 WHERE id = $1")
            .bind(user_id)
            .bind(token)
            .bind(expiry)
            .execute(&self.pool)
            .await
            .map_err(backend)?;
        Ok(())
    }

    async fn consume_reset_token(
        &self,
        token: &str,
        new_password_hash: &str,
        now: DateTime<Utc>,
    ) -> StoreResult<ResetConsumption> {
        let sql = returning_user(
            "UPDATE users SET password_hash = $2, reset_token = NULL, reset_token_expiry = NULL \
             WHERE reset_token = $1 AND reset_token_expiry >= $3",
        );
        let consumed = self
            .fetch_user(
                sqlx::query_as(&sql)
                    .bind(token)
                    .bind(new_password_hash)
                    .bind(now),
            )
            .await?;
        if let Some(user) = consumed {
            return Ok(ResetConsumption::Consumed(user));
        }

        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM users WHERE reset_token = $1)")
                .bind(token)
                .fetch_one(&self.pool)
                .await
                .map_err(backend)?;

        Ok(if exists {
            ResetConsumption::Expired
        } else {
            ResetConsumption::Unknown
        })
    }

    async fn set_login_watermark(&self, user_id: i64, iat: i64) -> StoreResult<()> {
        sqlx::query("UPDATE users SET login_last_iat = $2 WHERE id = $1")
            .bind(user_id)
            .bind(iat)
            .execute(&self.pool)
            .await
            .map_err(backend)?;
        Ok(())
    }

    async fn assign_role(&self, user_id: i64, role: RoleName) -> StoreResult<()> {
        let mut tx = self.pool.begin().await.map_err(backend)?;

        let previous: Option<Option<i64>> =
            sqlx::query_scalar("SELECT role_id FROM users WHERE id = $1 FOR UPDATE")
                .bind(user_id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(backend)?;
        let Some(previous) = previous else {
            return Ok(());
        };

        if let Some(previous) = previous {
            sqlx::query("UPDATE roles SET member_count = GREATEST(member_count - 1, 0) WHERE id = $1")
                .bind(previous)
                .execute(&mut *tx)
                .await
                .map_err(backend)?;
        }

        sqlx::query("UPDATE users SET role_id = (SELECT id FROM roles WHERE name = $2) WHERE id = $1")
            .bind(user_id)
            .bind(role.as_str())
            .execute(&mut *tx)
            .await
            .map_err(backend)?;

        sqlx::query("UPDATE roles SET member_count = member_count + 1 WHERE name = $1")
            .bind(role.as_str())
            .execute(&mut *tx)
            .await
            .map_err(backend)?;

        tx.commit().await.map_err(backend)?;
        Ok(())
    }

    async fn assign_company(&self, user_id: i64, company_id: i64) -> StoreResult<()> {
        sqlx::query("UPDATE users SET company_id = $2 WHERE id = $1")
            .bind(user_id)
            .bind(company_id)
            .execute(&self.pool)
            .await
            .map_err(backend)?;
        Ok(())
    }

    async fn delete_user(&self, user_id: i64) -> StoreResult<bool> {
        let mut tx = self.pool.begin().await.map_err(backend)?;

        let removed: Option<Option<i64>> =
            sqlx::query_scalar("DELETE FROM users WHERE id = $1 RETURNING role_id")
                .bind(user_id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(backend)?;

        let Some(role_id) = removed else {
            return Ok(false);
        };

        if let Some(role_id) = role_id {
            sqlx::query("UPDATE roles SET member_count = GREATEST(member_count - 1, 0) WHERE id = $1")
                .bind(role_id)
                .execute(&mut *tx)
                .await
                .map_err(backend)?;
        }

        tx.commit().await.map_err(backend)?;
        Ok(true)
    }

    async fn count_users_with_role(&self, role: RoleName) -> StoreResult<i64> {
        sqlx::query_scalar(
            "SELECT COUNT(*) FROM users u JOIN roles r ON r.id = u.role_id WHERE r.name = $1",
        )
        .bind(role.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(backend)
    }

    async fn find_users_with_role(&self, role: RoleName) -> StoreResult<Vec<User>> {
        let rows = sqlx::query_as::<_, UserRow>(&select_users("WHERE r.name = $1 ORDER BY u.id"))
            .bind(role.as_str())
            .fetch_all(&self.pool)
            .await
            .map_err(backend)?;
        into_users(rows)
    }

    async fn insert_admin(&self, profile: AdminProfile) -> StoreResult<User> {
        self.insert_user(NewUser {
            name: profile.name,
            email: profile.email,
            password_hash: profile.password_hash,
            profile_picture_path: profile.profile_picture_path,
            is_verified: true,
            email_verification_token: None,
            role: Some(RoleName::Admin),
            company_id: Some(profile.company_id),
        })
        .await
    }

    async fn update_admin(&self, user_id: i64, profile: AdminProfile) -> StoreResult<()> {
        sqlx::query(
            "UPDATE users SET email = $2, name = $3, password_hash = $4, profile_picture_path = $5, \
             company_id = $6, is_verified = TRUE WHERE id = $1",
        )
        .bind(user_id)
        .bind(normalize_email(&profile.email))
        .bind(&profile.name)
        .bind(&profile.password_hash)
        .bind(&profile.profile_picture_path)
        .bind(profile.company_id)
        .execute(&self.pool)
        .await
        .map_err(db_err("email"))?;
        Ok(())
    }

    async fn list_roles(&self) -> StoreResult<Vec<Role>> {
        let rows = sqlx::query_as::<_, RoleRow>("SELECT id, name, member_count FROM roles ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .map_err(backend)?;
        rows.into_iter()
            .map(|row| Role::try_from(row).map_err(StoreError::Backend))
            .collect()
    }

    async fn find_role_by_id(&self, id: i64) -> StoreResult<Option<Role>> {
        let row = sqlx::query_as::<_, RoleRow>("SELECT id, name, member_count FROM roles WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?;
        row.map(|row| Role::try_from(row).map_err(StoreError::Backend))
            .transpose()
    }

    async fn find_role(&self, name: RoleName) -> StoreResult<Option<Role>> {
        let row = sqlx::query_as::<_, RoleRow>("SELECT id, name, member_count FROM roles WHERE name = $1")
            .bind(name.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?;
        row.map(|row| Role::try_from(row).map_err(StoreError::Backend))
            .transpose()
    }

    async fn ensure_role(&self, name: RoleName) -> StoreResult<Role> {
        sqlx::query("INSERT INTO roles (name, member_count) VALUES ($1, 0) ON CONFLICT (name) DO NOTHING")
            .bind(name.as_str())
            .execute(&self.pool)
            .await
            .map_err(backend)?;

        self.find_role(name)
            .await?
            .ok_or_else(|| StoreError::Backend(anyhow::anyhow!("role {} missing after insert", name)))
    }

    async fn set_role_count(&self, name: RoleName, count: i64) -> StoreResult<()> {
        sqlx::query("UPDATE roles SET member_count = GREATEST($2, 0) WHERE name = $1")
            .bind(name.as_str())
            .bind(count)
            .execute(&self.pool)
            .await
            .map_err(backend)?;
        Ok(())
    }

    async fn list_companies(&self) -> StoreResult<Vec<Company>> {
        sqlx::query_as::<_, Company>(&format!("SELECT {} FROM companies ORDER BY id", COMPANY_COLUMNS))
            .fetch_all(&self.pool)
            .await
            .map_err(backend)
    }

    async fn find_company(&self, id: i64) -> StoreResult<Option<Company>> {
        sqlx::query_as::<_, Company>(&format!("SELECT {} FROM companies WHERE id = $1", COMPANY_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)
    }

    async fn find_company_by_name(&self, name: &str) -> StoreResult<Option<Company>> {
        sqlx::query_as::<_, Company>(&format!(
            "SELECT {} FROM companies WHERE LOWER(TRIM(name)) = LOWER(TRIM($1))",
            COMPANY_COLUMNS
        ))
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)
    }

    async fn find_company_by_wallet(&self, wallet_address: &str) -> StoreResult<Option<Company>> {
        sqlx::query_as::<_, Company>(&format!(
            "SELECT {} FROM companies WHERE LOWER(wallet_address) = LOWER($1) ORDER BY id LIMIT 1",
            COMPANY_COLUMNS
        ))
        .bind(wallet_address)
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)
    }

    async fn insert_company(&self, company: NewCompany) -> StoreResult<Company> {
        sqlx::query_as::<_, Company>(&format!(
            "INSERT INTO companies (name, location, website, wallet_address, slack, reward_vault) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {}",
            COMPANY_COLUMNS
        ))
        .bind(&company.name)
        .bind(&company.location)
        .bind(&company.website)
        .bind(&company.wallet_address)
        .bind(&company.slack)
        .bind(&company.reward_vault)
        .fetch_one(&self.pool)
        .await
        .map_err(db_err("company name"))
    }

    async fn update_company(&self, id: i64, changes: CompanyChanges) -> StoreResult<Option<Company>> {
        sqlx::query_as::<_, Company>(&format!(
            "UPDATE companies SET name = COALESCE($2, name), location = COALESCE($3, location), \
             website = COALESCE($4, website), wallet_address = COALESCE($5, wallet_address), \
             slack = COALESCE($6, slack), reward_vault = COALESCE($7, reward_vault) \
             WHERE id = $1 RETURNING {}",
            COMPANY_COLUMNS
        ))
        .bind(id)
        .bind(&changes.name)
        .bind(&changes.location)
        .bind(&changes.website)
        .bind(&changes.wallet_address)
        .bind(&changes.slack)
        .bind(&changes.reward_vault)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err("company name"))
    }

    async fn delete_company(&self, id: i64) -> StoreResult<bool> {
        let mut tx = self.pool.begin().await.map_err(backend)?;

        sqlx::query("UPDATE users SET company_id = NULL WHERE company_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(backend)?;

        sqlx::query("DELETE FROM private_links WHERE company_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(backend)?;

        let result = sqlx::query("DELETE FROM companies WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(backend)?;

        tx.commit().await.map_err(backend)?;
        Ok(result.rows_affected() > 0)
    }

    async fn insert_private_link(&self, link: NewPrivateLink) -> StoreResult<PrivateLink> {
        let row = sqlx::query_as::<_, PrivateLinkRow>(&format!(
            "INSERT INTO private_links (company_id, receiver_address, used, fund_validator_tx_data) \
             VALUES ($1, $2, FALSE, $3) RETURNING {}",
            LINK_COLUMNS
        ))
        .bind(link.company_id)
        .bind(&link.receiver_address)
        .bind(Json(&link.fund_validator_tx_data))
        .fetch_one(&self.pool)
        .await
        .map_err(backend)?;
        Ok(row.into())
    }

    async fn find_private_link(&self, id: i64) -> StoreResult<Option<PrivateLink>> {
        let row = sqlx::query_as::<_, PrivateLinkRow>(&format!(
            "SELECT {} FROM private_links WHERE id = $1",
            LINK_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;
        Ok(row.map(Into::into))
    }

    async fn delete_private_link(&self, id: i64) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM private_links WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(backend)?;
        Ok(result.rows_affected() > 0)
    }

    async fn wipe(&self) -> StoreResult<()> {
        sqlx::query("TRUNCATE private_links, users, roles, companies RESTART IDENTITY CASCADE")
            .execute(&self.pool)
            .await
            .map_err(backend)?;
        Ok(())
    }
}
