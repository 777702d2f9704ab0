//! In-process credential store for tests and `STORE_BACKEND=memory` runs.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use subtle::ConstantTimeEq;
use tokio::sync::RwLock;

use super::store::{
    AdminProfile, CompanyChanges, CredentialStore, ResetConsumption, StoreError, StoreResult,
};
use crate::models::{
    normalize_email, same_company_name, Company, NewCompany, NewPrivateLink, NewUser,
    PrivateLink, Role, RoleName, User,
};

#[derive(Default)]
struct Tables {
    users: BTreeMap<i64, User>,
    roles: BTreeMap<i64, Role>,
    companies: BTreeMap<i64, Company>,
    links: BTreeMap<i64, PrivateLink>,
    next_id: i64,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn email_taken(&self, email: &str, except: Option<i64>) -> bool {
        let email = normalize_email(email);
        self.users
            .values()
            .any(|u| Some(u.id) != except && normalize_email(&u.email) == email)
    }

    fn company_name_taken(&self, name: &str, except: Option<i64>) -> bool {
        self.companies
            .values()
            .any(|c| Some(c.id) != except && c.is_named(name))
    }

    fn role_mut(&mut self, name: RoleName) -> Option<&mut Role> {
        self.roles.values_mut().find(|r| r.name == name)
    }

    fn bump_role(&mut self, name: RoleName, delta: i64) {
        if let Some(role) = self.role_mut(name) {
            role.count = (role.count + delta).max(0);
        }
    }
}

fn token_matches(stored: Option<&String>, presented: &str) -> bool {
    match stored {
        Some(stored) => stored.as_bytes().ct_eq(presented.as_bytes()).into(),
        None => false,
    }
}

#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CredentialStore for MemoryStore {
    async fn health_check(&self) -> StoreResult<()> {
        Ok(())
    }

    async fn find_user_by_id(&self, id: i64) -> StoreResult<Option<User>> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let email = normalize_email(email);
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .values()
            .find(|u| normalize_email(&u.email) == email)
            .cloned())
    }

    async fn find_user_by_session(&self, email: &str, iat: i64) -> StoreResult<Option<User>> {
        let email = normalize_email(email);
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .values()
            .find(|u| normalize_email(&u.email) == email && u.login_last_iat == Some(iat))
            .cloned())
    }

    async fn list_users(&self) -> StoreResult<Vec<User>> {
        Ok(self.tables.read().await.users.values().cloned().collect())
    }

    async fn insert_user(&self, user: NewUser) -> StoreResult<User> {
        let mut tables = self.tables.write().await;
        if tables.email_taken(&user.email, None) {
            return Err(StoreError::Duplicate("email"));
        }

        let id = tables.next_id();
        let user = User {
            id,
            name: user.name,
            email: normalize_email(&user.email),
            password_hash: user.password_hash,
            profile_picture_path: user.profile_picture_path,
            is_verified: user.is_verified,
            email_verification_token: user.email_verification_token,
            reset_token: None,
            reset_token_expiry: None,
            login_last_iat: None,
            role: user.role,
            company_id: user.company_id,
        };
        tables.users.insert(id, user.clone());
        Ok(user)
    }

    async fn replace_unverified_user(
        &self,
        id: i64,
        name: &str,
        password_hash: &str,
        verification_token: &str,
    ) -> StoreResult<User> {
        let mut tables = self.tables.write().await;
        let user = tables
            .users
            .get_mut(&id)
            .filter(|u| !u.is_verified)
            .ok_or_else(|| StoreError::Backend(anyhow::anyhow!("no unverified user {}", id)))?;

        user.name = name.to_string();
        user.password_hash = password_hash.to_string();
        user.email_verification_token = Some(verification_token.to_string());
        user.profile_picture_path = String::new();
        Ok(user.clone())
    }

    async fn consume_verification_token(&self, token: &str) -> StoreResult<Option<User>> {
        let mut tables = self.tables.write().await;
        let user = tables
            .users
            .values_mut()
            .find(|u| token_matches(u.email_verification_token.as_ref(), token));

        Ok(user.map(|user| {
            user.is_verified = true;
            user.email_verification_token = None;
            user.clone()
        }))
    }

    async fn set_reset_token(&self, user_id: i64, token: &str, expiry: DateTime<Utc>) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        if let Some(user) = tables.users.get_mut(&user_id) {
            user.reset_token = Some(token.to_string());
            user.reset_token_expiry = Some(expiry);
        }
        Ok(())
    }

    async fn consume_reset_token(
        &self,
        token: &str,
        new_password_hash: &str,
        now: DateTime<Utc>,
    ) -> StoreResult<ResetConsumption> {
        let mut tables = self.tables.write().await;
        let Some(user) = tables
            .users
            .values_mut()
            .find(|u| token_matches(u.reset_token.as_ref(), token))
        else {
            return Ok(ResetConsumption::Unknown);
        };

        match user.reset_token_expiry {
            Some(expiry) if now <= expiry => {
                user.password_hash = new_password_hash.to_string();
                user.reset_token = None;
                user.reset_token_expiry = None;
                Ok(ResetConsumption::Consumed(user.clone()))
            }
            _ => Ok(ResetConsumption::Expired),
        }
    }

    async fn set_login_watermark(&self, user_id: i64, iat: i64) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        if let Some(user) = tables.users.get_mut(&user_id) {
            user.login_last_iat = Some(iat);
        }
        Ok(())
    }

    async fn assign_role(&self, user_id: i64, role: RoleName) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        let Some(user) = tables.users.get_mut(&user_id) else {
            return Ok(());
        };
        let previous = user.role.replace(role);

        if let Some(previous) = previous {
            tables.bump_role(previous, -1);
        }
        tables.bump_role(role, 1);
        Ok(())
    }

    async fn assign_company(&self, user_id: i64, company_id: i64) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        if let Some(user) = tables.users.get_mut(&user_id) {
            user.company_id = Some(company_id);
        }
        Ok(())
    }

    async fn delete_user(&self, user_id: i64) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;
        match tables.users.remove(&user_id) {
            Some(user) => {
                if let Some(role) = user.role {
                    tables.bump_role(role, -1);
                }
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn count_users_with_role(&self, role: RoleName) -> StoreResult<i64> {
        let tables = self.tables.read().await;
        Ok(tables.users.values().filter(|u| u.role == Some(role)).count() as i64)
    }

    async fn find_users_with_role(&self, role: RoleName) -> StoreResult<Vec<User>> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .values()
            .filter(|u| u.role == Some(role))
            .cloned()
            .collect())
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
        let mut tables = self.tables.write().await;
        if tables.email_taken(&profile.email, Some(user_id)) {
            return Err(StoreError::Duplicate("email"));
        }
        if let Some(user) = tables.users.get_mut(&user_id) {
            user.email = normalize_email(&profile.email);
            user.name = profile.name;
            user.password_hash = profile.password_hash;
            user.profile_picture_path = profile.profile_picture_path;
            user.company_id = Some(profile.company_id);
            user.is_verified = true;
        }
        Ok(())
    }

    async fn list_roles(&self) -> StoreResult<Vec<Role>> {
        Ok(self.tables.read().await.roles.values().cloned().collect())
    }

    async fn find_role_by_id(&self, id: i64) -> StoreResult<Option<Role>> {
        Ok(self.tables.read().await.roles.get(&id).cloned())
    }

    async fn find_role(&self, name: RoleName) -> StoreResult<Option<Role>> {
        let tables = self.tables.read().await;
        Ok(tables.roles.values().find(|r| r.name == name).cloned())
    }

    async fn ensure_role(&self, name: RoleName) -> StoreResult<Role> {
        let mut tables = self.tables.write().await;
        if let Some(role) = tables.roles.values().find(|r| r.name == name) {
            return Ok(role.clone());
        }

        let id = tables.next_id();
        let role = Role { id, name, count: 0 };
        tables.roles.insert(id, role.clone());
        Ok(role)
    }

    async fn set_role_count(&self, name: RoleName, count: i64) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        if let Some(role) = tables.role_mut(name) {
            role.count = count.max(0);
        }
        Ok(())
    }

    async fn list_companies(&self) -> StoreResult<Vec<Company>> {
        Ok(self.tables.read().await.companies.values().cloned().collect())
    }

    async fn find_company(&self, id: i64) -> StoreResult<Option<Company>> {
        Ok(self.tables.read().await.companies.get(&id).cloned())
    }

    async fn find_company_by_name(&self, name: &str) -> StoreResult<Option<Company>> {
        let tables = self.tables.read().await;
        Ok(tables.companies.values().find(|c| c.is_named(name)).cloned())
    }

    async fn find_company_by_wallet(&self, wallet_address: &str) -> StoreResult<Option<Company>> {
        let tables = self.tables.read().await;
        Ok(tables
            .companies
            .values()
            .find(|c| c.wallet_address.eq_ignore_ascii_case(wallet_address))
            .cloned())
    }

    async fn insert_company(&self, company: NewCompany) -> StoreResult<Company> {
        let mut tables = self.tables.write().await;
        if tables.company_name_taken(&company.name, None) {
            return Err(StoreError::Duplicate("company name"));
        }

        let id = tables.next_id();
        let company = Company {
            id,
            name: company.name,
            location: company.location,
            website: company.website,
            wallet_address: company.wallet_address,
            slack: company.slack,
            reward_vault: company.reward_vault,
        };
        tables.companies.insert(id, company.clone());
        Ok(company)
    }

    async fn update_company(&self, id: i64, changes: CompanyChanges) -> StoreResult<Option<Company>> {
        let mut tables = self.tables.write().await;
        if let Some(name) = &changes.name {
            if tables.company_name_taken(name, Some(id)) {
                return Err(StoreError::Duplicate("company name"));
            }
        }

        let Some(company) = tables.companies.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(name) = changes.name {
            company.name = name;
        }
        if let Some(location) = changes.location {
            company.location = location;
        }
        if let Some(website) = changes.website {
            company.website = website;
        }
        if let Some(wallet_address) = changes.wallet_address {
            company.wallet_address = wallet_address;
        }
        if let Some(slack) = changes.slack {
            company.slack = Some(slack);
        }
        if let Some(reward_vault) = changes.reward_vault {
            company.reward_vault = Some(reward_vault);
        }
        Ok(Some(company.clone()))
    }

    async fn delete_company(&self, id: i64) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;
        if tables.companies.remove(&id).is_none() {
            return Ok(false);
        }

        for user in tables.users.values_mut() {
            if user.company_id == Some(id) {
                user.company_id = None;
            }
        }
        tables.links.retain(|_, link| link.company_id != id);
        Ok(true)
    }

    async fn insert_private_link(&self, link: NewPrivateLink) -> StoreResult<PrivateLink> {
        let mut tables = self.tables.write().await;
        if !tables.companies.contains_key(&link.company_id) {
            return Err(StoreError::Backend(anyhow::anyhow!(
                "company {} does not exist",
                link.company_id
            )));
        }

        let id = tables.next_id();
        let link = PrivateLink {
            id,
            company_id: link.company_id,
            receiver_address: link.receiver_address,
            used: false,
            fund_validator_tx_data: link.fund_validator_tx_data,
        };
        tables.links.insert(id, link.clone());
        Ok(link)
    }

    async fn find_private_link(&self, id: i64) -> StoreResult<Option<PrivateLink>> {
        Ok(self.tables.read().await.links.get(&id).cloned())
    }

    async fn delete_private_link(&self, id: i64) -> StoreResult<bool> {
        Ok(self.tables.write().await.links.remove(&id).is_some())
    }

    async fn wipe(&self) -> StoreResult<()> {
        *self.tables.write().await = Tables::default();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn new_user(email: &str, token: &str) -> NewUser {
        NewUser::signup("Alice".into(), email.into(), "hash".into(), token.into())
    }

    #[tokio::test]
    async fn test_email_uniqueness_is_case_insensitive() {
        let store = MemoryStore::new();
        store.insert_user(new_user("a@x.com", "t1")).await.unwrap();

        let err = store.insert_user(new_user("A@X.com", "t2")).await.unwrap_err();
        assert!(matches!(err, StoreError::Duplicate("email")));
        assert!(store.find_user_by_email("  A@x.COM").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_verification_token_consumed_once() {
        let store = MemoryStore::new();
        store.insert_user(new_user("a@x.com", "tok")).await.unwrap();

        let user = store.consume_verification_token("tok").await.unwrap().unwrap();
        assert!(user.is_verified);
        assert!(user.email_verification_token.is_none());
        assert!(store.consume_verification_token("tok").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_reset_token_expiry_boundary() {
        let store = MemoryStore::new();
        let user = store.insert_user(new_user("a@x.com", "v")).await.unwrap();
        let expiry = Utc::now();

        store.set_reset_token(user.id, "r1", expiry).await.unwrap();
        let late = store
            .consume_reset_token("r1", "new", expiry + Duration::milliseconds(1))
            .await
            .unwrap();
        assert!(matches!(late, ResetConsumption::Expired));

        let on_time = store.consume_reset_token("r1", "new", expiry).await.unwrap();
        match on_time {
            ResetConsumption::Consumed(user) => {
                assert_eq!(user.password_hash, "new");
                assert!(user.reset_token.is_none());
                assert!(user.reset_token_expiry.is_none());
            }
            other => panic!("unexpected {:?}", other),
        }

        let again = store.consume_reset_token("r1", "newer", expiry).await.unwrap();
        assert!(matches!(again, ResetConsumption::Unknown));
    }

    #[tokio::test]
    async fn test_role_counts_follow_assignment_and_removal() {
        let store = MemoryStore::new();
        for name in RoleName::ALL {
            store.ensure_role(name).await.unwrap();
        }
        let user = store.insert_user(new_user("a@x.com", "v")).await.unwrap();

        store.assign_role(user.id, RoleName::Client).await.unwrap();
        store.assign_role(user.id, RoleName::Staff).await.unwrap();
        let client = store.find_role(RoleName::Client).await.unwrap().unwrap();
        let staff = store.find_role(RoleName::Staff).await.unwrap().unwrap();
        assert_eq!(client.count, 0);
        assert_eq!(staff.count, 1);

        assert!(store.delete_user(user.id).await.unwrap());
        let staff = store.find_role(RoleName::Staff).await.unwrap().unwrap();
        assert_eq!(staff.count, 0);
    }

    #[tokio::test]
    async fn test_delete_company_detaches_members_and_drops_links() {
        let store = MemoryStore::new();
        let company = store
            .insert_company(NewCompany {
                name: "Acme".into(),
                location: "Paris".into(),
                website: "https://acme.io".into(),
                wallet_address: format!("0x{}", "a".repeat(40)),
                slack: None,
                reward_vault: None,
            })
            .await
            .unwrap();
        let user = store.insert_user(new_user("a@x.com", "v")).await.unwrap();
        store.assign_company(user.id, company.id).await.unwrap();
        let link = store
            .insert_private_link(NewPrivateLink {
                company_id: company.id,
                receiver_address: "hash".into(),
                fund_validator_tx_data: vec![],
            })
            .await
            .unwrap();

        assert!(store.delete_company(company.id).await.unwrap());
        let user = store.find_user_by_id(user.id).await.unwrap().unwrap();
        assert_eq!(user.company_id, None);
        assert!(store.find_private_link(link.id).await.unwrap().is_none());
    }
}
