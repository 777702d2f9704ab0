//! Startup seeding: roles, the default company and the bootstrap administrator.

use crate::config::AccessConfig;
use crate::models::{Company, NewCompany, RoleName};
use crate::utils::{hash_password_blocking, Password};

use super::error::ServiceError;
use super::store::{AdminProfile, CredentialStore};

/// Idempotent. Safe to run on every start.
pub async fn seed(store: &dyn CredentialStore, config: &AccessConfig) -> Result<(), ServiceError> {
    if config.reset_data_on_start {
        tracing::warn!("RESET_DATA_ON_START is set; wiping all records");
        store.wipe().await?;
    }

    for role in RoleName::ALL {
        store.ensure_role(role).await?;
    }

    let company = ensure_default_company(store, config).await?;
    reconcile_admin(store, config, company.id).await?;

    tracing::info!(default_company = %company.name, "Seeding complete");
    Ok(())
}

async fn ensure_default_company(store: &dyn CredentialStore, config: &AccessConfig) -> Result<Company, ServiceError> {
    let defaults = &config.default_company;
    if let Some(existing) = store.find_company_by_name(&defaults.name).await? {
        return Ok(existing);
    }

    let company = store
        .insert_company(NewCompany {
            name: defaults.name.trim().to_string(),
            location: defaults.location.clone(),
            website: defaults.website.clone(),
            wallet_address: defaults.wallet_address.clone(),
            slack: None,
            reward_vault: Some("0x0".to_string()),
        })
        .await?;
    tracing::info!(company_id = %company.id, "Default company created");
    Ok(company)
}

async fn reconcile_admin(store: &dyn CredentialStore, config: &AccessConfig, company_id: i64) -> Result<(), ServiceError> {
    let admins = store.find_users_with_role(RoleName::Admin).await?;
    store.set_role_count(RoleName::Admin, admins.len() as i64).await?;

    if admins.len() > 1 {
        tracing::info!(count = admins.len(), "Several administrators exist; leaving them unchanged");
        return Ok(());
    }

    let password_hash = hash_password_blocking(Password::new(config.admin.password.clone()))
        .await?
        .into_string();
    let profile = AdminProfile {
        email: config.admin.email.clone(),
        name: config.admin.name.clone(),
        password_hash,
        profile_picture_path: config.admin.profile_picture_path.clone(),
        company_id,
    };

    match admins.first() {
        Some(admin) => {
            store.update_admin(admin.id, profile).await?;
            tracing::info!(user_id = %admin.id, "Administrator refreshed from configuration");
        }
        None => {
            let admin = store.insert_admin(profile).await?;
            store.set_role_count(RoleName::Admin, 1).await?;
            tracing::info!(user_id = %admin.id, "Administrator created");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewUser;
    use crate::services::memory::MemoryStore;
    use crate::utils::{verify_password, PasswordHashString};

    fn config() -> AccessConfig {
        AccessConfig::for_tests("seed-secret")
    }

    #[tokio::test]
    async fn test_seed_is_idempotent() {
        let store = MemoryStore::new();
        let config = config();
        seed(&store, &config).await.unwrap();
        seed(&store, &config).await.unwrap();

        assert_eq!(store.list_roles().await.unwrap().len(), 3);
        assert_eq!(store.list_companies().await.unwrap().len(), 1);

        let admins = store.find_users_with_role(RoleName::Admin).await.unwrap();
        assert_eq!(admins.len(), 1);
        assert!(admins[0].is_verified);
        let role = store.find_role(RoleName::Admin).await.unwrap().unwrap();
        assert_eq!(role.count, 1);
    }

    #[tokio::test]
    async fn test_single_admin_refreshed_from_config() {
        let store = MemoryStore::new();
        let mut config = config();
        seed(&store, &config).await.unwrap();

        config.admin.email = "root@example.com".to_string();
        config.admin.password = "N3w!Password".to_string();
        seed(&store, &config).await.unwrap();

        let admins = store.find_users_with_role(RoleName::Admin).await.unwrap();
        assert_eq!(admins.len(), 1);
        assert_eq!(admins[0].email, "root@example.com");
        assert!(verify_password(
            &Password::new("N3w!Password".to_string()),
            &PasswordHashString::new(admins[0].password_hash.clone())
        )
        .is_ok());
    }

    #[tokio::test]
    async fn test_several_admins_left_alone() {
        let store = MemoryStore::new();
        let config = config();
        for email in ["a@x.com", "b@x.com"] {
            let mut user = NewUser::signup("A".into(), email.into(), "hash".into(), "t".into());
            user.role = Some(RoleName::Admin);
            store.insert_user(user).await.unwrap();
        }

        seed(&store, &config).await.unwrap();
        let admins = store.find_users_with_role(RoleName::Admin).await.unwrap();
        assert_eq!(admins.len(), 2);
        assert!(admins.iter().all(|a| a.email != config.admin.email));
        assert_eq!(store.find_role(RoleName::Admin).await.unwrap().unwrap().count, 2);
    }

    #[tokio::test]
    async fn test_default_company_matched_case_insensitively() {
        let store = MemoryStore::new();
        let mut config = config();
        seed(&store, &config).await.unwrap();

        config.default_company.name = "  globalstake ".to_string();
        seed(&store, &config).await.unwrap();
        assert_eq!(store.list_companies().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_reset_wipes_before_seeding() {
        let store = MemoryStore::new();
        let mut config = config();
        store
            .insert_user(NewUser::signup("X".into(), "x@x.com".into(), "h".into(), "t".into()))
            .await
            .unwrap();

        config.reset_data_on_start = true;
        seed(&store, &config).await.unwrap();
        assert!(store.find_user_by_email("x@x.com").await.unwrap().is_none());
        assert_eq!(store.list_users().await.unwrap().len(), 1);
    }
}
