//! Administrative operations on users and private links.
//!
//! The acting user is always reloaded from the store so a role change takes
//! effect immediately, even for credentials issued before it.

use std::collections::HashMap;
use std::sync::Arc;

use super::authz::{authorize, Action, Actor, Subject};
use super::clock::Clock;
use super::error::ServiceError;
use super::jwt::{JwtService, LinkClaims};
use super::metrics::record_denial;
use super::session::Identity;
use super::store::CredentialStore;
use crate::models::{FundValidatorTxData, NewPrivateLink, PrivateLinkData, User, UserResponse};
use crate::utils::{hash_password_blocking, non_blank, Password};

#[derive(Clone)]
pub struct ManagementService {
    store: Arc<dyn CredentialStore>,
    jwt: JwtService,
    clock: Arc<dyn Clock>,
}

fn check(actor: &Actor, action: Action<'_>) -> Result<(), ServiceError> {
    authorize(actor, action).into_result().map_err(|denial| {
        record_denial(action.name());
        tracing::info!(actor_id = %actor.id, action = action.name(), reason = denial.message(), "Action denied");
        ServiceError::from(denial)
    })
}

impl ManagementService {
    pub fn new(store: Arc<dyn CredentialStore>, jwt: JwtService, clock: Arc<dyn Clock>) -> Self {
        Self { store, jwt, clock }
    }

    /// Current role and company of the authenticated user.
    pub async fn load_actor(&self, identity: &Identity) -> Result<Actor, ServiceError> {
        let user = self
            .store
            .find_user_by_id(identity.id)
            .await?
            .ok_or(ServiceError::NotAuthenticated)?;
        Ok(Actor {
            id: user.id,
            role: user.role,
            company_id: user.company_id,
        })
    }

    pub async fn assign_role(&self, identity: &Identity, role_id: i64, user_id: i64) -> Result<(), ServiceError> {
        let role = self.store.find_role_by_id(role_id).await?;
        let target = self.store.find_user_by_id(user_id).await?;
        let (Some(role), Some(target)) = (role, target) else {
            return Err(ServiceError::NotFound("Role or user not found."));
        };

        let actor = self.load_actor(identity).await?;
        let subject = Subject {
            id: target.id,
            role: target.role,
        };
        check(
            &actor,
            Action::AssignRole {
                role: role.name,
                target: &subject,
            },
        )?;

        self.store.assign_role(target.id, role.name).await?;
        tracing::info!(actor_id = %actor.id, user_id = %target.id, role = %role.name, "Role assigned");
        Ok(())
    }

    pub async fn assign_company(&self, identity: &Identity, user_id: i64, company_id: i64) -> Result<(), ServiceError> {
        let target = self
            .store
            .find_user_by_id(user_id)
            .await?
            .ok_or(ServiceError::NotFound("User not found."))?;
        let company = self
            .store
            .find_company(company_id)
            .await?
            .ok_or(ServiceError::NotFound("Company not found."))?;

        let actor = self.load_actor(identity).await?;
        let subject = Subject {
            id: target.id,
            role: target.role,
        };
        check(&actor, Action::AssignCompany { target: &subject })?;

        self.store.assign_company(target.id, company.id).await?;
        tracing::info!(actor_id = %actor.id, user_id = %target.id, company_id = %company.id, "Company assigned");
        Ok(())
    }

    pub async fn remove_user(&self, identity: &Identity, user_id: i64) -> Result<(), ServiceError> {
        let target = self
            .store
            .find_user_by_id(user_id)
            .await?
            .ok_or(ServiceError::NotFound("User not found."))?;

        let actor = self.load_actor(identity).await?;
        let subject = Subject {
            id: target.id,
            role: target.role,
        };
        check(&actor, Action::RemoveUser { target: &subject })?;

        self.store.delete_user(target.id).await?;
        tracing::info!(actor_id = %actor.id, user_id = %target.id, "User removed");
        Ok(())
    }

    /// Store the validator payload for the company owning `client` (a wallet
    /// address) and return a link token naming it.
    pub async fn generate_link(
        &self,
        validators: Option<Vec<FundValidatorTxData>>,
        client: Option<String>,
    ) -> Result<String, ServiceError> {
        let (Some(validators), Some(client)) = (validators, client.filter(|c| !c.is_empty())) else {
            return Err(ServiceError::BadRequest("Both validators and client fields are required."));
        };

        let company = self
            .store
            .find_company_by_wallet(&client)
            .await?
            .ok_or(ServiceError::BadRequest("Company with the provided wallet address not found."))?;

        let receiver_address = hash_password_blocking(Password::new(client)).await?.into_string();
        let link = self
            .store
            .insert_private_link(NewPrivateLink {
                company_id: company.id,
                receiver_address,
                fund_validator_tx_data: validators,
            })
            .await?;

        let token = self.jwt.encode_link(&LinkClaims {
            link_id: link.id,
            iat: self.clock.now().timestamp(),
        })?;

        tracing::info!(link_id = %link.id, company_id = %company.id, "Private link generated");
        Ok(token)
    }

    /// Existence is checked before authentication.
    pub async fn delete_private_link(&self, identity: Option<&Identity>, id: i64) -> Result<(), ServiceError> {
        if self.store.find_private_link(id).await?.is_none() {
            return Err(ServiceError::NotFound("PrivateLink not found."));
        }
        let identity = identity.ok_or(ServiceError::NotAuthenticated)?;

        let actor = self.load_actor(identity).await?;
        check(&actor, Action::DeletePrivateLink)?;

        self.store.delete_private_link(id).await?;
        tracing::info!(actor_id = %actor.id, link_id = %id, "Private link deleted");
        Ok(())
    }

    pub async fn get_link(&self, token: Option<&str>) -> Result<PrivateLinkData, ServiceError> {
        let token = non_blank(token).ok_or(ServiceError::TokenRequired)?;
        let claims = self.jwt.decode_link(token).map_err(|e| {
            tracing::debug!(error = %e, "Rejected link token");
            ServiceError::InvalidLinkToken
        })?;

        let link = self
            .store
            .find_private_link(claims.link_id)
            .await?
            .ok_or(ServiceError::NotFound("Link not found."))?;
        Ok(link.into())
    }

    /// Every user with secrets stripped, each with their company attached.
    pub async fn list_users(&self) -> Result<Vec<UserResponse>, ServiceError> {
        let companies: HashMap<i64, _> = self
            .store
            .list_companies()
            .await?
            .into_iter()
            .map(|c| (c.id, c))
            .collect();

        let users = self.store.list_users().await?;
        Ok(users
            .iter()
            .map(|u| u.sanitized(u.company_id.and_then(|id| companies.get(&id).cloned())))
            .collect())
    }

    pub async fn current_user(&self, identity: Option<&Identity>) -> Result<UserResponse, ServiceError> {
        let identity = identity.ok_or(ServiceError::NotAuthenticated)?;
        let user = self
            .store
            .find_user_by_id(identity.id)
            .await?
            .ok_or(ServiceError::NotFound("User not found"))?;
        self.profile(&user).await
    }

    async fn profile(&self, user: &User) -> Result<UserResponse, ServiceError> {
        let company = match user.company_id {
            Some(id) => self.store.find_company(id).await?,
            None => None,
        };
        Ok(user.sanitized(company))
    }
}
