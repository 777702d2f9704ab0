//! Company records: creation, edits, removal and the role-gated views.

use std::sync::Arc;

use super::authz::{authorize, Action, Actor};
use super::error::ServiceError;
use super::metrics::record_denial;
use super::store::{CompanyChanges, CredentialStore};
use crate::models::{same_company_name, Company, CompanyName, NewCompany};
use crate::utils::{is_valid_eth_address, non_blank};

const DEFAULT_REWARD_VAULT: &str = "0x0";

/// Company fields as submitted. Blank values count as absent.
#[derive(Debug, Clone, Default)]
pub struct CompanyInput {
    pub name: Option<String>,
    pub location: Option<String>,
    pub website: Option<String>,
    pub wallet_address: Option<String>,
    pub slack: Option<String>,
    pub reward_vault: Option<String>,
}

#[derive(Clone)]
pub struct CompanyService {
    store: Arc<dyn CredentialStore>,
    default_company_name: String,
}

fn check_addresses(wallet: Option<&str>, reward_vault: Option<&str>) -> Result<(), ServiceError> {
    let invalid = |addr: Option<&str>| addr.is_some_and(|a| !is_valid_eth_address(a));
    if invalid(wallet) || invalid(reward_vault) {
        return Err(ServiceError::BadRequest("Invalid Ethereum wallet address."));
    }
    Ok(())
}

impl CompanyService {
    pub fn new(store: Arc<dyn CredentialStore>, default_company_name: String) -> Self {
        Self {
            store,
            default_company_name,
        }
    }

    pub fn is_default(&self, company: &Company) -> bool {
        company.is_named(&self.default_company_name)
    }

    pub async fn add_company(&self, input: CompanyInput) -> Result<Company, ServiceError> {
        let present = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.is_empty());
        if !(present(&input.name)
            && present(&input.location)
            && present(&input.website)
            && present(&input.wallet_address))
        {
            return Err(ServiceError::BadRequest(
                "Name, location, website, and walletAddress are required.",
            ));
        }

        let name = non_blank(input.name.as_deref())
            .ok_or(ServiceError::BadRequest("Name cannot be empty."))?
            .to_string();
        let wallet_address = input.wallet_address.unwrap_or_default().trim().to_string();
        let reward_vault = non_blank(input.reward_vault.as_deref()).map(str::to_string);
        check_addresses(Some(&wallet_address), reward_vault.as_deref())?;

        if self.store.find_company_by_name(&name).await?.is_some() {
            return Err(ServiceError::Conflict("Company already exists."));
        }

        let company = self
            .store
            .insert_company(NewCompany {
                name,
                location: input.location.unwrap_or_default(),
                website: input.website.unwrap_or_default(),
                wallet_address,
                slack: non_blank(input.slack.as_deref()).map(str::to_string),
                reward_vault: Some(reward_vault.unwrap_or_else(|| DEFAULT_REWARD_VAULT.to_string())),
            })
            .await?;

        tracing::info!(company_id = %company.id, name = %company.name, "Company added");
        Ok(company)
    }

    /// Overwrite only the fields that were supplied.
    pub async fn edit_company(&self, id: i64, input: CompanyInput) -> Result<Company, ServiceError> {
        let current = self
            .store
            .find_company(id)
            .await?
            .ok_or(ServiceError::NotFound("Company not found."))?;

        let wallet_address = non_blank(input.wallet_address.as_deref()).map(str::to_string);
        let reward_vault = non_blank(input.reward_vault.as_deref()).map(str::to_string);
        check_addresses(wallet_address.as_deref(), reward_vault.as_deref())?;

        let name = non_blank(input.name.as_deref()).map(str::to_string);
        if let Some(name) = &name {
            if let Some(other) = self.store.find_company_by_name(name).await? {
                if other.id != current.id {
                    return Err(ServiceError::Conflict("Company already exists."));
                }
            }
            if self.is_default(&current) && !same_company_name(name, &current.name) {
                return Err(ServiceError::BadRequest("Default company cannot be renamed."));
            }
        }

        let changes = CompanyChanges {
            name,
            location: non_blank(input.location.as_deref()).map(str::to_string),
            website: non_blank(input.website.as_deref()).map(str::to_string),
            wallet_address,
            slack: non_blank(input.slack.as_deref()).map(str::to_string),
            reward_vault,
        };

        let company = self
            .store
            .update_company(id, changes)
            .await?
            .ok_or(ServiceError::NotFound("Company not found."))?;

        tracing::info!(company_id = %company.id, "Company edited");
        Ok(company)
    }

    pub async fn remove_company(&self, actor: &Actor, id: i64) -> Result<(), ServiceError> {
        let company = self
            .store
            .find_company(id)
            .await?
            .ok_or(ServiceError::NotFound("Company not found."))?;

        let action = Action::RemoveCompany {
            is_default: self.is_default(&company),
        };
        authorize(actor, action).into_result().inspect_err(|_| record_denial(action.name()))?;

        self.store.delete_company(id).await?;
        tracing::info!(company_id = %id, actor_id = %actor.id, "Company removed");
        Ok(())
    }

    /// No address validation here: the vault value is stored as given.
    pub async fn update_reward_vault(&self, company_id: i64, reward_vault: String) -> Result<Company, ServiceError> {
        let changes = CompanyChanges {
            reward_vault: Some(reward_vault),
            ..CompanyChanges::default()
        };
        let company = self
            .store
            .update_company(company_id, changes)
            .await?
            .ok_or(ServiceError::NotFound("Company not found."))?;

        tracing::info!(company_id = %company.id, "Reward vault updated");
        Ok(company)
    }

    /// Every company except the default one.
    pub async fn client_companies(&self) -> Result<Vec<Company>, ServiceError> {
        let companies = self.store.list_companies().await?;
        Ok(companies.into_iter().filter(|c| !self.is_default(c)).collect())
    }

    pub async fn company_names(&self) -> Result<Vec<CompanyName>, ServiceError> {
        let companies = self.store.list_companies().await?;
        Ok(companies.iter().map(CompanyName::from).collect())
    }

    pub async fn view_company(&self, actor: &Actor, id: i64) -> Result<Company, ServiceError> {
        let action = Action::ViewCompany { company_id: id };
        authorize(actor, action).into_result().inspect_err(|_| record_denial(action.name()))?;

        self.store
            .find_company(id)
            .await?
            .ok_or(ServiceError::NotFound("Company not found."))
    }
}
