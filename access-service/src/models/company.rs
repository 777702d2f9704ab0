//! Company model - client organisations, one of which is the default (home) company.

use serde::Serialize;
use sqlx::FromRow;
use utoipa::ToSchema;

/// Company entity.
#[derive(Debug, Clone, PartialEq, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Company {
    pub id: i64,
    pub name: String,
    pub location: String,
    pub website: String,
    pub wallet_address: String,
    pub slack: Option<String>,
    /// EVM address of the reward vault.
    pub reward_vault: Option<String>,
}

impl Company {
    pub fn is_named(&self, name: &str) -> bool {
        same_company_name(&self.name, name)
    }
}

/// Fields needed to insert a company.
#[derive(Debug, Clone)]
pub struct NewCompany {
    pub name: String,
    pub location: String,
    pub website: String,
    pub wallet_address: String,
    pub slack: Option<String>,
    pub reward_vault: Option<String>,
}

/// Id and name only, for pickers.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CompanyName {
    pub id: i64,
    pub name: String,
}

impl From<&Company> for CompanyName {
    fn from(c: &Company) -> Self {
        Self {
            id: c.id,
            name: c.name.clone(),
        }
    }
}

/// Company names are unique ignoring case and surrounding whitespace.
pub fn same_company_name(a: &str, b: &str) -> bool {
    a.trim().to_lowercase() == b.trim().to_lowercase()
}
