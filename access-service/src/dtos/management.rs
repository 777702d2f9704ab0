use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::models::{Company, FundValidatorTxData};
use crate::services::CompanyInput;

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AssignRoleRequest {
    #[schema(example = 3)]
    pub role_to_assign_id: i64,
    #[schema(example = 42)]
    pub user_to_assign_id: i64,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AssignCompanyRequest {
    pub user_to_assign_id: i64,
    pub company_id: i64,
}

/// Body of add-company and edit-company. Edit ignores absent or empty fields.
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CompanyRequest {
    #[schema(example = "Acme Staking")]
    pub name: Option<String>,
    pub location: Option<String>,
    pub website: Option<String>,
    #[schema(example = "0x52908400098527886E0F7030069857D2E4169EE7")]
    pub wallet_address: Option<String>,
    pub slack: Option<String>,
    pub reward_vault: Option<String>,
}

impl From<CompanyRequest> for CompanyInput {
    fn from(req: CompanyRequest) -> Self {
        CompanyInput {
            name: req.name,
            location: req.location,
            website: req.website,
            wallet_address: req.wallet_address,
            slack: req.slack,
            reward_vault: req.reward_vault,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CompanyResponse {
    pub message: String,
    pub company: Company,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RewardVaultRequest {
    pub company_id: i64,
    pub reward_vault: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RewardVaultResponse {
    pub message: String,
    pub updated_company: Company,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct GenerateLinkRequest {
    pub validators: Option<Vec<FundValidatorTxData>>,
    /// Wallet address of the receiving company.
    pub client: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LinkResponse {
    #[schema(example = "Link generated successfully.")]
    pub message: String,
    pub link_token: String,
}
