//! PrivateLink model - validator funding payloads handed to a client company.

use serde::{Deserialize, Serialize};
use sqlx::{types::Json, FromRow};
use utoipa::ToSchema;

/// One validator deposit record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FundValidatorTxData {
    pub pubkey: String,
    pub withdrawalcredentials: String,
    pub signature: String,
    pub deposit_data_root: String,
}

/// PrivateLink entity. Belongs to exactly one company.
///
/// `used` is stored but no operation reads or sets it yet.
#[derive(Debug, Clone)]
pub struct PrivateLink {
    pub id: i64,
    pub company_id: i64,
    pub receiver_address: String,
    pub used: bool,
    pub fund_validator_tx_data: Vec<FundValidatorTxData>,
}

#[derive(Debug, Clone)]
pub struct NewPrivateLink {
    pub company_id: i64,
    pub receiver_address: String,
    pub fund_validator_tx_data: Vec<FundValidatorTxData>,
}

#[derive(Debug, Clone, FromRow)]
pub struct PrivateLinkRow {
    pub id: i64,
    pub company_id: i64,
    pub receiver_address: String,
    pub used: bool,
    pub fund_validator_tx_data: Json<Vec<FundValidatorTxData>>,
}

impl From<PrivateLinkRow> for PrivateLink {
    fn from(row: PrivateLinkRow) -> Self {
        Self {
            id: row.id,
            company_id: row.company_id,
            receiver_address: row.receiver_address,
            used: row.used,
            fund_validator_tx_data: row.fund_validator_tx_data.0,
        }
    }
}

/// Link payload as returned to the link holder.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PrivateLinkData {
    pub id: i64,
    pub receiver_address: String,
    pub fund_validator_tx_data: Vec<FundValidatorTxData>,
    pub client_id: Option<i64>,
}

impl From<PrivateLink> for PrivateLinkData {
    fn from(link: PrivateLink) -> Self {
        Self {
            id: link.id,
            receiver_address: link.receiver_address,
            fund_validator_tx_data: link.fund_validator_tx_data,
            client_id: Some(link.company_id),
        }
    }
}
