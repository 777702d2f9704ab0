use serde::Serialize;
use utoipa::ToSchema;

use crate::models::{CompanyName, PrivateLinkData};

#[derive(Debug, Serialize, ToSchema)]
pub struct CompanyNamesResponse {
    pub companies: Vec<CompanyName>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LinkDataResponse {
    #[schema(example = "Link data retrieved successfully")]
    pub message: String,
    pub link_data: PrivateLinkData,
}
