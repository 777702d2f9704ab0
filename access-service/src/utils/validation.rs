use axum::{
    extract::{FromRequest, Request},
    Json,
};
use serde::de::DeserializeOwned;
use service_core::error::AppError;
use validator::Validate;

/// JSON body that must deserialize and pass `validator` rules. Both failures
/// are reported as 400.
pub struct ValidatedJson<T>(pub T);

#[axum::async_trait]
impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate + 'static,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await.map_err(|e| {
            tracing::debug!(error = %e, "Rejected request body");
            AppError::BadRequest("Invalid request body.".to_string())
        })?;

        value.validate()?;

        Ok(ValidatedJson(value))
    }
}

/// `0x`-prefixed (optional) 40 hex digit address.
pub fn is_valid_eth_address(address: &str) -> bool {
    let hex = address.strip_prefix("0x").unwrap_or(address);
    hex.len() == 40 && hex.chars().all(|c| c.is_ascii_hexdigit())
}

/// Trimmed value, or `None` when blank.
pub fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
