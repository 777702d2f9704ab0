use service_core::{
    axum::{
        extract::{Path, State},
        http::HeaderMap,
        response::IntoResponse,
        Json,
    },
    error::AppError,
};

use crate::{
    dtos::{
        info::{CompanyNamesResponse, LinkDataResponse},
        ErrorResponse,
    },
    middleware::{credential_from, MaybeUser},
    models::{Company, UserResponse},
    services::ServiceError,
    AppState,
};

/// Every client company (the default company is omitted)
#[utoipa::path(
    get,
    path = "/infos/companies/details",
    responses(
        (status = 200, description = "Client companies", body = [Company]),
        (status = 403, description = "Not ADMIN or STAFF", body = ErrorResponse)
    ),
    tag = "Info",
    security(("bearer_auth" = []))
)]
pub async fn company_details(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.companies.client_companies().await?))
}

/// Id and name of every company
#[utoipa::path(
    get,
    path = "/infos/companies/names",
    responses(
        (status = 200, description = "Company names", body = CompanyNamesResponse),
        (status = 403, description = "Not ADMIN or STAFF", body = ErrorResponse)
    ),
    tag = "Info",
    security(("bearer_auth" = []))
)]
pub async fn company_names(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let companies = state.companies.company_names().await?;
    Ok(Json(CompanyNamesResponse { companies }))
}

/// Every user with role and company, secrets stripped
#[utoipa::path(
    get,
    path = "/infos/users",
    responses(
        (status = 200, description = "Users", body = [UserResponse]),
        (status = 403, description = "Not ADMIN or STAFF", body = ErrorResponse)
    ),
    tag = "Info",
    security(("bearer_auth" = []))
)]
pub async fn users(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.management.list_users().await?))
}

/// Profile of the logged-in user
#[utoipa::path(
    get,
    path = "/infos/getCurrentUser",
    responses(
        (status = 200, description = "Current user", body = UserResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse)
    ),
    tag = "Info",
    security(("bearer_auth" = []))
)]
pub async fn current_user(
    State(state): State<AppState>,
    MaybeUser(identity): MaybeUser,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.management.current_user(identity.as_ref()).await?))
}

/// One company, visible to ADMIN, STAFF and its own CLIENTs
#[utoipa::path(
    get,
    path = "/infos/company/{id}",
    params(("id" = i64, Path, description = "Company id")),
    responses(
        (status = 200, description = "Company", body = Company),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 403, description = "No role, or CLIENT of another company", body = ErrorResponse),
        (status = 404, description = "Company not found", body = ErrorResponse)
    ),
    tag = "Info",
    security(("bearer_auth" = []))
)]
pub async fn company(
    State(state): State<AppState>,
    MaybeUser(identity): MaybeUser,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let identity = identity.ok_or(ServiceError::Unauthorized)?;
    let actor = state.management.load_actor(&identity).await?;
    Ok(Json(state.companies.view_company(&actor, id).await?))
}

/// Validator payload behind a link token (bearer or cookie)
#[utoipa::path(
    get,
    path = "/infos/getLink",
    responses(
        (status = 200, description = "Link data", body = LinkDataResponse),
        (status = 400, description = "Missing or invalid link token", body = ErrorResponse),
        (status = 404, description = "Link not found", body = ErrorResponse)
    ),
    tag = "Info",
    security(("bearer_auth" = []))
)]
pub async fn link(State(state): State<AppState>, headers: HeaderMap) -> Result<impl IntoResponse, AppError> {
    let token = credential_from(&headers);
    let link_data = state.management.get_link(token.as_deref()).await?;
    Ok(Json(LinkDataResponse {
        message: "Link data retrieved successfully".to_string(),
        link_data,
    }))
}
