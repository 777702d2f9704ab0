use service_core::{
    axum::{
        extract::{Path, State},
        http::StatusCode,
        response::IntoResponse,
        Json,
    },
    error::AppError,
};

use crate::{
    dtos::{
        management::{
            AssignCompanyRequest, AssignRoleRequest, CompanyRequest, CompanyResponse, GenerateLinkRequest,
            LinkResponse, RewardVaultRequest, RewardVaultResponse,
        },
        ErrorResponse, MessageResponse,
    },
    middleware::{AuthUser, MaybeUser},
    utils::ValidatedJson,
    AppState,
};

/// Assign a role to a user
#[utoipa::path(
    post,
    path = "/management/assign-roles",
    request_body = AssignRoleRequest,
    responses(
        (status = 200, description = "Role assigned", body = MessageResponse),
        (status = 403, description = "Not permitted for this actor, role or target", body = ErrorResponse),
        (status = 404, description = "Role or user not found", body = ErrorResponse)
    ),
    tag = "Management",
    security(("bearer_auth" = []))
)]
pub async fn assign_role(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    ValidatedJson(req): ValidatedJson<AssignRoleRequest>,
) -> Result<impl IntoResponse, AppError> {
    state
        .management
        .assign_role(&identity, req.role_to_assign_id, req.user_to_assign_id)
        .await?;
    Ok(Json(MessageResponse::new("Role assigned successfully.")))
}

/// Move a user to a company
#[utoipa::path(
    post,
    path = "/management/assignCompany",
    request_body = AssignCompanyRequest,
    responses(
        (status = 200, description = "Company assigned", body = MessageResponse),
        (status = 403, description = "Target is an ADMIN, or STAFF acting on STAFF", body = ErrorResponse),
        (status = 404, description = "User or company not found, or user has no role", body = ErrorResponse)
    ),
    tag = "Management",
    security(("bearer_auth" = []))
)]
pub async fn assign_company(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    ValidatedJson(req): ValidatedJson<AssignCompanyRequest>,
) -> Result<impl IntoResponse, AppError> {
    state
        .management
        .assign_company(&identity, req.user_to_assign_id, req.company_id)
        .await?;
    Ok(Json(MessageResponse::new("Company assigned successfully.")))
}

/// Create a company
#[utoipa::path(
    post,
    path = "/management/add-company",
    request_body = CompanyRequest,
    responses(
        (status = 201, description = "Company added", body = CompanyResponse),
        (status = 400, description = "Missing fields or invalid address", body = ErrorResponse),
        (status = 409, description = "Company already exists", body = ErrorResponse)
    ),
    tag = "Management",
    security(("bearer_auth" = []))
)]
pub async fn add_company(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<CompanyRequest>,
) -> Result<impl IntoResponse, AppError> {
    let company = state.companies.add_company(req.into()).await?;
    Ok((
        StatusCode::CREATED,
        Json(CompanyResponse {
            message: "Company added successfully.".to_string(),
            company,
        }),
    ))
}

/// Update the supplied fields of a company
#[utoipa::path(
    put,
    path = "/management/edit-company/{id}",
    params(("id" = i64, Path, description = "Company id")),
    request_body = CompanyRequest,
    responses(
        (status = 200, description = "Company edited", body = CompanyResponse),
        (status = 400, description = "Invalid address, or renaming the default company", body = ErrorResponse),
        (status = 404, description = "Company not found", body = ErrorResponse),
        (status = 409, description = "Name taken by another company", body = ErrorResponse)
    ),
    tag = "Management",
    security(("bearer_auth" = []))
)]
pub async fn edit_company(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    ValidatedJson(req): ValidatedJson<CompanyRequest>,
) -> Result<impl IntoResponse, AppError> {
    let company = state.companies.edit_company(id, req.into()).await?;
    Ok(Json(CompanyResponse {
        message: "Company edited successfully.".to_string(),
        company,
    }))
}

/// Delete a company, detaching its members and dropping its links
#[utoipa::path(
    delete,
    path = "/management/remove-company/{id}",
    params(("id" = i64, Path, description = "Company id")),
    responses(
        (status = 200, description = "Company removed", body = MessageResponse),
        (status = 400, description = "Default company", body = ErrorResponse),
        (status = 404, description = "Company not found", body = ErrorResponse)
    ),
    tag = "Management",
    security(("bearer_auth" = []))
)]
pub async fn remove_company(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let actor = state.management.load_actor(&identity).await?;
    state.companies.remove_company(&actor, id).await?;
    Ok(Json(MessageResponse::new("Company removed successfully.")))
}

/// Set a company's reward vault address
#[utoipa::path(
    post,
    path = "/management/reward-vault",
    request_body = RewardVaultRequest,
    responses(
        (status = 200, description = "Reward vault updated", body = RewardVaultResponse),
        (status = 404, description = "Company not found", body = ErrorResponse)
    ),
    tag = "Management",
    security(("bearer_auth" = []))
)]
pub async fn update_reward_vault(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<RewardVaultRequest>,
) -> Result<impl IntoResponse, AppError> {
    let company = state
        .companies
        .update_reward_vault(req.company_id, req.reward_vault)
        .await?;
    Ok(Json(RewardVaultResponse {
        message: "Reward vault updated successfully.".to_string(),
        updated_company: company,
    }))
}

/// Store validator deposit data for a client company and return its link token
#[utoipa::path(
    post,
    path = "/management/generate-link",
    request_body = GenerateLinkRequest,
    responses(
        (status = 201, description = "Link generated", body = LinkResponse),
        (status = 400, description = "Missing fields or unknown wallet", body = ErrorResponse)
    ),
    tag = "Management",
    security(("bearer_auth" = []))
)]
pub async fn generate_link(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<GenerateLinkRequest>,
) -> Result<impl IntoResponse, AppError> {
    let link_token = state.management.generate_link(req.validators, req.client).await?;
    Ok((
        StatusCode::CREATED,
        Json(LinkResponse {
            message: "Link generated successfully.".to_string(),
            link_token,
        }),
    ))
}

/// Delete a private link (CLIENT only)
#[utoipa::path(
    delete,
    path = "/management/delete-privatelink/{id}",
    params(("id" = i64, Path, description = "Private link id")),
    responses(
        (status = 200, description = "Link deleted", body = MessageResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 403, description = "Not a CLIENT", body = ErrorResponse),
        (status = 404, description = "Link not found", body = ErrorResponse)
    ),
    tag = "Management",
    security(("bearer_auth" = []))
)]
pub async fn delete_private_link(
    State(state): State<AppState>,
    MaybeUser(identity): MaybeUser,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    state.management.delete_private_link(identity.as_ref(), id).await?;
    Ok(Json(MessageResponse::new("PrivateLink deleted successfully.")))
}

/// Delete a user account
#[utoipa::path(
    delete,
    path = "/management/remove-user/{id}",
    params(("id" = i64, Path, description = "User id")),
    responses(
        (status = 200, description = "User removed", body = MessageResponse),
        (status = 403, description = "Target protected from this actor", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse)
    ),
    tag = "Management",
    security(("bearer_auth" = []))
)]
pub async fn remove_user(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    state.management.remove_user(&identity, id).await?;
    Ok(Json(MessageResponse::new("User removed successfully.")))
}
