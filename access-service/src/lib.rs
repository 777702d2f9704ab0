pub mod config;
pub mod db;
pub mod dtos;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod utils;

use service_core::axum::{
    http::{header, HeaderValue, Method},
    middleware::{from_fn, from_fn_with_state},
    routing::{delete, get, post, put},
    Json, Router,
};
use service_core::middleware::{
    metrics::metrics_middleware, security_headers::security_headers_middleware,
    tracing::request_id_middleware,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::{openapi::security::SecurityScheme, Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

use crate::config::{AccessConfig, SwaggerMode};
use crate::services::{
    AuthService, Clock, CompanyService, CredentialStore, EmailProvider, JwtService, ManagementService,
    SecurityTokenIssuer, ServiceError, SessionAuthority,
};
use service_core::error::AppError;
use std::sync::Arc;

#[derive(OpenApi)]
#[openapi(
    paths(
        health_check,
        handlers::auth::registration::signup,
        handlers::auth::registration::verify_email,
        handlers::auth::session::login,
        handlers::auth::session::logout,
        handlers::auth::password::forgot_password,
        handlers::auth::password::reset_password,
        handlers::management::assign_role,
        handlers::management::assign_company,
        handlers::management::add_company,
        handlers::management::edit_company,
        handlers::management::remove_company,
        handlers::management::update_reward_vault,
        handlers::management::generate_link,
        handlers::management::delete_private_link,
        handlers::management::remove_user,
        handlers::info::company_details,
        handlers::info::company_names,
        handlers::info::users,
        handlers::info::current_user,
        handlers::info::company,
        handlers::info::link,
    ),
    components(
        schemas(
            dtos::ErrorResponse,
            dtos::MessageResponse,
            dtos::auth::SignupRequest,
            dtos::auth::LoginRequest,
            dtos::auth::LoginResponse,
            dtos::auth::ForgotPasswordRequest,
            dtos::auth::ResetPasswordRequest,
            dtos::management::AssignRoleRequest,
            dtos::management::AssignCompanyRequest,
            dtos::management::CompanyRequest,
            dtos::management::CompanyResponse,
            dtos::management::RewardVaultRequest,
            dtos::management::RewardVaultResponse,
            dtos::management::GenerateLinkRequest,
            dtos::management::LinkResponse,
            dtos::info::CompanyNamesResponse,
            dtos::info::LinkDataResponse,
            models::Company,
            models::CompanyName,
            models::FundValidatorTxData,
            models::PrivateLinkData,
            models::RoleName,
            models::UserResponse,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Authentication", description = "Signup, verification, sessions and password recovery"),
        (name = "Management", description = "Role, company and private link administration"),
        (name = "Info", description = "Read-only views of companies, users and links"),
        (name = "Observability", description = "Service health and monitoring"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    utoipa::openapi::security::HttpBuilder::new()
                        .scheme(utoipa::openapi::security::HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub config: AccessConfig,
    pub store: Arc<dyn CredentialStore>,
    pub sessions: SessionAuthority,
    pub auth: AuthService,
    pub companies: CompanyService,
    pub management: ManagementService,
}

impl AppState {
    pub fn new(
        config: AccessConfig,
        store: Arc<dyn CredentialStore>,
        email: Arc<dyn EmailProvider>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let jwt = JwtService::new(&config.session.secret);
        let tokens = SecurityTokenIssuer::new(
            store.clone(),
            clock.clone(),
            config.session.reset_token_lifetime(),
        );

        Self {
            sessions: SessionAuthority::new(
                store.clone(),
                jwt.clone(),
                clock.clone(),
                config.session.lifetime(),
            ),
            auth: AuthService::new(store.clone(), tokens, email),
            companies: CompanyService::new(store.clone(), config.default_company.name.clone()),
            management: ManagementService::new(store.clone(), jwt, clock),
            store,
            config,
        }
    }
}

fn cors_layer(config: &AccessConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .security
        .allowed_origins
        .iter()
        .filter(|o| o.as_str() != "*")
        .filter_map(|o| match o.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::error!("Invalid CORS origin '{}': {}. Skipping.", o, e);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
}

pub fn build_router(state: AppState) -> Router {
    // ADMIN/STAFF only
    let manager_routes = Router::new()
        .route("/management/assign-roles", post(handlers::management::assign_role))
        .route("/management/assignCompany", post(handlers::management::assign_company))
        .route("/management/add-company", post(handlers::management::add_company))
        .route("/management/edit-company/:id", put(handlers::management::edit_company))
        .route("/management/remove-company/:id", delete(handlers::management::remove_company))
        .route("/management/reward-vault", post(handlers::management::update_reward_vault))
        .route("/management/generate-link", post(handlers::management::generate_link))
        .route("/management/remove-user/:id", delete(handlers::management::remove_user))
        .route("/infos/companies/details", get(handlers::info::company_details))
        .route("/infos/companies/names", get(handlers::info::company_names))
        .route("/infos/users", get(handlers::info::users))
        .route_layer(from_fn_with_state(state.clone(), middleware::require_manager));

    let api_routes = Router::new()
        .route("/auth/signup", post(handlers::auth::signup))
        .route("/auth/verify-email", get(handlers::auth::verify_email))
        .route("/auth/login", post(handlers::auth::login))
        .route("/auth/logout", post(handlers::auth::logout))
        .route("/auth/forgot-password", post(handlers::auth::forgot_password))
        .route("/auth/reset-password", post(handlers::auth::reset_password))
        .route(
            "/management/delete-privatelink/:id",
            delete(handlers::management::delete_private_link),
        )
        .route("/infos/getCurrentUser", get(handlers::info::current_user))
        .route("/infos/company/:id", get(handlers::info::company))
        .route("/infos/getLink", get(handlers::info::link))
        .merge(manager_routes)
        .route_layer(from_fn_with_state(state.clone(), middleware::session_middleware));

    let mut app = Router::new()
        .route("/health", get(health_check))
        .route("/metrics", get(handlers::metrics::metrics));

    if state.config.swagger.enabled == SwaggerMode::Public {
        app = app.merge(SwaggerUi::new("/docs").url("/.well-known/openapi.json", ApiDoc::openapi()));
    } else {
        // Still provide the OpenAPI JSON for programmatic access
        app = app.route(
            "/.well-known/openapi.json",
            get(|| async { Json(ApiDoc::openapi()) }),
        );
    }

    let cors = cors_layer(&state.config);

    app.merge(api_routes)
        .with_state(state)
        .layer(from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http().make_span_with(
            |request: &service_core::axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get("x-request-id")
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                    version = ?request.version(),
                )
            },
        ))
        .layer(from_fn(request_id_middleware))
        .layer(from_fn(security_headers_middleware))
        .layer(cors)
}

/// Service health check
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is healthy"),
        (status = 500, description = "Credential store unreachable")
    ),
    tag = "Observability"
)]
pub async fn health_check(
    service_core::axum::extract::State(state): service_core::axum::extract::State<AppState>,
) -> Result<Json<serde_json::Value>, AppError> {
    state.store.health_check().await.map_err(|e| {
        tracing::error!(error = %e, "Credential store health check failed");
        AppError::from(ServiceError::from(e))
    })?;

    Ok(Json(serde_json::json!({
        "status": "healthy",
        "service": state.config.service_name,
        "version": state.config.service_version,
        "environment": format!("{:?}", state.config.environment),
        "checks": {
            "store": "up"
        }
    })))
}
