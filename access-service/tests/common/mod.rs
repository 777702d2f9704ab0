//! Test helpers for access-service integration tests.
//!
//! Every test drives the full router with `oneshot` against an in-memory
//! store, a recording mailer and a manual clock.

#![allow(dead_code)]

use access_service::{
    build_router,
    config::AccessConfig,
    models::{NewCompany, NewUser, RoleName},
    services::{seed, CredentialStore, ManualClock, MemoryStore, MockEmailService, SentEmailKind},
    utils::{hash_password, Password},
    AppState,
};
use axum::{
    body::Body,
    http::{header, HeaderMap, Method, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::Value;
use std::sync::Arc;
use tower::util::ServiceExt;

pub const PASSWORD: &str = "Str0ng!Pass";
pub const ADMIN_EMAIL: &str = "admin@example.com";
pub const ADMIN_PASSWORD: &str = "Adm1n!Passw0rd";

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl TestResponse {
    pub fn message(&self) -> &str {
        self.body["message"].as_str().unwrap_or_default()
    }
}

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub store: Arc<MemoryStore>,
    pub clock: Arc<ManualClock>,
    pub mail: MockEmailService,
    pub config: AccessConfig,
}

impl TestApp {
    pub async fn spawn() -> Self {
        let config = AccessConfig::for_tests("integration-test-secret-0123456789abcdef");
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(ManualClock::default());
        let mail = MockEmailService::new();

        seed(store.as_ref(), &config).await.expect("seeding failed");

        let state = AppState::new(config.clone(), store.clone(), Arc::new(mail.clone()), clock.clone());
        let router = build_router(state.clone());

        Self {
            router,
            state,
            store,
            clock,
            mail,
            config,
        }
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        self.send(request).await
    }

    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };
        TestResponse { status, headers, body }
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> TestResponse {
        self.request(Method::GET, uri, token, None).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> TestResponse {
        self.request(Method::POST, uri, token, Some(body)).await
    }

    pub async fn delete(&self, uri: &str, token: Option<&str>) -> TestResponse {
        self.request(Method::DELETE, uri, token, None).await
    }

    pub async fn signup(&self, email: &str, password: &str) -> TestResponse {
        self.post(
            "/auth/signup",
            None,
            serde_json::json!({
                "email": email,
                "name": "Test User",
                "password": password,
                "repeatPassword": password,
            }),
        )
        .await
    }

    pub fn verification_token(&self, email: &str) -> Option<String> {
        self.mail.last_token(SentEmailKind::Verification, email)
    }

    pub fn reset_token(&self, email: &str) -> Option<String> {
        self.mail.last_token(SentEmailKind::PasswordReset, email)
    }

    pub async fn login(&self, email: &str, password: &str) -> TestResponse {
        self.post(
            "/auth/login",
            None,
            serde_json::json!({ "email": email, "password": password }),
        )
        .await
    }

    /// Session credential, panicking if login fails.
    pub async fn login_token(&self, email: &str, password: &str) -> String {
        let res = self.login(email, password).await;
        assert_eq!(res.status, StatusCode::OK, "login failed: {:?}", res.body);
        res.body["accessToken"].as_str().unwrap().to_string()
    }

    pub async fn admin_token(&self) -> String {
        self.login_token(ADMIN_EMAIL, ADMIN_PASSWORD).await
    }

    /// Verified user created directly in the store. Returns the user id.
    pub async fn create_user(&self, email: &str, role: Option<RoleName>) -> i64 {
        let hash = hash_password(&Password::new(PASSWORD.to_string())).unwrap().into_string();
        let mut user = NewUser::signup("Test User".into(), email.into(), hash, "unused".into());
        user.is_verified = true;
        user.email_verification_token = None;
        let user = self.store.insert_user(user).await.unwrap();
        if let Some(role) = role {
            self.store.assign_role(user.id, role).await.unwrap();
        }
        user.id
    }

    /// Verified user with `role`, logged in. Returns (id, credential).
    pub async fn user_with_session(&self, email: &str, role: Option<RoleName>) -> (i64, String) {
        let id = self.create_user(email, role).await;
        (id, self.login_token(email, PASSWORD).await)
    }

    pub async fn create_company(&self, name: &str, wallet: &str) -> i64 {
        self.store
            .insert_company(NewCompany {
                name: name.into(),
                location: "Lisbon".into(),
                website: "https://example.org".into(),
                wallet_address: wallet.into(),
                slack: None,
                reward_vault: Some("0x0".into()),
            })
            .await
            .unwrap()
            .id
    }

    pub async fn role_id(&self, role: RoleName) -> i64 {
        self.store.find_role(role).await.unwrap().unwrap().id
    }

    pub async fn default_company_id(&self) -> i64 {
        self.store
            .find_company_by_name(&self.config.default_company.name)
            .await
            .unwrap()
            .unwrap()
            .id
    }
}

pub fn wallet(c: char) -> String {
    format!("0x{}", c.to_string().repeat(40))
}
