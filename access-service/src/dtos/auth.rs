use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::models::RoleName;

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
    #[validate(email(message = "Invalid email format"))]
    #[schema(example = "user@example.com")]
    pub email: String,

    #[validate(length(min = 1, message = "Name is required"))]
    #[schema(example = "Jane Doe")]
    pub name: String,

    #[schema(example = "Str0ng!Pass")]
    pub password: String,

    #[schema(example = "Str0ng!Pass")]
    pub repeat_password: String,
}

#[derive(Debug, Deserialize, ToSchema, IntoParams)]
pub struct VerifyEmailQuery {
    #[param(example = "4f3c...e1")]
    pub token: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    #[schema(example = "user@example.com")]
    pub email: String,

    #[schema(example = "Str0ng!Pass")]
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    #[schema(example = "Logged in successfully")]
    pub message: String,
    pub role: Option<RoleName>,
    pub access_token: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ForgotPasswordRequest {
    #[schema(example = "user@example.com")]
    pub email: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    #[serde(default)]
    pub token: String,

    #[schema(example = "N3w!Password")]
    pub new_password: String,

    #[schema(example = "N3w!Password")]
    pub confirm_new_password: String,
}
