pub mod auth;

pub use auth::{credential_from, require_manager, session_middleware, AuthUser, MaybeUser, ACCESS_TOKEN_COOKIE};
