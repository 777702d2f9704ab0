//! HTTP handlers for the access service.

pub mod auth;
pub mod info;
pub mod management;
pub mod metrics;
