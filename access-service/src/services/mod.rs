//! Services layer for the access service.
//!
//! Business logic for sessions, security tokens, authorization and the
//! company/user management workflows, over a pluggable credential store.

pub mod auth;
pub mod authz;
pub mod clock;
pub mod company;
mod database;
pub mod email;
pub mod error;
mod jwt;
pub mod management;
pub mod memory;
pub mod metrics;
pub mod seed;
pub mod session;
pub mod store;
pub mod tokens;

pub use auth::AuthService;
pub use authz::{authorize, Action, Actor, Decision, Denial, DenialKind, Subject};
pub use clock::{Clock, ManualClock, SystemClock};
pub use company::{CompanyInput, CompanyService};
pub use database::PgStore;
pub use email::{EmailProvider, EmailService, LogOnlyEmailService, MockEmailService, SentEmailKind};
pub use error::ServiceError;
pub use jwt::{JwtService, LinkClaims, SessionClaims};
pub use management::ManagementService;
pub use memory::MemoryStore;
pub use seed::seed;
pub use session::{Authentication, Identity, LoginOutcome, SessionAuthority};
pub use store::{CredentialStore, StoreError};
pub use tokens::SecurityTokenIssuer;
