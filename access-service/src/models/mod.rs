pub mod company;
pub mod private_link;
pub mod role;
pub mod user;

pub use company::{same_company_name, Company, CompanyName, NewCompany};
pub use private_link::{FundValidatorTxData, NewPrivateLink, PrivateLink, PrivateLinkData, PrivateLinkRow};
pub use role::{Role, RoleName, RoleRow};
pub use user::{normalize_email, NewUser, User, UserResponse, UserRow};
