pub mod password;
pub mod registration;
pub mod session;

pub use password::{forgot_password, reset_password};
pub use registration::{signup, verify_email};
pub use session::{login, logout};
