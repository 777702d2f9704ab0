pub mod password;
pub mod validation;

pub use password::{
    hash_password, hash_password_blocking, passwords_match, validate_strength, verify_password,
    verify_password_blocking, Password, PasswordHashString,
};
pub use validation::{is_valid_eth_address, non_blank, ValidatedJson};
