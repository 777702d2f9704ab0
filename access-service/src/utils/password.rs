use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

/// Symbols that satisfy the special-character requirement. Passwords may only
/// use ASCII letters, digits and these.
pub const PASSWORD_SYMBOLS: &str = "!@#$%^&*()_+{}[]:;<>,.?~\\/-";

pub const MIN_PASSWORD_LEN: usize = 8;

/// Newtype for password to prevent accidental logging
#[derive(Clone)]
pub struct Password(String);

impl Password {
    pub fn new(password: String) -> Self {
        Self(password)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for Password {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Password(***)")
    }
}

/// Newtype for password hash
#[derive(Debug, Clone)]
pub struct PasswordHashString(String);

impl PasswordHashString {
    pub fn new(hash: String) -> Self {
        Self(hash)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

/// At least 8 characters with one uppercase, one lowercase, one digit and one
/// symbol from [`PASSWORD_SYMBOLS`].
pub fn validate_strength(password: &str) -> bool {
    let allowed = |c: char| c.is_ascii_alphanumeric() || PASSWORD_SYMBOLS.contains(c);

    password.chars().count() >= MIN_PASSWORD_LEN
        && password.chars().all(allowed)
        && password.chars().any(|c| c.is_ascii_uppercase())
        && password.chars().any(|c| c.is_ascii_lowercase())
        && password.chars().any(|c| c.is_ascii_digit())
        && password.chars().any(|c| PASSWORD_SYMBOLS.contains(c))
}

pub fn passwords_match(a: &str, b: &str) -> bool {
    a == b
}

/// Hash a password using Argon2
///
/// Uses Argon2id variant with secure default parameters.
/// Salt is automatically generated and included in the hash.
pub fn hash_password(password: &Password) -> Result<PasswordHashString, anyhow::Error> {
    let argon2 = Argon2::default();
    let salt = SaltString::generate(&mut OsRng);

    let password_hash = argon2
        .hash_password(password.as_str().as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {}", e))?
        .to_string();

    Ok(PasswordHashString::new(password_hash))
}

/// Verify a password against a hash using constant-time comparison
///
/// Returns Ok(()) if password matches, Err otherwise.
pub fn verify_password(
    password: &Password,
    password_hash: &PasswordHashString,
) -> Result<(), anyhow::Error> {
    let parsed_hash = PasswordHash::new(password_hash.as_str())
        .map_err(|e| anyhow::anyhow!("Invalid password hash format: {}", e))?;

    Argon2::default()
        .verify_password(password.as_str().as_bytes(), &parsed_hash)
        .map_err(|_| anyhow::anyhow!("Password verification failed"))
}

/// [`hash_password`] on the blocking pool.
pub async fn hash_password_blocking(password: Password) -> Result<PasswordHashString, anyhow::Error> {
    tokio::task::spawn_blocking(move || hash_password(&password)).await?
}

/// [`verify_password`] on the blocking pool. `Ok(false)` on mismatch.
pub async fn verify_password_blocking(
    password: Password,
    password_hash: PasswordHashString,
) -> Result<bool, anyhow::Error> {
    let matched =
        tokio::task::spawn_blocking(move || verify_password(&password, &password_hash).is_ok())
            .await?;
    Ok(matched)
}
