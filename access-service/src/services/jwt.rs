use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::models::RoleName;

/// HS256 codec for session credentials and private-link tokens.
///
/// Neither token carries `exp`: sessions expire passively from `iat` and link
/// tokens do not expire.
#[derive(Clone)]
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

/// Claims of a session credential.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionClaims {
    pub id: i64,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<RoleName>,
    /// Issued at (Unix seconds). Must equal the user's login watermark.
    pub iat: i64,
}

/// Claims of a private-link token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkClaims {
    pub link_id: i64,
    pub iat: i64,
}

impl JwtService {
    pub fn new(secret: &str) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    fn validation() -> Validation {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.required_spec_claims.clear();
        validation
    }

    pub fn encode_session(&self, claims: &SessionClaims) -> Result<String, anyhow::Error> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)
            .map_err(|e| anyhow::anyhow!("Failed to encode session token: {}", e))
    }

    /// Verify the signature and decode. Freshness and watermark are checked by the caller.
    pub fn decode_session(&self, token: &str) -> Result<SessionClaims, anyhow::Error> {
        let data = decode::<SessionClaims>(token, &self.decoding_key, &Self::validation())
            .map_err(|e| anyhow::anyhow!("Invalid session token: {}", e))?;
        Ok(data.claims)
    }

    pub fn encode_link(&self, claims: &LinkClaims) -> Result<String, anyhow::Error> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)
            .map_err(|e| anyhow::anyhow!("Failed to encode link token: {}", e))
    }

    pub fn decode_link(&self, token: &str) -> Result<LinkClaims, anyhow::Error> {
        let data = decode::<LinkClaims>(token, &self.decoding_key, &Self::validation())
            .map_err(|e| anyhow::anyhow!("Invalid link token: {}", e))?;
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims() -> SessionClaims {
        SessionClaims {
            id: 7,
            email: "a@x.com".to_string(),
            role: Some(RoleName::Staff),
            iat: 1_700_000_000,
        }
    }

    #[test]
    fn test_session_token_generation_and_validation() -> Result<(), anyhow::Error> {
        let service = JwtService::new("test-secret");
        let token = service.encode_session(&claims())?;

        assert_eq!(service.decode_session(&token)?, claims());
        Ok(())
    }

    #[test]
    fn test_roleless_session_omits_role_claim() -> Result<(), anyhow::Error> {
        let service = JwtService::new("test-secret");
        let mut roleless = claims();
        roleless.role = None;
        let token = service.encode_session(&roleless)?;

        assert_eq!(service.decode_session(&token)?.role, None);
        Ok(())
    }

    #[test]
    fn test_wrong_secret_is_rejected() -> Result<(), anyhow::Error> {
        let token = JwtService::new("secret-a").encode_session(&claims())?;
        assert!(JwtService::new("secret-b").decode_session(&token).is_err());
        assert!(JwtService::new("secret-a").decode_session("not.a.jwt").is_err());
        Ok(())
    }

    #[test]
    fn test_link_and_session_tokens_are_not_interchangeable() -> Result<(), anyhow::Error> {
        let service = JwtService::new("test-secret");
        let link = service.encode_link(&LinkClaims { link_id: 3, iat: 1 })?;
        let session = service.encode_session(&claims())?;

        assert_eq!(service.decode_link(&link)?.link_id, 3);
        assert!(service.decode_session(&link).is_err());
        assert!(service.decode_link(&session).is_err());
        Ok(())
    }
}
