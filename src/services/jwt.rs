// JWT access token service
// HS256 signed access tokens carrying the caller's per-business role map.
// Refresh is handled by opaque session tokens, not a second JWT.

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum JwtError {
    #[error("JWT encoding error: {0}")]
    EncodingError(String),

    #[error("Token expired")]
    TokenExpired,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Clock error: {0}")]
    ClockError(String),
}

impl From<jsonwebtoken::errors::Error> for JwtError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;
        match err.kind() {
            ErrorKind::ExpiredSignature => JwtError::TokenExpired,
            ErrorKind::InvalidToken
            | ErrorKind::InvalidSignature
            | ErrorKind::InvalidAudience
            | ErrorKind::InvalidIssuer => JwtError::InvalidToken,
            _ => JwtError::EncodingError(err.to_string()),
        }
    }
}

/// Access token claims. `roles` maps business id to the role names the
/// user holds there, so request handlers can authorize without a DB hit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessTokenClaims {
    pub sub: String,
    pub jti: String,
    pub email: String,
    pub roles: HashMap<Uuid, Vec<String>>,
    pub aud: String,
    pub iss: String,
    pub iat: u64,
    pub exp: u64,
}

#[derive(Clone)]
pub struct JwtConfig {
    pub access_token_expiry: u64,
    pub algorithm: Algorithm,
    pub audience: String,
    pub issuer: String,
    pub encoding_key: EncodingKey,
    pub decoding_key: DecodingKey,
    pub key_version: u32,
}

impl std::fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtConfig")
            .field("access_token_expiry", &self.access_token_expiry)
            .field("algorithm", &self.algorithm)
            .field("audience", &self.audience)
            .field("issuer", &self.issuer)
            .field("encoding_key", &"<redacted>")
            .field("decoding_key", &"<redacted>")
            .field("key_version", &self.key_version)
            .finish()
    }
}

impl JwtConfig {
    fn build_from_params(
        access_secret: &str,
        access_expiry: u64,
        audience: String,
        issuer: String,
        key_version: u32,
    ) -> Self {
        JwtConfig {
            access_token_expiry: access_expiry,
            algorithm: Algorithm::HS256,
            audience,
            issuer,
            encoding_key: EncodingKey::from_secret(access_secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(access_secret.as_bytes()),
            key_version,
        }
    }

    /// Create JWT config from centralized app configuration
    pub fn from_env() -> Self {
        let jwt = &crate::app_config::config().jwt;
        Self::build_from_params(
            &jwt.access_secret,
            jwt.access_expiry,
            jwt.audience.clone(),
            jwt.issuer.clone(),
            jwt.key_version,
        )
    }

    /// Deterministic config for tests, no env dependency
    #[cfg(test)]
    pub fn for_test() -> Self {
        Self::build_from_params(
            "test-access-secret-hs256-at-least-32-chars",
            900,
            "test.localrank.dev".to_string(),
            "test.localrank.dev".to_string(),
            1,
        )
    }

    /// Short-expiry variant for testing expiry behavior
    #[cfg(test)]
    pub fn for_test_with_expiry(expiry: u64) -> Self {
        Self::build_from_params(
            "test-access-secret-hs256-at-least-32-chars",
            expiry,
            "test.localrank.dev".to_string(),
            "test.localrank.dev".to_string(),
            1,
        )
    }
}

pub struct JwtService {
    config: JwtConfig,
}

impl JwtService {
    pub fn new(config: JwtConfig) -> Self {
        Self { config }
    }

    pub fn from_env() -> Self {
        Self::new(JwtConfig::from_env())
    }

    /// Generate a signed access token embedding the user's role map
    pub fn generate_access_token(
        &self,
        user_id: Uuid,
        email: &str,
        roles: HashMap<Uuid, Vec<String>>,
    ) -> Result<String, JwtError> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| JwtError::ClockError(e.to_string()))?
            .as_secs();

        let claims = AccessTokenClaims {
            sub: user_id.to_string(),
            jti: Uuid::new_v4().to_string(),
            email: email.to_string(),
            roles,
            aud: self.config.audience.clone(),
            iss: self.config.issuer.clone(),
            iat: now,
            exp: now + self.config.access_token_expiry,
        };

        let mut header = Header::new(self.config.algorithm);
        header.kid = Some(self.config.key_version.to_string());

        encode(&header, &claims, &self.config.encoding_key).map_err(Into::into)
    }

    /// Validate an access token. Expiry is strict, no leeway.
    pub fn validate_access_token(&self, token: &str) -> Result<AccessTokenClaims, JwtError> {
        let mut validation = Validation::new(self.config.algorithm);
        validation.set_audience(&[self.config.audience.clone()]);
        validation.set_issuer(&[self.config.issuer.clone()]);
        validation.validate_exp = true;
        validation.validate_nbf = false;
        validation.leeway = 0;

        let token_data = decode::<AccessTokenClaims>(token, &self.config.decoding_key, &validation)?;

        Ok(token_data.claims)
    }

    pub fn access_token_expiry(&self) -> u64 {
        self.config.access_token_expiry
    }
}
