//! JWT issuance and verification for access and refresh tokens.

use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::errors::AppError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// user id
    pub sub: String,
    /// present on access tokens only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    pub iat: i64,
    pub exp: i64,
}

struct KeyPair {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl_secs: i64,
}

impl KeyPair {
    fn new(secret: &str, ttl_secs: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl_secs,
        }
    }

    fn issue(&self, user_id: &str, username: Option<&str>) -> Result<String, AppError> {
        let issued_at = Utc::now().timestamp();
        let claims = Claims {
            sub: user_id.to_string(),
            username: username.map(str::to_string),
            iat: issued_at,
            exp: issued_at + self.ttl_secs,
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding).map_err(|e| {
            tracing::error!("Failed to sign token: {}", e);
            AppError::Internal("Failed to create token".to_string())
        })
    }

    fn verify(&self, token: &str) -> Result<Claims, AppError> {
        let validation = Validation::new(Algorithm::HS256);
        Ok(decode::<Claims>(token, &self.decoding, &validation)?.claims)
    }
}

/// Signs and checks access and refresh tokens with separate secrets.
pub struct TokenService {
    access: KeyPair,
    refresh: KeyPair,
}

impl TokenService {
    pub fn new(config: &Config) -> Self {
        Self {
            access: KeyPair::new(&config.access_token_secret, config.access_token_ttl_secs),
            refresh: KeyPair::new(&config.refresh_token_secret, config.refresh_token_ttl_secs),
        }
    }

    pub fn issue_access(&self, user_id: &str, username: &str) -> Result<String, AppError> {
        self.access.issue(user_id, Some(username))
    }

    pub fn issue_refresh(&self, user_id: &str) -> Result<String, AppError> {
        self.refresh.issue(user_id, None)
    }

    pub fn verify_access(&self, token: &str) -> Result<Claims, AppError> {
        self.access.verify(token)
    }

    pub fn verify_refresh(&self, token: &str) -> Result<Claims, AppError> {
        self.refresh.verify(token)
    }
}
