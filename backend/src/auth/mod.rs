//! Bearer-token authentication.
//!
//! Create endpoints take an [`AuthUser`]; read endpoints do not.

mod password;
mod token;

pub use password::{hash_password, verify_password};
pub use token::TokenService;

use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};

use crate::errors::AppError;
use crate::AppState;

/// Verified caller identity extracted from `Authorization: Bearer <token>`.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: String,
    pub username: String,
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)
            .ok_or_else(|| AppError::Unauthenticated("Access token required".to_string()))?;

        let claims = state.tokens.verify_access(token)?;

        Ok(AuthUser {
            user_id: claims.sub,
            username: claims.username.unwrap_or_default(),
        })
    }
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|s| !s.is_empty())
}
