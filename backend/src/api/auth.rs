//! Registration, login and token refresh endpoints.

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};

use super::{created, success, ApiResult};
use crate::auth::{hash_password, verify_password};
use crate::errors::AppError;
use crate::models::{AuthResponse, CredentialsRequest, RefreshRequest, RefreshResponse, User};
use crate::AppState;

const USERNAME_MIN: usize = 3;
const USERNAME_MAX: usize = 50;
const PASSWORD_MIN: usize = 6;

fn validate_credentials(request: &CredentialsRequest) -> Result<(), AppError> {
    let username_len = request.username.chars().count();
    if !(USERNAME_MIN..=USERNAME_MAX).contains(&username_len) {
        return Err(AppError::Validation(format!(
            "Username must be between {} and {} characters",
            USERNAME_MIN, USERNAME_MAX
        )));
    }
    if request.password.chars().count() < PASSWORD_MIN {
        return Err(AppError::Validation(format!(
            "Password must be at least {} characters",
            PASSWORD_MIN
        )));
    }
    Ok(())
}

fn issue_tokens(state: &AppState, user: User) -> Result<AuthResponse, AppError> {
    Ok(AuthResponse {
        access_token: state.tokens.issue_access(&user.id, &user.username)?,
        refresh_token: state.tokens.issue_refresh(&user.id)?,
        user,
    })
}

/// POST /api/auth/register - Create an account and return tokens.
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<CredentialsRequest>, JsonRejection>,
) -> ApiResult<AuthResponse> {
    let Json(request) = payload?;
    validate_credentials(&request)?;

    let password_hash = hash_password(request.password, state.config.bcrypt_cost).await?;
    let user = state
        .repo
        .create_user(&request.username, &password_hash)
        .await?;

    tracing::info!(user_id = %user.id, username = %user.username, "User registered");

    created(issue_tokens(&state, user)?)
}

/// POST /api/auth/login - Exchange credentials for tokens.
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<CredentialsRequest>, JsonRejection>,
) -> ApiResult<AuthResponse> {
    let Json(request) = payload?;
    validate_credentials(&request)?;

    let invalid = || AppError::Unauthenticated("Invalid credentials".to_string());

    let record = state
        .repo
        .get_user_by_username(&request.username)
        .await?
        .ok_or_else(invalid)?;

    if !verify_password(request.password, record.password_hash.clone()).await? {
        return Err(invalid());
    }

    success(issue_tokens(&state, record.into())?)
}

/// POST /api/auth/refresh - Exchange a refresh token for a new access token.
pub async fn refresh(
    State(state): State<AppState>,
    payload: Result<Json<RefreshRequest>, JsonRejection>,
) -> ApiResult<RefreshResponse> {
    let Json(request) = payload?;

    let token = request
        .refresh_token
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AppError::Unauthenticated("Refresh token required".to_string()))?;

    let claims = state.tokens.verify_refresh(&token)?;
    let user = state
        .repo
        .get_user(&claims.sub)
        .await?
        .ok_or_else(|| AppError::Unauthenticated("Invalid refresh token".to_string()))?;

    success(RefreshResponse {
        access_token: state.tokens.issue_access(&user.id, &user.username)?,
    })
}
