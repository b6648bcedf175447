//! Operation API endpoints.

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};

use super::{created, ApiResult};
use crate::auth::AuthUser;
use crate::engine::{self, CreationPolicy};
use crate::models::{CreateOperationRequest, Operation};
use crate::AppState;

/// POST /api/operations - Apply an operation to a discussion root or an existing operation.
pub async fn create_operation(
    State(state): State<AppState>,
    user: AuthUser,
    payload: Result<Json<CreateOperationRequest>, JsonRejection>,
) -> ApiResult<Operation> {
    let Json(request) = payload?;

    let policy = CreationPolicy {
        strict_anchors: state.config.strict_anchors,
    };

    match engine::create_operation(state.repo.as_ref(), &request, &user.user_id, policy).await {
        Ok(operation) => created(operation),
        Err(e) => {
            tracing::debug!(
                user_id = %user.user_id,
                username = %user.username,
                error = %e,
                "Operation rejected"
            );
            Err(e)
        }
    }
}
