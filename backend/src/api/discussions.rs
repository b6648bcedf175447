//! Discussion API endpoints.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};

use super::{created, success, ApiResult};
use crate::auth::AuthUser;
use crate::engine;
use crate::models::{CreateDiscussionRequest, DiscussionTree};
use crate::AppState;

/// GET /api/discussions - List all discussions, newest first, with operation trees.
pub async fn list_discussions(State(state): State<AppState>) -> ApiResult<Vec<DiscussionTree>> {
    let trees = engine::discussion_trees(state.repo.as_ref()).await?;
    success(trees)
}

/// GET /api/discussions/{id} - Get a single discussion with its operation tree.
pub async fn get_discussion(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<DiscussionTree> {
    let tree = engine::discussion_tree(state.repo.as_ref(), &id).await?;
    success(tree)
}

/// POST /api/discussions - Create a new discussion.
pub async fn create_discussion(
    State(state): State<AppState>,
    user: AuthUser,
    payload: Result<Json<CreateDiscussionRequest>, JsonRejection>,
) -> ApiResult<DiscussionTree> {
    let Json(request) = payload?;

    let discussion =
        engine::create_discussion(state.repo.as_ref(), &request, &user.user_id).await?;

    // A fresh discussion has no operations yet
    created(engine::materialize(discussion, Vec::new()))
}
