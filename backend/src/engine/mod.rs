//! Operation-tree engine.
//!
//! Every operation takes its left operand from its anchor (the discussion's starting
//! number for roots, the parent's result otherwise), is evaluated once, and is stored
//! append-only. Reads rebuild the nested tree from the flat records.

mod evaluator;
#[cfg(test)]
pub(crate) mod memory;
mod resolver;
mod store;
mod tree;

pub use evaluator::evaluate;
pub use resolver::{resolve_left_operand, Anchor};
pub use store::OperationStore;
pub use tree::materialize;

use resolver::non_blank;

use crate::errors::AppError;
use crate::models::{
    CreateDiscussionRequest, CreateOperationRequest, Discussion, DiscussionTree, NewOperation,
    Operation, OperationType,
};

/// Policy knobs for operation creation.
#[derive(Debug, Clone, Copy)]
pub struct CreationPolicy {
    /// Reject requests that carry both anchor fields.
    pub strict_anchors: bool,
}

impl Default for CreationPolicy {
    fn default() -> Self {
        Self {
            strict_anchors: true,
        }
    }
}

fn require_author(author_id: &str) -> Result<(), AppError> {
    if author_id.trim().is_empty() {
        return Err(AppError::Unauthenticated(
            "An authenticated author is required".to_string(),
        ));
    }
    Ok(())
}

/// Create a discussion seeded with `request.starting_number`.
pub async fn create_discussion<S: OperationStore>(
    store: &S,
    request: &CreateDiscussionRequest,
    author_id: &str,
) -> Result<Discussion, AppError> {
    require_author(author_id)?;

    if !request.starting_number.is_finite() {
        return Err(AppError::Validation(
            "startingNumber must be a finite number".to_string(),
        ));
    }

    let discussion = store
        .create_discussion(request.starting_number, author_id)
        .await?;

    tracing::info!(
        discussion_id = %discussion.id,
        author_id,
        starting_number = discussion.starting_number,
        "Discussion created"
    );

    Ok(discussion)
}

/// Compute and persist a new operation.
///
/// Nothing is written unless every check passes; the store sees a single insert.
pub async fn create_operation<S: OperationStore>(
    store: &S,
    request: &CreateOperationRequest,
    author_id: &str,
    policy: CreationPolicy,
) -> Result<Operation, AppError> {
    require_author(author_id)?;

    let discussion_id = non_blank(request.discussion_id.as_deref());
    let parent_operation_id = non_blank(request.parent_operation_id.as_deref());
    let anchor = Anchor::from_fields(discussion_id, parent_operation_id, policy.strict_anchors)?;

    let op_type: OperationType = request.op_type.parse()?;

    let left_operand = resolve_left_operand(store, &anchor).await?;

    // Compatible mode stores both fields: the discussion must exist and own the parent.
    if let (Anchor::Parent(parent_id), Some(id)) = (&anchor, discussion_id) {
        if store.get_discussion(id).await?.is_none() {
            return Err(AppError::DiscussionNotFound(id.to_string()));
        }
        let owner = store.get_operation_discussion_id(parent_id).await?;
        if owner.as_deref() != Some(id) {
            return Err(AppError::Validation(format!(
                "Parent operation {} does not belong to discussion {}",
                parent_id, id
            )));
        }
    }

    let result = evaluate(left_operand, op_type, request.right_operand)?;

    if !result.is_finite() {
        return Err(AppError::Validation(format!(
            "Result of {} {} {} is not a finite number",
            left_operand, op_type, request.right_operand
        )));
    }

    let new_operation = NewOperation {
        op_type,
        left_operand,
        right_operand: request.right_operand,
        result,
        author_id: author_id.to_string(),
        discussion_id: discussion_id.map(str::to_string),
        parent_operation_id: parent_operation_id.map(str::to_string),
    };

    let operation = store.create_operation(&new_operation).await?;

    tracing::info!(
        operation_id = %operation.id,
        op_type = %operation.op_type,
        left_operand = operation.left_operand,
        right_operand = operation.right_operand,
        result = operation.result,
        ?anchor,
        "Operation created"
    );

    Ok(operation)
}

/// Load one discussion with its materialized operation tree.
pub async fn discussion_tree<S: OperationStore>(
    store: &S,
    discussion_id: &str,
) -> Result<DiscussionTree, AppError> {
    let discussion = store
        .get_discussion(discussion_id)
        .await?
        .ok_or_else(|| AppError::DiscussionNotFound(discussion_id.to_string()))?;

    let operations = store.list_operations_for_discussion(&discussion.id).await?;
    Ok(materialize(discussion, operations))
}

/// Load every discussion, newest first, each with its materialized tree.
pub async fn discussion_trees<S: OperationStore>(
    store: &S,
) -> Result<Vec<DiscussionTree>, AppError> {
    let discussions = store.list_discussions().await?;

    let mut trees = Vec::with_capacity(discussions.len());
    for discussion in discussions {
        let operations = store.list_operations_for_discussion(&discussion.id).await?;
        trees.push(materialize(discussion, operations));
    }
    Ok(trees)
}
