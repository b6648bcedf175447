//! Left-operand resolution from an operation's anchor.

use super::OperationStore;
use crate::errors::AppError;

/// The attachment point of a new operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Anchor {
    /// Root operation: left operand is the discussion's starting number.
    Discussion(String),
    /// Child operation: left operand is the parent's result.
    Parent(String),
}

impl Anchor {
    /// Build an anchor from the two optional request fields.
    ///
    /// Blank ids count as absent. With both present, `strict` rejects the request;
    /// otherwise the parent takes precedence.
    pub fn from_fields(
        discussion_id: Option<&str>,
        parent_operation_id: Option<&str>,
        strict: bool,
    ) -> Result<Self, AppError> {
        match (non_blank(discussion_id), non_blank(parent_operation_id)) {
            (None, None) => Err(AppError::MissingAnchor),
            (Some(_), Some(_)) if strict => Err(AppError::Validation(
                "Provide either discussionId or parentOperationId, not both".to_string(),
            )),
            (_, Some(parent)) => Ok(Anchor::Parent(parent.to_string())),
            (Some(discussion), None) => Ok(Anchor::Discussion(discussion.to_string())),
        }
    }
}

/// Treat missing and whitespace-only ids alike.
pub(crate) fn non_blank(id: Option<&str>) -> Option<&str> {
    id.filter(|s| !s.trim().is_empty())
}

/// Look up the number a new operation at `anchor` starts from.
pub async fn resolve_left_operand<S: OperationStore>(
    store: &S,
    anchor: &Anchor,
) -> Result<f64, AppError> {
    match anchor {
        Anchor::Parent(id) => store
            .get_operation(id)
            .await?
            .map(|parent| parent.result)
            .ok_or_else(|| AppError::ParentNotFound(id.clone())),
        Anchor::Discussion(id) => store
            .get_discussion(id)
            .await?
            .map(|discussion| discussion.starting_number)
            .ok_or_else(|| AppError::DiscussionNotFound(id.clone())),
    }
}
