//! Discussion model and its materialized tree view.

use serde::{Deserialize, Serialize};

use super::{AuthorSummary, OperationNode};

/// A seed number owned by a user; the root of one or more operation trees.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Discussion {
    pub id: String,
    pub starting_number: f64,
    pub author_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<AuthorSummary>,
    pub created_at: String,
}

/// A discussion with its operations nested as a forest of root nodes.
#[derive(Debug, Serialize)]
pub struct DiscussionTree {
    #[serde(flatten)]
    pub discussion: Discussion,
    pub operations: Vec<OperationNode>,
}

/// Request body for creating a new discussion.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateDiscussionRequest {
    pub starting_number: f64,
}
