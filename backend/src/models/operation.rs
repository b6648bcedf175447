//! Operation model: one arithmetic step anchored to a discussion or to another operation.

use std::fmt;
use std::str::FromStr;

use serde::{ser, Deserialize, Serialize, Serializer};
use serde_json::value::RawValue;

use crate::errors::AppError;

/// The four supported arithmetic operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationType {
    Add,
    Subtract,
    Multiply,
    Divide,
}

impl OperationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationType::Add => "add",
            OperationType::Subtract => "subtract",
            OperationType::Multiply => "multiply",
            OperationType::Divide => "divide",
        }
    }
}

impl FromStr for OperationType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "add" => Ok(OperationType::Add),
            "subtract" => Ok(OperationType::Subtract),
            "multiply" => Ok(OperationType::Multiply),
            "divide" => Ok(OperationType::Divide),
            other => Err(AppError::InvalidOperationType(other.to_string())),
        }
    }
}

impl fmt::Display for OperationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Public identity of the user who authored a discussion or operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorSummary {
    pub id: String,
    pub username: String,
}

/// A persisted operation. Immutable once stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Operation {
    pub id: String,
    #[serde(rename = "type")]
    pub op_type: OperationType,
    pub left_operand: f64,
    pub right_operand: f64,
    pub result: f64,
    pub author_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<AuthorSummary>,
    /// Set only for operations attached directly to the discussion root
    pub discussion_id: Option<String>,
    /// Set only for operations attached under another operation
    pub parent_operation_id: Option<String>,
    pub created_at: String,
}

/// A fully computed operation ready to be persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct NewOperation {
    pub op_type: OperationType,
    pub left_operand: f64,
    pub right_operand: f64,
    pub result: f64,
    pub author_id: String,
    pub discussion_id: Option<String>,
    pub parent_operation_id: Option<String>,
}

/// An operation together with the operations branched off it.
///
/// Chains can be arbitrarily deep, so serializing and dropping a node walk the
/// subtree with an explicit stack instead of recursing per level.
#[derive(Debug)]
pub struct OperationNode {
    pub operation: Operation,
    pub child_operations: Vec<OperationNode>,
}

impl OperationNode {
    /// Render the subtree as JSON: the operation's own fields plus `childOperations`.
    pub fn to_json(&self) -> serde_json::Result<String> {
        enum Step<'a> {
            Open(&'a OperationNode),
            Separator,
            Close,
        }

        let mut out = String::new();
        let mut stack = vec![Step::Open(self)];
        while let Some(step) = stack.pop() {
            match step {
                Step::Open(node) => {
                    // Reopen the operation object to append the children array.
                    let fields = serde_json::to_string(&node.operation)?;
                    out.push_str(fields.strip_suffix('}').unwrap_or(fields.as_str()));
                    out.push_str(",\"childOperations\":[");

                    stack.push(Step::Close);
                    for (i, child) in node.child_operations.iter().enumerate().rev() {
                        stack.push(Step::Open(child));
                        if i > 0 {
                            stack.push(Step::Separator);
                        }
                    }
                }
                Step::Separator => out.push(','),
                Step::Close => out.push_str("]}"),
            }
        }
        Ok(out)
    }
}

impl Serialize for OperationNode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let json = self.to_json().map_err(ser::Error::custom)?;
        let raw = RawValue::from_string(json).map_err(ser::Error::custom)?;
        raw.serialize(serializer)
    }
}

impl Drop for OperationNode {
    fn drop(&mut self) {
        let mut pending = std::mem::take(&mut self.child_operations);
        while let Some(mut node) = pending.pop() {
            pending.append(&mut node.child_operations);
        }
    }
}

/// Request body for creating a new operation.
///
/// `type` stays textual here so that unknown operators surface as
/// `INVALID_OPERATION_TYPE` rather than a generic body rejection.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOperationRequest {
    #[serde(rename = "type")]
    pub op_type: String,
    pub right_operand: f64,
    #[serde(default)]
    pub discussion_id: Option<String>,
    #[serde(default)]
    pub parent_operation_id: Option<String>,
}
