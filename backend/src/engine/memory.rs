//! In-memory store used by engine unit tests.

use std::sync::Mutex;

use chrono::Utc;

use super::OperationStore;
use crate::errors::AppError;
use crate::models::{Discussion, NewOperation, Operation};

#[derive(Default)]
pub struct MemoryStore {
    discussions: Mutex<Vec<Discussion>>,
    /// (owning discussion id, operation) in insertion order
    operations: Mutex<Vec<(String, Operation)>>,
}

impl MemoryStore {
    pub fn operation_count(&self) -> usize {
        self.operations.lock().unwrap().len()
    }

    /// Insert a raw record, bypassing the creation protocol.
    pub fn insert_raw(&self, scope: &str, operation: Operation) {
        self.operations
            .lock()
            .unwrap()
            .push((scope.to_string(), operation));
    }
}

impl OperationStore for MemoryStore {
    async fn get_discussion(&self, id: &str) -> Result<Option<Discussion>, AppError> {
        let discussions = self.discussions.lock().unwrap();
        Ok(discussions.iter().find(|d| d.id == id).cloned())
    }

    async fn get_operation(&self, id: &str) -> Result<Option<Operation>, AppError> {
        let operations = self.operations.lock().unwrap();
        Ok(operations
            .iter()
            .find(|(_, op)| op.id == id)
            .map(|(_, op)| op.clone()))
    }

    async fn get_operation_discussion_id(&self, id: &str) -> Result<Option<String>, AppError> {
        let operations = self.operations.lock().unwrap();
        Ok(operations
            .iter()
            .find(|(_, op)| op.id == id)
            .map(|(scope, _)| scope.clone()))
    }

    async fn list_discussions(&self) -> Result<Vec<Discussion>, AppError> {
        let discussions = self.discussions.lock().unwrap();
        Ok(discussions.iter().rev().cloned().collect())
    }

    async fn list_operations_for_discussion(
        &self,
        discussion_id: &str,
    ) -> Result<Vec<Operation>, AppError> {
        let operations = self.operations.lock().unwrap();
        Ok(operations
            .iter()
            .filter(|(scope, _)| scope == discussion_id)
            .map(|(_, op)| op.clone())
            .collect())
    }

    async fn create_discussion(
        &self,
        starting_number: f64,
        author_id: &str,
    ) -> Result<Discussion, AppError> {
        let discussion = Discussion {
            id: uuid::Uuid::new_v4().to_string(),
            starting_number,
            author_id: author_id.to_string(),
            author: None,
            created_at: Utc::now().to_rfc3339(),
        };
        self.discussions.lock().unwrap().push(discussion.clone());
        Ok(discussion)
    }

    async fn create_operation(&self, new: &NewOperation) -> Result<Operation, AppError> {
        let mut operations = self.operations.lock().unwrap();

        let parent_scope = new.parent_operation_id.as_deref().and_then(|parent_id| {
            operations
                .iter()
                .find(|(_, op)| op.id == parent_id)
                .map(|(scope, _)| scope.clone())
        });
        let scope = parent_scope
            .or_else(|| new.discussion_id.clone())
            .ok_or_else(|| AppError::Internal("Operation has no owning discussion".into()))?;

        let operation = Operation {
            id: uuid::Uuid::new_v4().to_string(),
            op_type: new.op_type,
            left_operand: new.left_operand,
            right_operand: new.right_operand,
            result: new.result,
            author_id: new.author_id.clone(),
            author: None,
            discussion_id: new.discussion_id.clone(),
            parent_operation_id: new.parent_operation_id.clone(),
            created_at: Utc::now().to_rfc3339(),
        };
        operations.push((scope, operation.clone()));
        Ok(operation)
    }
}
