//! Store gateway consumed by the operation engine.

use std::future::Future;

use crate::errors::AppError;
use crate::models::{Discussion, NewOperation, Operation};

/// Record store for discussions and operations, addressable by primary key.
///
/// `list_operations_for_discussion` returns every operation in the discussion's
/// tree, children included, in a stable order.
pub trait OperationStore {
    fn get_discussion(
        &self,
        id: &str,
    ) -> impl Future<Output = Result<Option<Discussion>, AppError>> + Send;

    fn get_operation(
        &self,
        id: &str,
    ) -> impl Future<Output = Result<Option<Operation>, AppError>> + Send;

    /// Id of the discussion whose tree contains operation `id`.
    fn get_operation_discussion_id(
        &self,
        id: &str,
    ) -> impl Future<Output = Result<Option<String>, AppError>> + Send;

    /// All discussions, newest first.
    fn list_discussions(&self) -> impl Future<Output = Result<Vec<Discussion>, AppError>> + Send;

    fn list_operations_for_discussion(
        &self,
        discussion_id: &str,
    ) -> impl Future<Output = Result<Vec<Operation>, AppError>> + Send;

    fn create_discussion(
        &self,
        starting_number: f64,
        author_id: &str,
    ) -> impl Future<Output = Result<Discussion, AppError>> + Send;

    fn create_operation(
        &self,
        operation: &NewOperation,
    ) -> impl Future<Output = Result<Operation, AppError>> + Send;
}
