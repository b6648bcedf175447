//! Arithmetic evaluation of a single operation.

use crate::errors::AppError;
use crate::models::OperationType;

/// Combine `left` and `right` with `op`.
///
/// Division rejects a right operand equal to zero (including `-0.0`); there is no
/// tolerance band around zero.
pub fn evaluate(left: f64, op: OperationType, right: f64) -> Result<f64, AppError> {
    match op {
        OperationType::Add => Ok(left + right),
        OperationType::Subtract => Ok(left - right),
        OperationType::Multiply => Ok(left * right),
        OperationType::Divide => {
            if right == 0.0 {
                return Err(AppError::DivisionByZero);
            }
            Ok(left / right)
        }
    }
}
