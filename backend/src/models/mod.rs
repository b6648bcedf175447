//! Data models for the discussions backend.
//!
//! Field names serialize as camelCase to match the frontend contract.

mod discussion;
mod operation;
mod user;

pub use discussion::*;
pub use operation::*;
pub use user::*;
