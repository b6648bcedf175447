//! Database repository for users, discussions and operations.
//!
//! Discussions and operations are append-only: there are no UPDATE or DELETE paths.

use chrono::{SecondsFormat, Utc};
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};

use crate::engine::OperationStore;
use crate::errors::AppError;
use crate::models::{AuthorSummary, Discussion, NewOperation, Operation, User, UserRecord};

const SELECT_DISCUSSION: &str = r#"
    SELECT d.id, d.starting_number, d.author_id, d.created_at, u.username AS author_username
    FROM discussions d
    LEFT JOIN users u ON u.id = d.author_id
"#;

const SELECT_OPERATION: &str = r#"
    SELECT o.id, o.type, o.left_operand, o.right_operand, o.result, o.author_id,
           o.discussion_id, o.parent_operation_id, o.created_at,
           u.username AS author_username
    FROM operations o
    LEFT JOIN users u ON u.id = o.author_id
"#;

/// Database repository for all data operations.
#[derive(Clone)]
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Close the underlying pool, waiting for in-flight queries.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    // ==================== USER OPERATIONS ====================

    /// Create a user; a taken username is a conflict.
    pub async fn create_user(&self, username: &str, password_hash: &str) -> Result<User, AppError> {
        let id = uuid::Uuid::new_v4().to_string();

        let inserted = sqlx::query(
            "INSERT INTO users (id, username, password_hash, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(username)
        .bind(password_hash)
        .bind(now())
        .execute(&self.pool)
        .await;

        match inserted {
            Ok(_) => Ok(User {
                id,
                username: username.to_string(),
            }),
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => Err(
                AppError::Conflict(format!("Username {} already exists", username)),
            ),
            Err(e) => Err(e.into()),
        }
    }

    /// Get a user (with password hash) by username.
    pub async fn get_user_by_username(
        &self,
        username: &str,
    ) -> Result<Option<UserRecord>, AppError> {
        let row = sqlx::query("SELECT id, username, password_hash FROM users WHERE username = ?")
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(user_record_from_row).transpose()
    }

    /// Get a user by ID.
    pub async fn get_user(&self, id: &str) -> Result<Option<User>, AppError> {
        let row = sqlx::query("SELECT id, username, password_hash FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row
            .as_ref()
            .map(user_record_from_row)
            .transpose()?
            .map(User::from))
    }
}

impl OperationStore for Repository {
    async fn get_discussion(&self, id: &str) -> Result<Option<Discussion>, AppError> {
        let sql = format!("{} WHERE d.id = ?", SELECT_DISCUSSION);
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(discussion_from_row).transpose()
    }

    async fn get_operation(&self, id: &str) -> Result<Option<Operation>, AppError> {
        let sql = format!("{} WHERE o.id = ?", SELECT_OPERATION);
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(operation_from_row).transpose()
    }

    async fn get_operation_discussion_id(&self, id: &str) -> Result<Option<String>, AppError> {
        let scope: Option<String> = sqlx::query_scalar("SELECT scope_discussion_id FROM operations WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(scope)
    }

    async fn list_discussions(&self) -> Result<Vec<Discussion>, AppError> {
        let sql = format!(
            "{} ORDER BY d.created_at DESC, d.rowid DESC",
            SELECT_DISCUSSION
        );
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;

        rows.iter().map(discussion_from_row).collect()
    }

    async fn list_operations_for_discussion(
        &self,
        discussion_id: &str,
    ) -> Result<Vec<Operation>, AppError> {
        let sql = format!(
            "{} WHERE o.scope_discussion_id = ? ORDER BY o.rowid",
            SELECT_OPERATION
        );
        let rows = sqlx::query(&sql)
            .bind(discussion_id)
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(operation_from_row).collect()
    }

    async fn create_discussion(
        &self,
        starting_number: f64,
        author_id: &str,
    ) -> Result<Discussion, AppError> {
        let id = uuid::Uuid::new_v4().to_string();

        sqlx::query(
            "INSERT INTO discussions (id, starting_number, author_id, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(starting_number)
        .bind(author_id)
        .bind(now())
        .execute(&self.pool)
        .await?;

        self.get_discussion(&id)
            .await?
            .ok_or_else(|| AppError::Internal(format!("Discussion {} vanished after insert", id)))
    }

    async fn create_operation(&self, new: &NewOperation) -> Result<Operation, AppError> {
        let id = uuid::Uuid::new_v4().to_string();

        // The scope comes from the parent when there is one, else from the discussion anchor.
        sqlx::query(
            r#"INSERT INTO operations (
                id, type, left_operand, right_operand, result, author_id,
                discussion_id, parent_operation_id, created_at, scope_discussion_id
            ) VALUES (
                ?, ?, ?, ?, ?, ?, ?, ?, ?,
                COALESCE((SELECT scope_discussion_id FROM operations WHERE id = ?), ?)
            )"#,
        )
        .bind(&id)
        .bind(new.op_type.as_str())
        .bind(new.left_operand)
        .bind(new.right_operand)
        .bind(new.result)
        .bind(&new.author_id)
        .bind(&new.discussion_id)
        .bind(&new.parent_operation_id)
        .bind(now())
        .bind(&new.parent_operation_id)
        .bind(&new.discussion_id)
        .execute(&self.pool)
        .await?;

        self.get_operation(&id)
            .await?
            .ok_or_else(|| AppError::Internal(format!("Operation {} vanished after insert", id)))
    }
}

// Helper functions for row conversion

fn now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn author_from_row(row: &SqliteRow, author_id: &str) -> Result<Option<AuthorSummary>, AppError> {
    let username: Option<String> = row.try_get("author_username")?;
    Ok(username.map(|username| AuthorSummary {
        id: author_id.to_string(),
        username,
    }))
}

fn discussion_from_row(row: &SqliteRow) -> Result<Discussion, AppError> {
    let author_id: String = row.try_get("author_id")?;
    Ok(Discussion {
        id: row.try_get("id")?,
        starting_number: row.try_get("starting_number")?,
        author: author_from_row(row, &author_id)?,
        author_id,
        created_at: row.try_get("created_at")?,
    })
}

fn operation_from_row(row: &SqliteRow) -> Result<Operation, AppError> {
    let author_id: String = row.try_get("author_id")?;
    let op_type: String = row.try_get("type")?;
    Ok(Operation {
        id: row.try_get("id")?,
        op_type: op_type.parse()?,
        left_operand: row.try_get("left_operand")?,
        right_operand: row.try_get("right_operand")?,
        result: row.try_get("result")?,
        author: author_from_row(row, &author_id)?,
        author_id,
        discussion_id: row.try_get("discussion_id")?,
        parent_operation_id: row.try_get("parent_operation_id")?,
        created_at: row.try_get("created_at")?,
    })
}

fn user_record_from_row(row: &SqliteRow) -> Result<UserRecord, AppError> {
    Ok(UserRecord {
        id: row.try_get("id")?,
        username: row.try_get("username")?,
        password_hash: row.try_get("password_hash")?,
    })
}
