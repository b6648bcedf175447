//! Database module for SQLite persistence.
//!
//! SQLite is the source of truth for users, discussions and operations.

mod repository;

pub use repository::*;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;

/// Initialize the database connection pool and run migrations.
pub async fn init_database(db_path: &Path) -> Result<SqlitePool, sqlx::Error> {
    // Ensure the parent directory exists
    if let Some(parent) = db_path.parent() {
        tokio::fs::create_dir_all(parent).await.ok();
    }

    let db_url = format!("sqlite:{}?mode=rwc", db_path.display());

    let options = SqliteConnectOptions::from_str(&db_url)?
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
        .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
        .busy_timeout(std::time::Duration::from_secs(30));

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    // Run embedded migrations
    run_migrations(&pool).await?;

    Ok(pool)
}

/// Run database migrations.
async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY,
            username TEXT NOT NULL UNIQUE,
            password_hash TEXT NOT NULL,
            created_at TEXT NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS discussions (
            id TEXT PRIMARY KEY,
            starting_number REAL NOT NULL,
            author_id TEXT NOT NULL,
            created_at TEXT NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await?;

    // scope_discussion_id: the discussion whose tree the operation belongs to.
    // Roots take it from discussion_id, children inherit it from their parent.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS operations (
            id TEXT PRIMARY KEY,
            type TEXT NOT NULL CHECK (type IN ('add', 'subtract', 'multiply', 'divide')),
            left_operand REAL NOT NULL,
            right_operand REAL NOT NULL,
            result REAL NOT NULL,
            author_id TEXT NOT NULL,
            discussion_id TEXT REFERENCES discussions(id),
            parent_operation_id TEXT REFERENCES operations(id),
            created_at TEXT NOT NULL,
            scope_discussion_id TEXT NOT NULL REFERENCES discussions(id)
        );
        "#,
    )
    .execute(pool)
    .await?;

    // Create indexes for common queries
    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_discussions_created_at ON discussions(created_at);
        CREATE INDEX IF NOT EXISTS idx_operations_scope ON operations(scope_discussion_id);
        CREATE INDEX IF NOT EXISTS idx_operations_parent ON operations(parent_operation_id);
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
