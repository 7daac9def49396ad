//! Storage module for the relational store
//!
//! This module handles all database operations of the pipeline:
//! - SQLite database opening and drop-and-recreate schema management
//! - One transaction per insert phase, rolled back on the first error
//! - Synthetic book-author and quote-source assignment
//! - Row counts for reporting

mod schema;
mod sqlite;

pub use schema::TABLES;
pub use sqlite::{InsertedQuote, SqliteStore};

use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("SQLite error: {0}")]
    Sqlite(rusqlite::Error),

    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("Unknown table: {0}")]
    UnknownTable(String),
}

impl From<rusqlite::Error> for StorageError {
    fn from(error: rusqlite::Error) -> Self {
        match &error {
            rusqlite::Error::SqliteFailure(code, _)
                if code.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Self::ConstraintViolation(error.to_string())
            }
            _ => Self::Sqlite(error),
        }
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;
