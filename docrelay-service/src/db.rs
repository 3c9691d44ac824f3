//! Database module for SQLite operations.
//!
//! Provides the `Database` struct that owns the single serialized connection.
//! All mutation of document state goes through the conditional operations in
//! `documents`; the connection mutex plus the conditional `WHERE status = ?`
//! writes are the only synchronization primitives in the design.

mod documents;
mod migrations;
pub mod models;

pub use documents::{StatusCount, TransitionFields};
pub use models::{Document, DocumentStatus};

use rusqlite::Connection;
use std::path::Path;
use std::sync::Mutex;

use crate::error::{DatabaseError, ServiceError, ServiceResult};

/// Database manager for SQLite operations
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open or create the database at the given path
    pub fn open(path: &Path) -> ServiceResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                ServiceError::Database(DatabaseError::Connection(
                    rusqlite::Error::ToSqlConversionFailure(Box::new(e)),
                ))
            })?;
        }

        let conn = Connection::open(path).map_err(DatabaseError::Connection)?;

        // WAL mode for better read concurrency while a worker writes
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")
            .map_err(DatabaseError::Query)?;

        migrations::run_migrations(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}
