//! Database schema migrations.
//!
//! Called during database initialization to ensure the schema is up to date.
//! The documents table is the durable contract for status reporting; fields
//! and constraints here must survive restarts unchanged.

use rusqlite::Connection;

use crate::error::{DatabaseError, ServiceResult};

pub(super) fn run_migrations(conn: &Connection) -> ServiceResult<()> {
    conn.execute_batch(
        r#"
        -- Documents table: one row per (original_name, version)
        CREATE TABLE IF NOT EXISTS documents (
            id TEXT PRIMARY KEY,
            original_name TEXT NOT NULL,
            source_key TEXT NOT NULL,
            destination_key TEXT,
            content_fingerprint TEXT NOT NULL,
            version INTEGER NOT NULL,
            status TEXT NOT NULL DEFAULT 'queued',
            error TEXT,
            attempt_count INTEGER NOT NULL DEFAULT 0,
            not_before TEXT,
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at TEXT NOT NULL DEFAULT (datetime('now')),
            UNIQUE (original_name, version)
        );

        CREATE INDEX IF NOT EXISTS idx_documents_name ON documents(original_name);
        CREATE INDEX IF NOT EXISTS idx_documents_status ON documents(status);
        "#,
    )
    .map_err(|e| DatabaseError::Migration {
        message: e.to_string(),
    })?;

    Ok(())
}
