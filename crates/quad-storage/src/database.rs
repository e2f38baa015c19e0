// SPDX-FileCopyrightText: 2026 Quad Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup, WAL mode, and lifecycle.
//!
//! All writes are serialized through tokio-rusqlite's single background thread.
//! Query modules accept `&Database` and call through `connection().call()`.
//! Do NOT create additional Connection instances for writes.

use chrono::{DateTime, SecondsFormat, Utc};
use quad_core::QuadError;
use tracing::debug;

use crate::migrations;

/// Handle to the single SQLite writer connection.
#[derive(Clone)]
pub struct Database {
    conn: tokio_rusqlite::Connection,
}

impl Database {
    /// Opens (creating if needed) the database at `path` with WAL mode and
    /// runs pending migrations.
    pub async fn open(path: &str) -> Result<Self, QuadError> {
        Self::open_with(path, true).await
    }

    /// Opens the database, choosing whether to enable WAL mode.
    pub async fn open_with(path: &str, wal_mode: bool) -> Result<Self, QuadError> {
        if let Some(parent) = std::path::Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(QuadError::persistence)?;
            }
        }
        let conn = tokio_rusqlite::Connection::open(path)
            .await
            .map_err(|e| QuadError::PersistenceFailure {
                source: Box::new(e),
            })?;
        let db = Self { conn };
        db.prepare(wal_mode).await?;
        debug!(path, wal_mode, "database opened");
        Ok(db)
    }

    /// Opens a private in-memory database with the full schema.
    pub async fn open_in_memory() -> Result<Self, QuadError> {
        let conn = tokio_rusqlite::Connection::open_in_memory()
            .await
            .map_err(|e| QuadError::PersistenceFailure {
                source: Box::new(e),
            })?;
        let db = Self { conn };
        db.prepare(false).await?;
        Ok(db)
    }

    async fn prepare(&self, wal_mode: bool) -> Result<(), QuadError> {
        self.conn
            .call(move |conn| -> Result<Result<(), QuadError>, rusqlite::Error> {
                conn.execute_batch("PRAGMA foreign_keys = ON; PRAGMA busy_timeout = 5000;")?;
                if wal_mode {
                    conn.query_row("PRAGMA journal_mode = WAL", [], |_| Ok(()))?;
                }
                Ok(migrations::run_migrations(conn))
            })
            .await
            .map_err(map_tr_err)?
    }

    /// The underlying connection.
    pub fn connection(&self) -> &tokio_rusqlite::Connection {
        &self.conn
    }

    /// Checkpoints the WAL so the main file is self-contained.
    pub async fn close(&self) -> Result<(), QuadError> {
        self.conn
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.query_row("PRAGMA wal_checkpoint(TRUNCATE)", [], |_| Ok(()))?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        debug!("WAL checkpoint complete");
        Ok(())
    }
}

/// Convert a tokio-rusqlite error into `QuadError::PersistenceFailure`.
pub fn map_tr_err(e: tokio_rusqlite::Error<rusqlite::Error>) -> QuadError {
    QuadError::PersistenceFailure {
        source: Box::new(e),
    }
}

/// Fixed-width timestamp form so text ordering matches time ordering.
pub(crate) fn format_ts(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

/// Reads a timestamp column written by [`format_ts`].
pub(crate) fn parse_ts(row: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
        })
}

/// Reads a text column holding a `FromStr` enum.
pub(crate) fn parse_enum<T>(row: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw: String = row.get(idx)?;
    raw.parse::<T>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}
