// SPDX-FileCopyrightText: 2026 Restock Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup, WAL mode, and lifecycle.
//!
//! All statements are serialized through tokio-rusqlite's single background
//! thread. `Database` is a cheap handle; clone it instead of opening a second
//! connection for writes.

use std::path::Path;

use restock_config::model::StorageConfig;
use restock_core::RestockError;
use tracing::{debug, info};

use crate::migrations;

/// Handle to the single-writer SQLite connection.
#[derive(Clone)]
pub struct Database {
    conn: tokio_rusqlite::Connection,
}

impl Database {
    /// Open (or create) the database at `path` in WAL mode and apply migrations.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, RestockError> {
        Self::open_with(path, true).await
    }

    /// Open the database described by the `[storage]` config section.
    pub async fn from_config(config: &StorageConfig) -> Result<Self, RestockError> {
        Self::open_with(&config.database_path, config.wal_mode).await
    }

    /// Private in-memory database, used by tests and dry runs.
    pub async fn open_in_memory() -> Result<Self, RestockError> {
        let conn = tokio_rusqlite::Connection::open_in_memory()
            .await
            .map_err(map_open_err)?;
        let db = Self { conn };
        db.prepare(false).await?;
        Ok(db)
    }

    async fn open_with(path: impl AsRef<Path>, wal_mode: bool) -> Result<Self, RestockError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| RestockError::Storage {
                source: Box::new(e),
            })?;
        }
        let conn = tokio_rusqlite::Connection::open(path)
            .await
            .map_err(map_open_err)?;
        let db = Self { conn };
        db.prepare(wal_mode).await?;
        info!(path = %path.display(), wal_mode, "database opened");
        Ok(db)
    }

    async fn prepare(&self, wal_mode: bool) -> Result<(), RestockError> {
        self.conn
            .call(move |conn| {
                let journal = if wal_mode { "WAL" } else { "DELETE" };
                conn.execute_batch(&format!(
                    "PRAGMA journal_mode = {journal};
                     PRAGMA synchronous = NORMAL;
                     PRAGMA busy_timeout = 5000;
                     PRAGMA foreign_keys = ON;"
                ))
                .map_err(|e| RestockError::Storage {
                    source: Box::new(e),
                })?;
                migrations::run_migrations(conn)
            })
            .await
            .map_err(|e| match e {
                tokio_rusqlite::Error::Error(inner) => inner,
                other => RestockError::Storage {
                    source: other.to_string().into(),
                },
            })
    }

    /// The underlying async connection.
    pub fn connection(&self) -> &tokio_rusqlite::Connection {
        &self.conn
    }

    /// Checkpoint the WAL and close the connection.
    pub async fn close(self) -> Result<(), RestockError> {
        self.conn
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        debug!("WAL checkpoint complete");
        self.conn.close().await.map_err(map_tr_err)
    }
}

fn map_open_err(e: rusqlite::Error) -> RestockError {
    RestockError::Storage {
        source: Box::new(e),
    }
}

/// Map a tokio-rusqlite error onto [`RestockError::Storage`].
pub fn map_tr_err(e: tokio_rusqlite::Error<rusqlite::Error>) -> RestockError {
    RestockError::Storage {
        source: Box::new(e),
    }
}
