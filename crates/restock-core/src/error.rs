// SPDX-FileCopyrightText: 2026 Restock Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Restock move pipeline.

use thiserror::Error;

/// The primary error type used across Restock traits and core operations.
///
/// Expected business outcomes (no quota, expired session, insufficient funds)
/// are NOT errors; they travel as typed values. This enum covers the
/// infrastructure failures around them.
#[derive(Debug, Error)]
pub enum RestockError {
    /// Configuration errors (invalid TOML, missing required fields, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database connection, query failure, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Marketplace API gateway errors that escaped the gateway's own classification.
    #[error("gateway error: {message}")]
    Gateway {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A move request failed validation before it reached the queue.
    #[error("invalid move request: {0}")]
    Validation(String),

    /// A referenced entity (task, session, account) does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// Notifier delivery failure.
    #[error("notifier error: {message}")]
    Notifier {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl RestockError {
    /// Shorthand for a task lookup miss.
    pub fn task_not_found(id: impl Into<String>) -> Self {
        Self::NotFound {
            entity: "task",
            id: id.into(),
        }
    }
}
