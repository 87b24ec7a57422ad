// SPDX-FileCopyrightText: 2026 Restock Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence layer for Restock.
//!
//! WAL-mode SQLite with embedded migrations and a single-writer connection
//! via `tokio-rusqlite`. Hosts the durable priority task queue and the
//! external session table; the ledger crate shares the same [`Database`].

pub mod database;
pub mod migrations;
pub mod queries;
pub mod queue;
pub mod sessions;

pub use database::{Database, map_tr_err};
pub use queue::SqliteTaskQueue;
pub use sessions::SqliteSessionStore;
