// SPDX-FileCopyrightText: 2026 Restock Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Restock move pipeline.
//!
//! This crate provides the task model, the error type, and the trait seams
//! (queue, sessions, automation, notifier) shared by every other crate in
//! the workspace.

pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::RestockError;
pub use types::{
    CompletionResult, ExternalSession, MoveOutcome, MoveRequest, OutcomeCode, SessionStatus,
    Task, TaskEvent, TaskOutcome, TaskStats, TaskStatus,
};

pub use traits::{MoveAutomation, Notifier, SessionStore, TaskQueue};
