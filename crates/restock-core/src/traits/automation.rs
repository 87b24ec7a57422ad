// SPDX-FileCopyrightText: 2026 Restock Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Automation collaborator that drives the marketplace UI.

use async_trait::async_trait;

use crate::types::{ExternalSession, MoveOutcome, Task};

/// Performs one move attempt against the marketplace.
///
/// Implementations never fail with an error: transport problems, timeouts and
/// unrecognised responses are reported as [`MoveOutcome::Error`].
#[async_trait]
pub trait MoveAutomation: Send + Sync + 'static {
    /// Human-readable name of this implementation, for logs.
    fn name(&self) -> &str;

    /// Attempt to move `task.quantity` of `task.item` from the source to the
    /// target warehouse using the given session.
    async fn attempt_move(&self, session: &ExternalSession, task: &Task) -> MoveOutcome;
}
