// SPDX-FileCopyrightText: 2026 Restock Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Durable priority task queue.

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::error::RestockError;
use crate::types::{CompletionResult, Task, TaskEvent, TaskOutcome, TaskStats};

/// Durable priority queue of move tasks.
///
/// The only coordination point between workers: [`claim`](TaskQueue::claim)
/// must hand any pending task to at most one caller.
#[async_trait]
pub trait TaskQueue: Send + Sync + 'static {
    /// Store a new pending task.
    async fn enqueue(&self, task: &Task) -> Result<(), RestockError>;

    /// Atomically take the highest-priority pending task and mark it
    /// processing (`attempts += 1`, `started_at = now`).
    async fn claim(&self) -> Result<Option<Task>, RestockError>;

    /// Record the outcome of the attempt numbered `attempt`.
    ///
    /// `attempt` fences the claim: if the task is no longer processing under
    /// that attempt the call returns [`CompletionResult::Stale`].
    async fn complete(
        &self,
        task_id: &str,
        attempt: u32,
        outcome: TaskOutcome,
    ) -> Result<CompletionResult, RestockError>;

    /// Confirm that the claim numbered `attempt` is still current and restart
    /// its stale clock (`started_at = now`). Returns `false` when the task
    /// was swept or completed since.
    async fn renew_claim(&self, task_id: &str, attempt: u32) -> Result<bool, RestockError>;

    /// Cancel a task that has not been claimed yet. Returns `false` if the
    /// task is unknown or no longer pending.
    async fn cancel(&self, task_id: &str) -> Result<bool, RestockError>;

    /// Route every task processing for longer than `timeout` through the
    /// retryable failure path. Returns the swept tasks in their new state;
    /// `attempts` still names the abandoned attempt.
    async fn sweep_stale(&self, timeout: Duration) -> Result<Vec<Task>, RestockError>;

    async fn get(&self, task_id: &str) -> Result<Option<Task>, RestockError>;

    /// Most recent tasks of a user, newest first.
    async fn list_for_user(&self, user_id: &str, limit: usize)
    -> Result<Vec<Task>, RestockError>;

    async fn stats(&self) -> Result<TaskStats, RestockError>;

    /// Raise pending tasks targeting `warehouse_id` to at least `priority`.
    /// Returns how many tasks changed.
    async fn boost_waiting(&self, warehouse_id: i64, priority: i64)
    -> Result<usize, RestockError>;

    /// Subscribe to result events.
    fn subscribe(&self) -> broadcast::Receiver<TaskEvent>;
}
