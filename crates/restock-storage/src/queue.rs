// SPDX-FileCopyrightText: 2026 Restock Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite-backed implementation of the [`TaskQueue`] trait.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use restock_core::types::{CompletionResult, Task, TaskEvent, TaskOutcome, TaskStats, TaskStatus};
use restock_core::{RestockError, TaskQueue};

use crate::database::Database;
use crate::queries::tasks;

const EVENT_CAPACITY: usize = 256;

/// Durable priority queue over the `tasks` table.
///
/// Every completion, cancellation and sweep publishes a [`TaskEvent`] to
/// subscribers. Events are dropped when nobody listens.
pub struct SqliteTaskQueue {
    db: Database,
    events: broadcast::Sender<TaskEvent>,
}

impl SqliteTaskQueue {
    pub fn new(db: Database) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self { db, events }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    fn publish(&self, task: &Task) {
        let event = TaskEvent {
            task_id: task.id.clone(),
            user_id: task.user_id.clone(),
            status: task.status,
            attempts: task.attempts,
            error_message: task.error_message.clone(),
        };
        // No receivers is fine.
        let _ = self.events.send(event);
    }
}

#[async_trait]
impl TaskQueue for SqliteTaskQueue {
    async fn enqueue(&self, task: &Task) -> Result<(), RestockError> {
        tasks::insert_task(&self.db, task).await?;
        metrics::counter!("restock_tasks_enqueued_total").increment(1);
        debug!(task_id = %task.id, priority = task.priority, "task enqueued");
        Ok(())
    }

    async fn claim(&self) -> Result<Option<Task>, RestockError> {
        let claimed = tasks::claim_next(&self.db, Utc::now()).await?;
        if let Some(task) = &claimed {
            metrics::counter!("restock_tasks_claimed_total").increment(1);
            debug!(task_id = %task.id, attempt = task.attempts, "task claimed");
        }
        Ok(claimed)
    }

    async fn complete(
        &self,
        task_id: &str,
        attempt: u32,
        outcome: TaskOutcome,
    ) -> Result<CompletionResult, RestockError> {
        let (result, task) =
            tasks::complete_task(&self.db, task_id, attempt, outcome, Utc::now()).await?;
        match (&result, task) {
            (CompletionResult::Stale, _) | (_, None) => {
                warn!(task_id, attempt, "stale completion rejected");
                metrics::counter!("restock_stale_completions_total").increment(1);
            }
            (_, Some(task)) => {
                let label = match task.status {
                    TaskStatus::Completed => "completed",
                    TaskStatus::Pending => "requeued",
                    _ => "failed",
                };
                metrics::counter!("restock_tasks_finished_total", "result" => label).increment(1);
                info!(task_id, attempt, status = %task.status, "task completion recorded");
                self.publish(&task);
            }
        }
        Ok(result)
    }

    async fn renew_claim(&self, task_id: &str, attempt: u32) -> Result<bool, RestockError> {
        let current = tasks::renew_claim(&self.db, task_id, attempt, Utc::now()).await?;
        if !current {
            debug!(task_id, attempt, "claim no longer current");
        }
        Ok(current)
    }

    async fn cancel(&self, task_id: &str) -> Result<bool, RestockError> {
        match tasks::cancel_pending(&self.db, task_id, Utc::now()).await? {
            Some(task) => {
                info!(task_id, "task cancelled");
                self.publish(&task);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn sweep_stale(&self, timeout: Duration) -> Result<Vec<Task>, RestockError> {
        let now = Utc::now();
        let timeout = chrono::Duration::from_std(timeout)
            .map_err(|e| RestockError::Internal(format!("sweep timeout out of range: {e}")))?;
        let swept = tasks::sweep_stale(&self.db, now - timeout, now).await?;
        for task in &swept {
            warn!(task_id = %task.id, attempt = task.attempts, status = %task.status, "stale task swept");
            self.publish(task);
        }
        if !swept.is_empty() {
            metrics::counter!("restock_tasks_swept_total").increment(swept.len() as u64);
        }
        Ok(swept)
    }

    async fn get(&self, task_id: &str) -> Result<Option<Task>, RestockError> {
        tasks::get_task(&self.db, task_id).await
    }

    async fn list_for_user(&self, user_id: &str, limit: usize) -> Result<Vec<Task>, RestockError> {
        tasks::list_for_user(&self.db, user_id, limit).await
    }

    async fn stats(&self) -> Result<TaskStats, RestockError> {
        tasks::count_by_status(&self.db).await
    }

    async fn boost_waiting(&self, warehouse_id: i64, priority: i64) -> Result<usize, RestockError> {
        let boosted = tasks::boost_pending_for_warehouse(&self.db, warehouse_id, priority).await?;
        if boosted > 0 {
            info!(warehouse_id, priority, boosted, "boosted waiting tasks");
        }
        Ok(boosted)
    }

    fn subscribe(&self) -> broadcast::Receiver<TaskEvent> {
        self.events.subscribe()
    }
}
