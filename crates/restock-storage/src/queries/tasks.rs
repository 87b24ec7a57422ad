// SPDX-FileCopyrightText: 2026 Restock Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Task table operations: insert, atomic claim, fenced completion and sweeps.

use chrono::{DateTime, Utc};
use restock_core::types::{CompletionResult, Task, TaskOutcome, TaskStats, TaskStatus};
use restock_core::RestockError;
use rusqlite::{OptionalExtension, Row, Transaction, params};

use super::{format_ts, parse_enum, parse_opt_ts, parse_ts};
use crate::database::{Database, map_tr_err};

/// Error recorded on tasks recovered by the stale sweep.
pub const STALE_TASK_ERROR: &str = "worker timed out";

const TASK_COLUMNS: &str = "id, user_id, session_id, request_id, item, source_warehouse_id,
     target_warehouse_id, quantity, priority, status, attempts, max_attempts,
     error_message, supply_id, created_at, started_at, completed_at";

fn row_to_task(row: &Row<'_>) -> Result<Task, rusqlite::Error> {
    Ok(Task {
        id: row.get(0)?,
        user_id: row.get(1)?,
        session_id: row.get(2)?,
        request_id: row.get(3)?,
        item: row.get(4)?,
        source_warehouse_id: row.get(5)?,
        target_warehouse_id: row.get(6)?,
        quantity: row.get(7)?,
        priority: row.get(8)?,
        status: parse_enum(9, &row.get::<_, String>(9)?)?,
        attempts: row.get(10)?,
        max_attempts: row.get(11)?,
        error_message: row.get(12)?,
        supply_id: row.get(13)?,
        created_at: parse_ts(14, &row.get::<_, String>(14)?)?,
        started_at: parse_opt_ts(15, row.get(15)?)?,
        completed_at: parse_opt_ts(16, row.get(16)?)?,
    })
}

/// State a PROCESSING task moves to when `outcome` is recorded for it.
///
/// Pure; the caller is responsible for having checked the fencing token.
pub fn next_state(task: &Task, outcome: &TaskOutcome, now: DateTime<Utc>) -> (Task, CompletionResult) {
    let mut next = task.clone();
    let result = match outcome {
        TaskOutcome::Succeeded { supply_id } => {
            next.status = TaskStatus::Completed;
            next.supply_id = supply_id.clone();
            next.error_message = None;
            next.completed_at = Some(now);
            CompletionResult::Completed
        }
        TaskOutcome::Retryable { error } if task.has_attempts_left() => {
            next.status = TaskStatus::Pending;
            next.priority = task.priority - i64::from(task.attempts);
            next.error_message = Some(error.clone());
            next.started_at = None;
            CompletionResult::Requeued {
                priority: next.priority,
            }
        }
        TaskOutcome::Retryable { error } | TaskOutcome::Terminal { error } => {
            next.status = TaskStatus::Failed;
            next.error_message = Some(error.clone());
            next.completed_at = Some(now);
            CompletionResult::Failed
        }
    };
    (next, result)
}

fn write_state(tx: &Transaction<'_>, task: &Task) -> Result<(), rusqlite::Error> {
    tx.execute(
        "UPDATE tasks SET status = ?2, priority = ?3, attempts = ?4, error_message = ?5,
                supply_id = ?6, started_at = ?7, completed_at = ?8
         WHERE id = ?1",
        params![
            task.id,
            task.status.to_string(),
            task.priority,
            task.attempts,
            task.error_message,
            task.supply_id,
            task.started_at.map(format_ts),
            task.completed_at.map(format_ts),
        ],
    )?;
    Ok(())
}

fn select_task(tx: &Transaction<'_>, id: &str) -> Result<Option<Task>, rusqlite::Error> {
    tx.query_row(
        &format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?1"),
        params![id],
        row_to_task,
    )
    .optional()
}

/// Insert a new task row.
pub async fn insert_task(db: &Database, task: &Task) -> Result<(), RestockError> {
    let task = task.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO tasks (id, user_id, session_id, request_id, item,
                    source_warehouse_id, target_warehouse_id, quantity, priority, status,
                    attempts, max_attempts, error_message, supply_id, created_at,
                    started_at, completed_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)",
                params![
                    task.id,
                    task.user_id,
                    task.session_id,
                    task.request_id,
                    task.item,
                    task.source_warehouse_id,
                    task.target_warehouse_id,
                    task.quantity,
                    task.priority,
                    task.status.to_string(),
                    task.attempts,
                    task.max_attempts,
                    task.error_message,
                    task.supply_id,
                    format_ts(task.created_at),
                    task.started_at.map(format_ts),
                    task.completed_at.map(format_ts),
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Get a task by ID.
pub async fn get_task(db: &Database, id: &str) -> Result<Option<Task>, RestockError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                &format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?1"),
                params![id],
                row_to_task,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// Claim the most urgent pending task.
///
/// Selection and the PROCESSING update happen in one transaction on the
/// single writer thread, so concurrent claimers never share a task.
/// Ordering: priority DESC, created_at ASC, insertion order ASC.
pub async fn claim_next(db: &Database, now: DateTime<Utc>) -> Result<Option<Task>, RestockError> {
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction_with_behavior(rusqlite::TransactionBehavior::Immediate)?;

            let candidate = tx
                .query_row(
                    &format!(
                        "SELECT {TASK_COLUMNS} FROM tasks
                         WHERE status = 'pending'
                         ORDER BY priority DESC, created_at ASC, seq ASC
                         LIMIT 1"
                    ),
                    [],
                    row_to_task,
                )
                .optional()?;

            let Some(mut task) = candidate else {
                tx.commit()?;
                return Ok(None);
            };

            task.status = TaskStatus::Processing;
            task.attempts += 1;
            task.started_at = Some(now);
            write_state(&tx, &task)?;
            tx.commit()?;
            Ok(Some(task))
        })
        .await
        .map_err(map_tr_err)
}

/// Record the outcome of the claim numbered `attempt`.
///
/// Returns the new state alongside the result, or `None` with
/// [`CompletionResult::Stale`] when the task is not PROCESSING under that
/// attempt (already swept, reclaimed, or unknown).
pub async fn complete_task(
    db: &Database,
    task_id: &str,
    attempt: u32,
    outcome: TaskOutcome,
    now: DateTime<Utc>,
) -> Result<(CompletionResult, Option<Task>), RestockError> {
    let task_id = task_id.to_string();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction_with_behavior(rusqlite::TransactionBehavior::Immediate)?;
            let current = select_task(&tx, &task_id)?;
            let current = match current {
                Some(t) if t.status == TaskStatus::Processing && t.attempts == attempt => t,
                _ => {
                    tx.commit()?;
                    return Ok((CompletionResult::Stale, None));
                }
            };
            let (next, result) = next_state(&current, &outcome, now);
            write_state(&tx, &next)?;
            tx.commit()?;
            Ok((result, Some(next)))
        })
        .await
        .map_err(map_tr_err)
}

/// Move `started_at` of a claim to `now` if the task is still PROCESSING
/// under `attempt`. Returns whether the claim was current.
pub async fn renew_claim(
    db: &Database,
    task_id: &str,
    attempt: u32,
    now: DateTime<Utc>,
) -> Result<bool, RestockError> {
    let task_id = task_id.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE tasks SET started_at = ?3
                 WHERE id = ?1 AND status = 'processing' AND attempts = ?2",
                params![task_id, attempt, format_ts(now)],
            )
        })
        .await
        .map(|updated| updated == 1)
        .map_err(map_tr_err)
}

/// Cancel a task if it is still PENDING. Returns the cancelled task.
pub async fn cancel_pending(
    db: &Database,
    task_id: &str,
    now: DateTime<Utc>,
) -> Result<Option<Task>, RestockError> {
    let task_id = task_id.to_string();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction_with_behavior(rusqlite::TransactionBehavior::Immediate)?;
            let Some(mut task) = select_task(&tx, &task_id)? else {
                tx.commit()?;
                return Ok(None);
            };
            if task.status != TaskStatus::Pending {
                tx.commit()?;
                return Ok(None);
            }
            task.status = TaskStatus::Cancelled;
            task.completed_at = Some(now);
            write_state(&tx, &task)?;
            tx.commit()?;
            Ok(Some(task))
        })
        .await
        .map_err(map_tr_err)
}

/// Route every PROCESSING task started before `cutoff` through the
/// retryable failure path. Returns the tasks in their new state.
pub async fn sweep_stale(
    db: &Database,
    cutoff: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Result<Vec<Task>, RestockError> {
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction_with_behavior(rusqlite::TransactionBehavior::Immediate)?;
            let stale: Vec<Task> = {
                let mut stmt = tx.prepare(&format!(
                    "SELECT {TASK_COLUMNS} FROM tasks
                     WHERE status = 'processing' AND started_at < ?1
                     ORDER BY started_at ASC"
                ))?;
                let rows = stmt.query_map(params![format_ts(cutoff)], row_to_task)?;
                rows.collect::<Result<_, _>>()?
            };

            let outcome = TaskOutcome::Retryable {
                error: STALE_TASK_ERROR.to_string(),
            };
            let mut swept = Vec::with_capacity(stale.len());
            for task in &stale {
                let (next, _) = next_state(task, &outcome, now);
                write_state(&tx, &next)?;
                swept.push(next);
            }
            tx.commit()?;
            Ok(swept)
        })
        .await
        .map_err(map_tr_err)
}

/// Most recent tasks of one user, newest first.
pub async fn list_for_user(
    db: &Database,
    user_id: &str,
    limit: usize,
) -> Result<Vec<Task>, RestockError> {
    let user_id = user_id.to_string();
    let limit = i64::try_from(limit).unwrap_or(i64::MAX);
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {TASK_COLUMNS} FROM tasks
                 WHERE user_id = ?1
                 ORDER BY created_at DESC, seq DESC
                 LIMIT ?2"
            ))?;
            let rows = stmt.query_map(params![user_id, limit], row_to_task)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

/// Task counts by status.
pub async fn count_by_status(db: &Database) -> Result<TaskStats, RestockError> {
    db.connection()
        .call(|conn| {
            let mut stmt = conn.prepare("SELECT status, COUNT(*) FROM tasks GROUP BY status")?;
            let rows = stmt.query_map([], |row| {
                let status: TaskStatus = parse_enum(0, &row.get::<_, String>(0)?)?;
                let count: i64 = row.get(1)?;
                Ok((status, count as u64))
            })?;
            let mut stats = TaskStats::default();
            for row in rows {
                let (status, count) = row?;
                match status {
                    TaskStatus::Pending => stats.pending = count,
                    TaskStatus::Processing => stats.processing = count,
                    TaskStatus::Completed => stats.completed = count,
                    TaskStatus::Failed => stats.failed = count,
                    TaskStatus::Cancelled => stats.cancelled = count,
                }
            }
            Ok(stats)
        })
        .await
        .map_err(map_tr_err)
}

/// Raise pending tasks targeting `warehouse_id` to at least `priority`.
pub async fn boost_pending_for_warehouse(
    db: &Database,
    warehouse_id: i64,
    priority: i64,
) -> Result<usize, RestockError> {
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE tasks SET priority = ?2
                 WHERE status = 'pending' AND target_warehouse_id = ?1 AND priority < ?2",
                params![warehouse_id, priority],
            )
        })
        .await
        .map_err(map_tr_err)
}
