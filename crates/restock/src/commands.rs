// SPDX-FileCopyrightText: 2026 Restock Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Operator subcommands over the service database.

use restock_config::RestockConfig;
use restock_core::types::{MoveRequest, Task};
use restock_core::{RestockError, TaskQueue};
use restock_ledger::BalanceLedger;
use restock_storage::{Database, SqliteTaskQueue};

async fn open_queue(config: &RestockConfig) -> Result<SqliteTaskQueue, RestockError> {
    Ok(SqliteTaskQueue::new(Database::from_config(&config.storage).await?))
}

async fn open_ledger(config: &RestockConfig) -> Result<BalanceLedger, RestockError> {
    Ok(BalanceLedger::new(Database::from_config(&config.storage).await?))
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String, RestockError> {
    serde_json::to_string_pretty(value)
        .map_err(|e| RestockError::Internal(format!("failed to render JSON: {e}")))
}

fn print_task(task: &Task) {
    println!("{}  {}", task.id, task.status);
    println!(
        "  move      {} x {}  {} -> {}",
        task.quantity, task.item, task.source_warehouse_id, task.target_warehouse_id
    );
    println!("  user      {}  session {}", task.user_id, task.session_id);
    println!(
        "  priority  {}  attempts {}/{}",
        task.priority, task.attempts, task.max_attempts
    );
    if let Some(supply_id) = &task.supply_id {
        println!("  supply    {supply_id}");
    }
    if let Some(error) = &task.error_message {
        println!("  error     {error}");
    }
}

/// `restock enqueue`: validate and store a move request.
pub async fn run_enqueue(
    config: &RestockConfig,
    request: MoveRequest,
    json: bool,
) -> Result<Task, RestockError> {
    let task = request.into_task()?;
    open_queue(config).await?.enqueue(&task).await?;
    if json {
        println!("{}", to_json(&task)?);
    } else {
        println!("enqueued {}", task.id);
    }
    Ok(task)
}

/// `restock status`: one task by id, or the latest tasks of a user.
pub async fn run_status(
    config: &RestockConfig,
    task_id: Option<&str>,
    user_id: Option<&str>,
    limit: usize,
    json: bool,
) -> Result<(), RestockError> {
    let queue = open_queue(config).await?;
    let tasks = match (task_id, user_id) {
        (Some(id), _) => vec![
            queue
                .get(id)
                .await?
                .ok_or_else(|| RestockError::task_not_found(id))?,
        ],
        (None, Some(user)) => queue.list_for_user(user, limit).await?,
        (None, None) => {
            return Err(RestockError::Validation(
                "pass a task id or --user".to_string(),
            ));
        }
    };

    if json {
        println!("{}", to_json(&tasks)?);
    } else if tasks.is_empty() {
        println!("no tasks");
    } else {
        for task in &tasks {
            print_task(task);
        }
    }
    Ok(())
}

/// `restock cancel`: only tasks that were not claimed yet can be cancelled.
pub async fn run_cancel(config: &RestockConfig, task_id: &str) -> Result<(), RestockError> {
    let queue = open_queue(config).await?;
    if queue.cancel(task_id).await? {
        println!("cancelled {task_id}");
        return Ok(());
    }
    match queue.get(task_id).await? {
        Some(task) => Err(RestockError::Validation(format!(
            "task {task_id} is {} and can no longer be cancelled",
            task.status
        ))),
        None => Err(RestockError::task_not_found(task_id)),
    }
}

/// `restock credit`: top up a balance.
pub async fn run_credit(
    config: &RestockConfig,
    user_id: &str,
    amount: i64,
    reference: Option<String>,
) -> Result<i64, RestockError> {
    let reference = reference.unwrap_or_else(|| format!("manual-{}", uuid::Uuid::new_v4()));
    let balance = open_ledger(config)
        .await?
        .credit(user_id, amount, &reference)
        .await?;
    println!("balance of {user_id}: {balance}");
    Ok(balance)
}

/// `restock balance`.
pub async fn run_balance(
    config: &RestockConfig,
    user_id: &str,
    json: bool,
) -> Result<(), RestockError> {
    let account = open_ledger(config).await?.account(user_id).await?;
    if json {
        println!("{}", to_json(&account)?);
    } else {
        println!(
            "{}: balance {}, spent {}",
            account.user_id, account.balance, account.total_spent
        );
    }
    Ok(())
}

/// `restock stats`.
pub async fn run_stats(config: &RestockConfig, json: bool) -> Result<(), RestockError> {
    let stats = open_queue(config).await?.stats().await?;
    if json {
        println!("{}", to_json(&stats)?);
    } else {
        println!("pending     {}", stats.pending);
        println!("processing  {}", stats.processing);
        println!("completed   {}", stats.completed);
        println!("failed      {}", stats.failed);
        println!("cancelled   {}", stats.cancelled);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use restock_config::model::StorageConfig;
    use restock_core::types::TaskStatus;

    fn config(dir: &tempfile::TempDir) -> RestockConfig {
        RestockConfig {
            storage: StorageConfig {
                database_path: dir.path().join("restock.db").to_string_lossy().into_owned(),
                wal_mode: true,
            },
            ..RestockConfig::default()
        }
    }

    fn request() -> MoveRequest {
        MoveRequest {
            user_id: "42".into(),
            session_id: "s1".into(),
            request_id: Some("req-7".into()),
            item: "168245517".into(),
            source_warehouse_id: 507,
            target_warehouse_id: 117986,
            quantity: 3,
            priority: 2,
            max_attempts: 3,
        }
    }

    #[tokio::test]
    async fn enqueue_then_cancel() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(&dir);

        let task = run_enqueue(&config, request(), false).await.unwrap();
        run_status(&config, Some(&task.id), None, 10, true).await.unwrap();
        run_cancel(&config, &task.id).await.unwrap();

        let stored = open_queue(&config).await.unwrap().get(&task.id).await.unwrap().unwrap();
        assert_eq!(stored.status, TaskStatus::Cancelled);

        // Cancelling twice explains why it cannot.
        let err = run_cancel(&config, &task.id).await.unwrap_err();
        assert!(err.to_string().contains("cancelled"), "got: {err}");
    }

    #[tokio::test]
    async fn invalid_request_is_not_enqueued() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(&dir);
        let mut bad = request();
        bad.quantity = 0;

        assert!(matches!(
            run_enqueue(&config, bad, false).await,
            Err(RestockError::Validation(_))
        ));
        let stats = open_queue(&config).await.unwrap().stats().await.unwrap();
        assert_eq!(stats.pending, 0);
    }

    #[tokio::test]
    async fn credit_is_idempotent_on_reference() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(&dir);

        assert_eq!(run_credit(&config, "42", 100, Some("pay-1".into())).await.unwrap(), 100);
        assert_eq!(run_credit(&config, "42", 100, Some("pay-1".into())).await.unwrap(), 100);
        assert_eq!(run_credit(&config, "42", 25, None).await.unwrap(), 125);
        run_balance(&config, "42", false).await.unwrap();
    }

    #[tokio::test]
    async fn status_of_unknown_task_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(&dir);
        let err = run_status(&config, Some("nope"), None, 10, false)
            .await
            .unwrap_err();
        assert!(matches!(err, RestockError::NotFound { .. }));
        run_stats(&config, true).await.unwrap();
    }
}
