// SPDX-FileCopyrightText: 2026 Restock Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the SQLite task queue.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use restock_core::types::{
    CompletionResult, ExternalSession, MoveRequest, SessionStatus, Task, TaskOutcome, TaskStatus,
};
use restock_core::{SessionStore, TaskQueue};
use restock_storage::{Database, SqliteSessionStore, SqliteTaskQueue};
use tempfile::TempDir;

async fn setup() -> (SqliteTaskQueue, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let db = Database::open(dir.path().join("queue.db")).await.unwrap();
    (SqliteTaskQueue::new(db), dir)
}

fn task(user: &str, target: i64, priority: i64) -> Task {
    MoveRequest {
        user_id: user.into(),
        session_id: format!("session-{user}"),
        request_id: None,
        item: "168245517".into(),
        source_warehouse_id: 507,
        target_warehouse_id: target,
        quantity: 5,
        priority,
        max_attempts: 3,
    }
    .into_task()
    .unwrap()
}

#[tokio::test]
async fn higher_priority_is_claimed_first() {
    let (queue, _dir) = setup().await;
    let low = task("u1", 1, 5);
    let high = task("u2", 1, 10);
    queue.enqueue(&low).await.unwrap();
    queue.enqueue(&high).await.unwrap();

    let first = queue.claim().await.unwrap().unwrap();
    assert_eq!(first.id, high.id);
    assert_eq!(first.status, TaskStatus::Processing);
    assert_eq!(first.attempts, 1);
    assert!(first.started_at.is_some());

    let second = queue.claim().await.unwrap().unwrap();
    assert_eq!(second.id, low.id);
    assert!(queue.claim().await.unwrap().is_none());
}

#[tokio::test]
async fn equal_priority_claims_oldest_then_insertion_order() {
    let (queue, _dir) = setup().await;
    let mut newer = task("u1", 1, 0);
    let mut older = task("u1", 1, 0);
    older.created_at = Utc::now() - chrono::Duration::minutes(5);
    newer.created_at = Utc::now();
    queue.enqueue(&newer).await.unwrap();
    queue.enqueue(&older).await.unwrap();

    let same_instant = Utc::now() + chrono::Duration::minutes(1);
    let mut a = task("u2", 1, 0);
    let mut b = task("u2", 1, 0);
    a.created_at = same_instant;
    b.created_at = same_instant;
    queue.enqueue(&a).await.unwrap();
    queue.enqueue(&b).await.unwrap();

    let order: Vec<String> = [
        queue.claim().await.unwrap().unwrap().id,
        queue.claim().await.unwrap().unwrap().id,
        queue.claim().await.unwrap().unwrap().id,
        queue.claim().await.unwrap().unwrap().id,
    ]
    .into();
    assert_eq!(order, vec![older.id, newer.id, a.id, b.id]);
}

#[tokio::test]
async fn retryable_requeues_with_decayed_priority() {
    let (queue, _dir) = setup().await;
    let t = task("u1", 1, 0);
    queue.enqueue(&t).await.unwrap();
    let claimed = queue.claim().await.unwrap().unwrap();

    let result = queue
        .complete(
            &claimed.id,
            claimed.attempts,
            TaskOutcome::Retryable {
                error: "no quota".into(),
            },
        )
        .await
        .unwrap();
    assert_eq!(result, CompletionResult::Requeued { priority: -1 });

    let stored = queue.get(&t.id).await.unwrap().unwrap();
    assert_eq!(stored.status, TaskStatus::Pending);
    assert_eq!(stored.priority, -1);
    assert_eq!(stored.attempts, 1);
    assert!(stored.started_at.is_none());
    assert_eq!(stored.error_message.as_deref(), Some("no quota"));
}

#[tokio::test]
async fn exhausted_attempts_fail_instead_of_requeue() {
    let (queue, _dir) = setup().await;
    let t = task("u1", 1, 0);
    queue.enqueue(&t).await.unwrap();

    let mut last = CompletionResult::Stale;
    for _ in 0..3 {
        let claimed = queue.claim().await.unwrap().unwrap();
        last = queue
            .complete(
                &claimed.id,
                claimed.attempts,
                TaskOutcome::Retryable {
                    error: "no quota".into(),
                },
            )
            .await
            .unwrap();
    }
    assert_eq!(last, CompletionResult::Failed);
    let stored = queue.get(&t.id).await.unwrap().unwrap();
    assert_eq!(stored.status, TaskStatus::Failed);
    assert_eq!(stored.attempts, 3);
    assert!(queue.claim().await.unwrap().is_none());
}

#[tokio::test]
async fn success_is_terminal_and_immutable() {
    let (queue, _dir) = setup().await;
    let t = task("u1", 1, 0);
    queue.enqueue(&t).await.unwrap();
    let claimed = queue.claim().await.unwrap().unwrap();

    let done = queue
        .complete(
            &claimed.id,
            1,
            TaskOutcome::Succeeded {
                supply_id: Some("WB-GI-42".into()),
            },
        )
        .await
        .unwrap();
    assert_eq!(done, CompletionResult::Completed);

    let again = queue
        .complete(
            &claimed.id,
            1,
            TaskOutcome::Terminal {
                error: "late".into(),
            },
        )
        .await
        .unwrap();
    assert_eq!(again, CompletionResult::Stale);

    let stored = queue.get(&t.id).await.unwrap().unwrap();
    assert_eq!(stored.status, TaskStatus::Completed);
    assert_eq!(stored.supply_id.as_deref(), Some("WB-GI-42"));
    assert!(!queue.cancel(&t.id).await.unwrap());
}

#[tokio::test]
async fn completion_with_old_attempt_is_fenced_off() {
    let (queue, _dir) = setup().await;
    let t = task("u1", 1, 0);
    queue.enqueue(&t).await.unwrap();
    let first = queue.claim().await.unwrap().unwrap();
    tokio::time::sleep(Duration::from_millis(5)).await;

    // The first worker is presumed dead and the task is handed out again.
    let swept = queue.sweep_stale(Duration::ZERO).await.unwrap();
    assert_eq!(swept.len(), 1);
    let second = queue.claim().await.unwrap().unwrap();
    assert_eq!(second.attempts, 2);

    let late = queue
        .complete(
            &first.id,
            first.attempts,
            TaskOutcome::Succeeded {
                supply_id: Some("ghost".into()),
            },
        )
        .await
        .unwrap();
    assert_eq!(late, CompletionResult::Stale);
    let stored = queue.get(&t.id).await.unwrap().unwrap();
    assert_eq!(stored.status, TaskStatus::Processing);
    assert!(stored.supply_id.is_none());
}

#[tokio::test]
async fn sweep_requeues_each_stale_task_once() {
    let (queue, _dir) = setup().await;
    let stale = task("u1", 1, 0);
    queue.enqueue(&stale).await.unwrap();
    queue.claim().await.unwrap().unwrap();
    tokio::time::sleep(Duration::from_millis(5)).await;

    let swept = queue.sweep_stale(Duration::ZERO).await.unwrap();
    assert_eq!(swept.len(), 1);
    assert_eq!(swept[0].status, TaskStatus::Pending);
    assert_eq!(swept[0].attempts, 1);
    assert_eq!(swept[0].error_message.as_deref(), Some("worker timed out"));

    assert!(queue.sweep_stale(Duration::ZERO).await.unwrap().is_empty());
    let stored = queue.get(&stale.id).await.unwrap().unwrap();
    assert_eq!(stored.attempts, 1);
}

#[tokio::test]
async fn renewed_claim_restarts_the_stale_clock() {
    let (queue, _dir) = setup().await;
    let t = task("u1", 1, 0);
    queue.enqueue(&t).await.unwrap();
    let claimed = queue.claim().await.unwrap().unwrap();
    tokio::time::sleep(Duration::from_millis(300)).await;

    assert!(queue.renew_claim(&t.id, claimed.attempts).await.unwrap());
    let renewed = queue.get(&t.id).await.unwrap().unwrap();
    assert!(renewed.started_at > claimed.started_at);
    assert!(queue.sweep_stale(Duration::from_millis(200)).await.unwrap().is_empty());

    // Wrong attempt, then a swept claim: neither is current.
    assert!(!queue.renew_claim(&t.id, claimed.attempts + 1).await.unwrap());
    tokio::time::sleep(Duration::from_millis(5)).await;
    assert_eq!(queue.sweep_stale(Duration::ZERO).await.unwrap().len(), 1);
    assert!(!queue.renew_claim(&t.id, claimed.attempts).await.unwrap());
    assert_eq!(
        queue.get(&t.id).await.unwrap().unwrap().status,
        TaskStatus::Pending
    );
    assert!(!queue.renew_claim("missing", 1).await.unwrap());
}

#[tokio::test]
async fn sweep_ignores_fresh_claims() {
    let (queue, _dir) = setup().await;
    queue.enqueue(&task("u1", 1, 0)).await.unwrap();
    queue.claim().await.unwrap().unwrap();
    let swept = queue.sweep_stale(Duration::from_secs(600)).await.unwrap();
    assert!(swept.is_empty());
}

#[tokio::test]
async fn cancel_only_affects_pending() {
    let (queue, _dir) = setup().await;
    let pending = task("u1", 1, 0);
    let running = task("u1", 1, 10);
    queue.enqueue(&pending).await.unwrap();
    queue.enqueue(&running).await.unwrap();
    let claimed = queue.claim().await.unwrap().unwrap();
    assert_eq!(claimed.id, running.id);

    assert!(queue.cancel(&pending.id).await.unwrap());
    assert!(!queue.cancel(&running.id).await.unwrap());
    assert!(!queue.cancel("missing").await.unwrap());

    let stored = queue.get(&pending.id).await.unwrap().unwrap();
    assert_eq!(stored.status, TaskStatus::Cancelled);
    assert!(queue.claim().await.unwrap().is_none());
}

#[tokio::test]
async fn events_are_published_on_completion_and_cancel() {
    let (queue, _dir) = setup().await;
    let mut events = queue.subscribe();
    let a = task("u1", 1, 1);
    let b = task("u1", 1, 0);
    queue.enqueue(&a).await.unwrap();
    queue.enqueue(&b).await.unwrap();

    let claimed = queue.claim().await.unwrap().unwrap();
    queue
        .complete(
            &claimed.id,
            1,
            TaskOutcome::Terminal {
                error: "invalid article".into(),
            },
        )
        .await
        .unwrap();
    queue.cancel(&b.id).await.unwrap();

    let first = events.recv().await.unwrap();
    assert_eq!(first.task_id, a.id);
    assert_eq!(first.status, TaskStatus::Failed);
    assert_eq!(first.error_message.as_deref(), Some("invalid article"));
    let second = events.recv().await.unwrap();
    assert_eq!(second.task_id, b.id);
    assert_eq!(second.status, TaskStatus::Cancelled);
}

#[tokio::test]
async fn boost_raises_only_pending_tasks_for_warehouse() {
    let (queue, _dir) = setup().await;
    let waiting = task("u1", 117986, -2);
    let already_high = task("u1", 117986, 95);
    let elsewhere = task("u1", 507_000, -2);
    for t in [&waiting, &already_high, &elsewhere] {
        queue.enqueue(t).await.unwrap();
    }

    let boosted = queue.boost_waiting(117986, 90).await.unwrap();
    assert_eq!(boosted, 1);
    assert_eq!(queue.get(&waiting.id).await.unwrap().unwrap().priority, 90);
    assert_eq!(queue.get(&already_high.id).await.unwrap().unwrap().priority, 95);
    assert_eq!(queue.get(&elsewhere.id).await.unwrap().unwrap().priority, -2);
}

#[tokio::test]
async fn stats_and_listing() {
    let (queue, _dir) = setup().await;
    for p in 0..3 {
        queue.enqueue(&task("alice", 1, p)).await.unwrap();
    }
    queue.enqueue(&task("bob", 1, 0)).await.unwrap();
    queue.claim().await.unwrap().unwrap();

    let stats = queue.stats().await.unwrap();
    assert_eq!(stats.pending, 3);
    assert_eq!(stats.processing, 1);
    assert_eq!(stats.completed, 0);

    let alice = queue.list_for_user("alice", 10).await.unwrap();
    assert_eq!(alice.len(), 3);
    assert!(alice.iter().all(|t| t.user_id == "alice"));
    assert_eq!(queue.list_for_user("alice", 2).await.unwrap().len(), 2);
}

#[tokio::test]
async fn concurrent_claimers_never_share_a_task() {
    let (queue, _dir) = setup().await;
    let queue = Arc::new(queue);
    for p in 0..20 {
        queue.enqueue(&task("u1", 1, p)).await.unwrap();
    }

    let mut handles = Vec::new();
    for _ in 0..8 {
        let queue = Arc::clone(&queue);
        handles.push(tokio::spawn(async move {
            let mut mine = Vec::new();
            while let Some(t) = queue.claim().await.unwrap() {
                mine.push(t.id);
            }
            mine
        }));
    }

    let mut seen = HashSet::new();
    for handle in handles {
        for id in handle.await.unwrap() {
            assert!(seen.insert(id), "task claimed twice");
        }
    }
    assert_eq!(seen.len(), 20);
}

#[tokio::test]
async fn session_store_deactivates_without_touching_credentials() {
    let dir = tempfile::tempdir().unwrap();
    let db = Database::open(dir.path().join("sessions.db")).await.unwrap();
    let store = SqliteSessionStore::new(db);
    let session = ExternalSession {
        id: "sess-1".into(),
        user_id: "u1".into(),
        status: SessionStatus::Active,
        expires_at: Some(Utc::now() + chrono::Duration::days(1)),
        credentials: "{\"cookies\":[]}".into(),
    };
    store.upsert(&session).await.unwrap();

    let loaded = store.get_session("sess-1").await.unwrap().unwrap();
    assert!(loaded.is_usable(Utc::now()));

    store.deactivate_session("sess-1").await.unwrap();
    let loaded = store.get_session("sess-1").await.unwrap().unwrap();
    assert_eq!(loaded.status, SessionStatus::Expired);
    assert_eq!(loaded.credentials, session.credentials);

    assert!(store.get_session("nope").await.unwrap().is_none());
    assert!(store.deactivate_session("nope").await.is_err());
}
