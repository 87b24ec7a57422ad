// SPDX-FileCopyrightText: 2026 Restock Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end tests for the complete move pipeline.
//!
//! Each test builds an isolated TestHarness with a temp SQLite database and
//! mock collaborators. Tests are independent and order-insensitive.

use std::time::Duration;

use restock_core::types::{CompletionResult, MoveOutcome, TaskStatus};
use restock_core::TaskQueue;
use restock_ledger::LedgerEntryKind;
use restock_test_utils::TestHarness;
use restock_worker::WorkerPool;
use tokio_util::sync::CancellationToken;

// ---- Priority ordering through the executor ----

#[tokio::test]
async fn higher_priority_task_is_executed_first() {
    let harness = TestHarness::builder().build().await.unwrap();
    harness.add_session("s1", "u1").await.unwrap();
    harness.credit("u1", 500).await.unwrap();

    let mut low = TestHarness::request("u1", "s1");
    low.priority = 5;
    let low = harness.enqueue(low).await.unwrap();
    let mut high = TestHarness::request("u1", "s1");
    high.priority = 10;
    let high = harness.enqueue(high).await.unwrap();

    let reports = harness.run_until_idle().await.unwrap();
    let order: Vec<_> = reports.iter().map(|r| r.task_id.clone()).collect();
    assert_eq!(order, vec![high.id, low.id]);
}

// ---- Money invariant across every outcome ----

#[tokio::test]
async fn only_successful_moves_cost_money() {
    let outcomes = vec![
        MoveOutcome::Success {
            supply_id: "WB-1".into(),
        },
        MoveOutcome::InvalidQuantity { diagnostic: None },
        MoveOutcome::InvalidArticle { diagnostic: None },
        MoveOutcome::Error { diagnostic: None },
        // The fourth task: ERROR, NO_QUOTA, then success on its last attempt.
        MoveOutcome::NoQuota { diagnostic: None },
        MoveOutcome::Success {
            supply_id: "WB-2".into(),
        },
    ];
    let harness = TestHarness::builder()
        .with_outcomes(outcomes)
        .build()
        .await
        .unwrap();
    harness.add_session("s1", "u1").await.unwrap();
    harness.credit("u1", 1_000).await.unwrap();

    let mut tasks = Vec::new();
    for _ in 0..4 {
        tasks.push(harness.enqueue(TestHarness::request("u1", "s1")).await.unwrap());
    }
    harness.run_until_idle().await.unwrap();

    let mut completed = 0;
    for task in &tasks {
        let stored = harness.task(&task.id).await.unwrap();
        assert!(stored.status.is_terminal(), "{} still {}", stored.id, stored.status);

        let entries = harness.ledger.entries_for_task(&task.id).await.unwrap();
        let net: i64 = entries
            .iter()
            .map(|e| match e.kind {
                LedgerEntryKind::Charge => e.amount,
                LedgerEntryKind::Refund => -e.amount,
                LedgerEntryKind::Credit => 0,
            })
            .sum();
        if stored.status == TaskStatus::Completed {
            completed += 1;
            assert_eq!(net, 50);
        } else {
            assert_eq!(net, 0);
        }
    }
    assert_eq!(completed, 2);
    assert_eq!(harness.ledger.balance("u1").await.unwrap(), 900);

    let account = harness.ledger.account("u1").await.unwrap();
    assert_eq!(account.total_spent, 100);
}

// ---- Cancellation ----

#[tokio::test]
async fn cancelled_task_is_never_executed() {
    let harness = TestHarness::builder().build().await.unwrap();
    harness.add_session("s1", "u1").await.unwrap();
    harness.credit("u1", 100).await.unwrap();
    let task = harness.enqueue(TestHarness::request("u1", "s1")).await.unwrap();

    assert!(harness.queue.cancel(&task.id).await.unwrap());
    assert!(harness.run_next().await.unwrap().is_none());
    assert_eq!(harness.automation.call_count().await, 0);
    assert_eq!(harness.ledger.balance("u1").await.unwrap(), 100);
}

// ---- Events ----

#[tokio::test]
async fn every_completion_is_published() {
    let harness = TestHarness::builder()
        .with_outcomes(vec![MoveOutcome::NoQuota { diagnostic: None }])
        .build()
        .await
        .unwrap();
    harness.add_session("s1", "u1").await.unwrap();
    harness.credit("u1", 100).await.unwrap();
    let mut events = harness.queue.subscribe();
    let task = harness.enqueue(TestHarness::request("u1", "s1")).await.unwrap();

    let reports = harness.run_until_idle().await.unwrap();
    assert!(matches!(reports[0].completion, CompletionResult::Requeued { .. }));
    assert_eq!(reports[1].completion, CompletionResult::Completed);

    let first = events.recv().await.unwrap();
    assert_eq!(first.task_id, task.id);
    assert_eq!(first.status, TaskStatus::Pending);
    let second = events.recv().await.unwrap();
    assert_eq!(second.status, TaskStatus::Completed);
    assert_eq!(second.attempts, 2);
}

// ---- Pool with many tasks ----

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn pool_drains_queue_for_many_users() {
    let harness = TestHarness::builder().build().await.unwrap();
    for n in 0..5 {
        let user = format!("user-{n}");
        let session = format!("sess-{n}");
        harness.add_session(&session, &user).await.unwrap();
        harness.credit(&user, 100).await.unwrap();
        for _ in 0..2 {
            harness.enqueue(TestHarness::request(&user, &session)).await.unwrap();
        }
    }

    let pool = WorkerPool::new(harness.executor.clone(), 3, Duration::from_millis(10));
    let cancel = CancellationToken::new();
    let running = {
        let cancel = cancel.clone();
        tokio::spawn(async move { pool.run(cancel).await })
    };

    let deadline = tokio::time::Instant::now() + Duration::from_secs(10);
    loop {
        let stats = harness.queue.stats().await.unwrap();
        if stats.completed == 10 {
            break;
        }
        assert!(tokio::time::Instant::now() < deadline, "stuck at {stats:?}");
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    cancel.cancel();
    running.await.unwrap();

    for n in 0..5 {
        assert_eq!(harness.ledger.balance(&format!("user-{n}")).await.unwrap(), 0);
    }
    assert_eq!(harness.notifier.sent_count().await, 10);
}
