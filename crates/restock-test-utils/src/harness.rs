// SPDX-FileCopyrightText: 2026 Restock Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end pipeline tests.
//!
//! `TestHarness` wires a temporary SQLite database, the task queue, the
//! session store, the balance ledger and a [`MoveExecutor`] around the
//! mock collaborators. Tests enqueue moves and drive them one claim at a
//! time with [`TestHarness::run_next`].

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use restock_config::model::WorkerConfig;
use restock_core::types::{ExternalSession, MoveOutcome, MoveRequest, SessionStatus, Task};
use restock_core::{RestockError, TaskQueue};
use restock_ledger::{BalanceLedger, Pricing};
use restock_storage::{Database, SqliteSessionStore, SqliteTaskQueue};
use restock_worker::{MoveExecutor, ProcessReport, StaleSweeper};

use crate::mock_automation::MockAutomation;
use crate::mock_notifier::MockNotifier;

/// Builder for test environments.
pub struct TestHarnessBuilder {
    outcomes: Vec<MoveOutcome>,
    move_fee: i64,
    automation_delay: Option<Duration>,
    automation_timeout: Option<Duration>,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            outcomes: Vec::new(),
            move_fee: 50,
            automation_delay: None,
            automation_timeout: None,
        }
    }

    /// Outcomes the mock automation returns, in order.
    pub fn with_outcomes(mut self, outcomes: Vec<MoveOutcome>) -> Self {
        self.outcomes = outcomes;
        self
    }

    pub fn with_move_fee(mut self, fee: i64) -> Self {
        self.move_fee = fee;
        self
    }

    pub fn with_automation_delay(mut self, delay: Duration) -> Self {
        self.automation_delay = Some(delay);
        self
    }

    pub fn with_automation_timeout(mut self, timeout: Duration) -> Self {
        self.automation_timeout = Some(timeout);
        self
    }

    pub async fn build(self) -> Result<TestHarness, RestockError> {
        let temp_dir =
            tempfile::TempDir::new().map_err(|e| RestockError::Storage { source: e.into() })?;
        let db = Database::open(temp_dir.path().join("test.db")).await?;

        let queue = Arc::new(SqliteTaskQueue::new(db.clone()));
        let sessions = Arc::new(SqliteSessionStore::new(db.clone()));
        let ledger = Arc::new(BalanceLedger::new(db.clone()));

        let mut automation = MockAutomation::with_outcomes(self.outcomes);
        if let Some(delay) = self.automation_delay {
            automation = automation.with_delay(delay);
        }
        let automation = Arc::new(automation);
        let notifier = Arc::new(MockNotifier::new());
        let pricing = Pricing::new(self.move_fee);

        let mut executor = MoveExecutor::new(
            queue.clone(),
            sessions.clone(),
            ledger.clone(),
            automation.clone(),
            notifier.clone(),
            pricing,
        );
        if let Some(timeout) = self.automation_timeout {
            executor = executor.with_automation_timeout(timeout);
        }

        Ok(TestHarness {
            db,
            queue,
            sessions,
            ledger,
            automation,
            notifier,
            pricing,
            executor: Arc::new(executor),
            _temp_dir: temp_dir,
        })
    }
}

/// A complete pipeline on a throwaway database.
pub struct TestHarness {
    pub db: Database,
    pub queue: Arc<SqliteTaskQueue>,
    pub sessions: Arc<SqliteSessionStore>,
    pub ledger: Arc<BalanceLedger>,
    pub automation: Arc<MockAutomation>,
    pub notifier: Arc<MockNotifier>,
    pub pricing: Pricing,
    pub executor: Arc<MoveExecutor>,
    _temp_dir: tempfile::TempDir,
}

impl TestHarness {
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// Register an active session for `user_id`.
    pub async fn add_session(&self, session_id: &str, user_id: &str) -> Result<(), RestockError> {
        self.sessions
            .upsert(&ExternalSession {
                id: session_id.to_string(),
                user_id: user_id.to_string(),
                status: SessionStatus::Active,
                expires_at: Some(Utc::now() + chrono::Duration::days(1)),
                credentials: "{\"cookies\":[]}".to_string(),
            })
            .await
    }

    /// Top up a balance with a unique reference.
    pub async fn credit(&self, user_id: &str, amount: i64) -> Result<i64, RestockError> {
        let reference = format!("test-{}", uuid::Uuid::new_v4());
        self.ledger.credit(user_id, amount, &reference).await
    }

    /// A valid move request for `user_id` over `session_id`.
    pub fn request(user_id: &str, session_id: &str) -> MoveRequest {
        MoveRequest {
            user_id: user_id.to_string(),
            session_id: session_id.to_string(),
            request_id: None,
            item: "168245517".to_string(),
            source_warehouse_id: 507,
            target_warehouse_id: 117986,
            quantity: 10,
            priority: 0,
            max_attempts: restock_core::types::DEFAULT_MAX_ATTEMPTS,
        }
    }

    /// Validate and enqueue a request; returns the stored task.
    pub async fn enqueue(&self, request: MoveRequest) -> Result<Task, RestockError> {
        let task = request.into_task()?;
        self.queue.enqueue(&task).await?;
        Ok(task)
    }

    /// Claim and process one task.
    pub async fn run_next(&self) -> Result<Option<ProcessReport>, RestockError> {
        self.executor.process_next().await
    }

    /// Process until the queue has nothing left to claim.
    pub async fn run_until_idle(&self) -> Result<Vec<ProcessReport>, RestockError> {
        let mut reports = Vec::new();
        while let Some(report) = self.run_next().await? {
            reports.push(report);
        }
        Ok(reports)
    }

    pub async fn task(&self, task_id: &str) -> Result<Task, RestockError> {
        self.queue
            .get(task_id)
            .await?
            .ok_or_else(|| RestockError::task_not_found(task_id))
    }

    /// A sweeper over this harness with the given staleness threshold.
    pub fn sweeper(&self, stale_timeout: Duration) -> StaleSweeper {
        StaleSweeper::new(
            self.queue.clone(),
            self.ledger.clone(),
            self.notifier.clone(),
            self.pricing,
            &WorkerConfig::default(),
        )
        .with_stale_timeout(stale_timeout)
    }
}
