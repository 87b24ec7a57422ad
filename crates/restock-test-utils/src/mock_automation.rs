// SPDX-FileCopyrightText: 2026 Restock Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock automation collaborator with scripted outcomes.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use restock_core::MoveAutomation;
use restock_core::types::{ExternalSession, MoveOutcome, Task};

/// Returns pre-configured outcomes in FIFO order.
///
/// When the script runs out every call succeeds with a generated supply id.
/// Tracks how many calls overlapped so tests can check serialization.
pub struct MockAutomation {
    outcomes: Mutex<VecDeque<MoveOutcome>>,
    calls: Mutex<Vec<String>>,
    delay: Option<Duration>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl MockAutomation {
    pub fn new() -> Self {
        Self::with_outcomes(Vec::new())
    }

    pub fn with_outcomes(outcomes: Vec<MoveOutcome>) -> Self {
        Self {
            outcomes: Mutex::new(VecDeque::from(outcomes)),
            calls: Mutex::new(Vec::new()),
            delay: None,
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    /// Make every call take `delay` before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub async fn push_outcome(&self, outcome: MoveOutcome) {
        self.outcomes.lock().await.push_back(outcome);
    }

    /// Task ids in call order.
    pub async fn calls(&self) -> Vec<String> {
        self.calls.lock().await.clone()
    }

    pub async fn call_count(&self) -> usize {
        self.calls.lock().await.len()
    }

    /// Highest number of calls that were running at the same time.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

impl Default for MockAutomation {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MoveAutomation for MockAutomation {
    fn name(&self) -> &str {
        "mock-automation"
    }

    async fn attempt_move(&self, _session: &ExternalSession, task: &Task) -> MoveOutcome {
        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(running, Ordering::SeqCst);

        self.calls.lock().await.push(task.id.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let outcome = self.outcomes.lock().await.pop_front();

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        outcome.unwrap_or_else(|| MoveOutcome::Success {
            supply_id: format!("MOCK-{}", &task.id[..8.min(task.id.len())]),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use restock_core::types::{MoveRequest, SessionStatus};

    fn fixtures() -> (ExternalSession, Task) {
        let session = ExternalSession {
            id: "s".into(),
            user_id: "u".into(),
            status: SessionStatus::Active,
            expires_at: None,
            credentials: String::new(),
        };
        let task = MoveRequest {
            user_id: "u".into(),
            session_id: "s".into(),
            request_id: None,
            item: "1".into(),
            source_warehouse_id: 1,
            target_warehouse_id: 2,
            quantity: 1,
            priority: 0,
            max_attempts: 3,
        }
        .into_task()
        .unwrap();
        (session, task)
    }

    #[tokio::test]
    async fn scripted_outcomes_then_success() {
        let mock = MockAutomation::with_outcomes(vec![MoveOutcome::SessionExpired]);
        let (session, task) = fixtures();

        assert_eq!(mock.attempt_move(&session, &task).await, MoveOutcome::SessionExpired);
        assert!(matches!(
            mock.attempt_move(&session, &task).await,
            MoveOutcome::Success { .. }
        ));
        assert_eq!(mock.call_count().await, 2);
        assert_eq!(mock.max_in_flight(), 1);
    }
}
