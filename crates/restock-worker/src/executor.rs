// SPDX-FileCopyrightText: 2026 Restock Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Execution of one claimed task.
//!
//! Every claimed task ends in exactly one `complete` call and, unless the
//! completion turned out stale, one notification:
//!
//! 1. resolve the external session (missing or inactive: terminal, no charge)
//! 2. check the balance (insufficient: terminal, no charge)
//! 3. charge the move fee under `(task_id, attempt)`
//! 4. take the session's lock, renew the claim and drive the automation;
//!    a claim swept while waiting for the lock is refunded, not attempted
//! 5. map the outcome onto refund / deactivation / queue action
//! 6. notify the user, best-effort
//!
//! An infrastructure error anywhere in 1-5 refunds the attempt and fails
//! the task with the error message.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use restock_core::types::{CompletionResult, ExternalSession, MoveOutcome, Task, TaskOutcome};
use restock_core::{MoveAutomation, Notifier, RestockError, SessionStore, TaskQueue};
use restock_ledger::{BalanceLedger, Pricing};
use tracing::{Instrument, debug, error, info, info_span, warn};

use crate::messages;
use crate::outcome::map_outcome;
use crate::session_lock::SessionLocks;

const DEFAULT_AUTOMATION_TIMEOUT: Duration = Duration::from_secs(300);

/// What happened to one claimed task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessReport {
    pub task_id: String,
    pub attempt: u32,
    pub outcome: TaskOutcome,
    pub completion: CompletionResult,
}

struct Decision {
    outcome: TaskOutcome,
    /// Balance after the last ledger mutation, when known.
    balance: Option<i64>,
}

impl Decision {
    fn terminal(error: impl Into<String>, balance: Option<i64>) -> Self {
        Self {
            outcome: TaskOutcome::Terminal {
                error: error.into(),
            },
            balance,
        }
    }
}

/// Couples automation outcomes to the ledger and the queue.
pub struct MoveExecutor {
    queue: Arc<dyn TaskQueue>,
    sessions: Arc<dyn SessionStore>,
    ledger: Arc<BalanceLedger>,
    automation: Arc<dyn MoveAutomation>,
    notifier: Arc<dyn Notifier>,
    pricing: Pricing,
    locks: SessionLocks,
    automation_timeout: Duration,
}

impl MoveExecutor {
    pub fn new(
        queue: Arc<dyn TaskQueue>,
        sessions: Arc<dyn SessionStore>,
        ledger: Arc<BalanceLedger>,
        automation: Arc<dyn MoveAutomation>,
        notifier: Arc<dyn Notifier>,
        pricing: Pricing,
    ) -> Self {
        Self {
            queue,
            sessions,
            ledger,
            automation,
            notifier,
            pricing,
            locks: SessionLocks::new(),
            automation_timeout: DEFAULT_AUTOMATION_TIMEOUT,
        }
    }

    /// Upper bound for one automation call. Exceeding it counts as ERROR.
    pub fn with_automation_timeout(mut self, timeout: Duration) -> Self {
        self.automation_timeout = timeout;
        self
    }

    pub fn queue(&self) -> &Arc<dyn TaskQueue> {
        &self.queue
    }

    /// Claim the next task and process it. `None` when the queue is empty.
    pub async fn process_next(&self) -> Result<Option<ProcessReport>, RestockError> {
        match self.queue.claim().await? {
            Some(task) => self.process(task).await.map(Some),
            None => Ok(None),
        }
    }

    /// Process a task claimed under `task.attempts`.
    ///
    /// Errors only when the completion itself cannot be recorded; the task
    /// then stays processing until the stale sweep picks it up.
    pub async fn process(&self, task: Task) -> Result<ProcessReport, RestockError> {
        let span = info_span!("move", task_id = %task.id, attempt = task.attempts);
        self.process_inner(task).instrument(span).await
    }

    async fn process_inner(&self, task: Task) -> Result<ProcessReport, RestockError> {
        let attempt = task.attempts;
        let decision = match self.execute(&task).await {
            Ok(decision) => decision,
            Err(e) => self.recover(&task, e).await,
        };

        let completion = self
            .queue
            .complete(&task.id, attempt, decision.outcome.clone())
            .await?;

        if completion == CompletionResult::Stale {
            warn!("task was reclaimed while running, result discarded");
        } else {
            let message = self.message_for(&task, &decision, &completion).await;
            self.notify(&task.user_id, &message).await;
        }

        Ok(ProcessReport {
            task_id: task.id,
            attempt,
            outcome: decision.outcome,
            completion,
        })
    }

    async fn execute(&self, task: &Task) -> Result<Decision, RestockError> {
        let attempt = task.attempts;
        let fee = self.pricing.fee_for(task);

        let session = match self.sessions.get_session(&task.session_id).await? {
            None => return Ok(Decision::terminal("marketplace session not found", None)),
            Some(s) if s.user_id != task.user_id => {
                warn!(session_id = %s.id, "session belongs to another user");
                return Ok(Decision::terminal("marketplace session not found", None));
            }
            Some(s) if !s.is_usable(Utc::now()) => {
                return Ok(Decision::terminal(
                    "marketplace session expired, sign in again",
                    None,
                ));
            }
            Some(s) => s,
        };

        let balance = self.ledger.balance(&task.user_id).await?;
        if balance < fee {
            info!(balance, fee, "insufficient balance, task not attempted");
            return Ok(Decision::terminal(
                format!("insufficient balance, a move costs {fee}"),
                Some(balance),
            ));
        }

        match self
            .ledger
            .charge(&task.user_id, fee, &task.id, attempt)
            .await
        {
            Ok(true) => {}
            Ok(false) => {
                return Ok(Decision::terminal(
                    format!("insufficient balance, a move costs {fee}"),
                    None,
                ));
            }
            Err(e) => {
                error!(error = %e, "charge failed");
                return Ok(Decision::terminal(format!("charge failed: {e}"), None));
            }
        }

        let outcome = {
            let _guard = self.locks.lock(&session.id).await;
            match self.queue.renew_claim(&task.id, attempt).await {
                Ok(true) => Ok(Some(self.run_automation(&session, task).await)),
                Ok(false) => Ok(None),
                Err(e) => Err(e),
            }
        };
        self.locks.release_idle(&session.id);

        let Some(outcome) = outcome? else {
            warn!("claim was swept while waiting for the session, move not attempted");
            let balance = self
                .ledger
                .refund(&task.user_id, fee, &task.id, attempt)
                .await?;
            return Ok(Decision::terminal(
                "claim expired while waiting for the marketplace session",
                Some(balance),
            ));
        };

        let code = outcome.code();
        metrics::counter!("restock_move_outcomes_total", "code" => code.to_string()).increment(1);
        info!(%code, automation = self.automation.name(), "automation finished");

        let action = map_outcome(outcome);
        let mut balance = None;
        if action.refund {
            balance = Some(
                self.ledger
                    .refund(&task.user_id, fee, &task.id, attempt)
                    .await?,
            );
        }
        if action.deactivate_session {
            if let Err(e) = self.sessions.deactivate_session(&session.id).await {
                warn!(session_id = %session.id, error = %e, "failed to deactivate session");
            }
        }

        Ok(Decision {
            outcome: action.task_outcome,
            balance,
        })
    }

    async fn run_automation(&self, session: &ExternalSession, task: &Task) -> MoveOutcome {
        let started = Instant::now();
        let result =
            tokio::time::timeout(self.automation_timeout, self.automation.attempt_move(session, task))
                .await;
        metrics::histogram!("restock_automation_duration_seconds")
            .record(started.elapsed().as_secs_f64());
        match result {
            Ok(outcome) => outcome,
            Err(_) => {
                warn!(timeout = ?self.automation_timeout, "automation call timed out");
                MoveOutcome::Error {
                    diagnostic: Some(format!(
                        "timed out after {}s",
                        self.automation_timeout.as_secs()
                    )),
                }
            }
        }
    }

    /// Last resort: give the attempt's charge back and fail the task.
    async fn recover(&self, task: &Task, err: RestockError) -> Decision {
        error!(error = %err, "task execution failed");
        metrics::counter!("restock_worker_errors_total").increment(1);
        let fee = self.pricing.fee_for(task);
        let balance = match self
            .ledger
            .refund(&task.user_id, fee, &task.id, task.attempts)
            .await
        {
            Ok(balance) => Some(balance),
            Err(e) => {
                error!(error = %e, "refund after failure did not go through");
                None
            }
        };
        Decision::terminal(err.to_string(), balance)
    }

    async fn message_for(
        &self,
        task: &Task,
        decision: &Decision,
        completion: &CompletionResult,
    ) -> String {
        let reason = decision.outcome.error_message().unwrap_or("unknown error");
        match completion {
            CompletionResult::Completed => {
                let supply_id = match &decision.outcome {
                    TaskOutcome::Succeeded { supply_id } => supply_id.as_deref(),
                    _ => None,
                };
                messages::succeeded(task, supply_id)
            }
            CompletionResult::Requeued { .. } => messages::requeued(task, reason),
            CompletionResult::Failed | CompletionResult::Stale => {
                let balance = match decision.balance {
                    Some(balance) => Some(balance),
                    None => self.ledger.balance(&task.user_id).await.ok(),
                };
                messages::failed(task, reason, balance)
            }
        }
    }

    async fn notify(&self, user_id: &str, message: &str) {
        match self.notifier.notify(user_id, message).await {
            Ok(()) => debug!(notifier = self.notifier.name(), "user notified"),
            Err(e) => warn!(notifier = self.notifier.name(), error = %e, "notification failed"),
        }
    }
}
