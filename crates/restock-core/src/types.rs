// SPDX-FileCopyrightText: 2026 Restock Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types shared by the queue, ledger, worker pool, and collaborators.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::error::RestockError;

/// Default number of attempts a task gets before it is failed permanently.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Lifecycle state of a task.
///
/// Transitions are monotonic except `Processing -> Pending` (retry).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    Cancelled,
}

impl TaskStatus {
    /// Terminal tasks are immutable.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskStatus::Completed | TaskStatus::Failed | TaskStatus::Cancelled
        )
    }
}

/// One move request: a quantity of one item from a source to a target warehouse.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Opaque unique identifier (UUID v4).
    pub id: String,
    pub user_id: String,
    /// Handle of the external marketplace session used to perform the move.
    pub session_id: String,
    /// Link to the persisted request record in the front end, if any.
    pub request_id: Option<String>,
    /// Article identifier.
    pub item: String,
    pub source_warehouse_id: i64,
    pub target_warehouse_id: i64,
    pub quantity: u32,
    /// Higher is more urgent.
    pub priority: i64,
    pub status: TaskStatus,
    pub attempts: u32,
    pub max_attempts: u32,
    pub error_message: Option<String>,
    /// External move identifier, set on success.
    pub supply_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Task {
    /// Whether another retryable failure would still requeue this task.
    pub fn has_attempts_left(&self) -> bool {
        self.attempts < self.max_attempts
    }
}

/// A validated-on-demand request to move stock, as submitted by a user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoveRequest {
    pub user_id: String,
    pub session_id: String,
    #[serde(default)]
    pub request_id: Option<String>,
    pub item: String,
    pub source_warehouse_id: i64,
    pub target_warehouse_id: i64,
    pub quantity: u32,
    #[serde(default)]
    pub priority: i64,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

fn default_max_attempts() -> u32 {
    DEFAULT_MAX_ATTEMPTS
}

impl MoveRequest {
    /// Check the request before it is allowed into the queue.
    pub fn validate(&self) -> Result<(), RestockError> {
        if self.user_id.trim().is_empty() {
            return Err(RestockError::Validation("user id must not be empty".into()));
        }
        if self.session_id.trim().is_empty() {
            return Err(RestockError::Validation(
                "session id must not be empty".into(),
            ));
        }
        if self.item.trim().is_empty() {
            return Err(RestockError::Validation("item must not be empty".into()));
        }
        if self.quantity == 0 {
            return Err(RestockError::Validation(
                "quantity must be a positive integer".into(),
            ));
        }
        if self.source_warehouse_id == self.target_warehouse_id {
            return Err(RestockError::Validation(format!(
                "source and target warehouse are both {}",
                self.source_warehouse_id
            )));
        }
        if self.max_attempts == 0 {
            return Err(RestockError::Validation(
                "max_attempts must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Validate and turn the request into a fresh pending task.
    pub fn into_task(self) -> Result<Task, RestockError> {
        self.validate()?;
        Ok(Task {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: self.user_id,
            session_id: self.session_id,
            request_id: self.request_id,
            item: self.item,
            source_warehouse_id: self.source_warehouse_id,
            target_warehouse_id: self.target_warehouse_id,
            quantity: self.quantity,
            priority: self.priority,
            status: TaskStatus::Pending,
            attempts: 0,
            max_attempts: self.max_attempts,
            error_message: None,
            supply_id: None,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
        })
    }
}

/// What a worker reports back to the queue when it finishes an attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    /// The move happened.
    Succeeded { supply_id: Option<String> },
    /// Failed, but retrying may help (requeued while attempts remain).
    Retryable { error: String },
    /// Failed for good; never requeued.
    Terminal { error: String },
}

impl TaskOutcome {
    pub fn error_message(&self) -> Option<&str> {
        match self {
            TaskOutcome::Succeeded { .. } => None,
            TaskOutcome::Retryable { error } | TaskOutcome::Terminal { error } => Some(error),
        }
    }
}

/// Effect of a `complete` call on the queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletionResult {
    Completed,
    /// Back to pending with the decayed priority.
    Requeued { priority: i64 },
    Failed,
    /// The claim this completion refers to is no longer current (the task was
    /// swept or already completed). Nothing changed.
    Stale,
}

/// Wire code of an automation outcome.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OutcomeCode {
    Success,
    NoQuota,
    InvalidArticle,
    InvalidQuantity,
    SessionExpired,
    Error,
}

/// Result of one automation attempt. Closed set; the worker's mapping over it
/// is an exhaustive match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoveOutcome {
    Success { supply_id: String },
    NoQuota { diagnostic: Option<String> },
    InvalidArticle { diagnostic: Option<String> },
    InvalidQuantity { diagnostic: Option<String> },
    SessionExpired,
    Error { diagnostic: Option<String> },
}

impl MoveOutcome {
    pub fn code(&self) -> OutcomeCode {
        match self {
            MoveOutcome::Success { .. } => OutcomeCode::Success,
            MoveOutcome::NoQuota { .. } => OutcomeCode::NoQuota,
            MoveOutcome::InvalidArticle { .. } => OutcomeCode::InvalidArticle,
            MoveOutcome::InvalidQuantity { .. } => OutcomeCode::InvalidQuantity,
            MoveOutcome::SessionExpired => OutcomeCode::SessionExpired,
            MoveOutcome::Error { .. } => OutcomeCode::Error,
        }
    }

    /// Build an outcome from its wire representation.
    ///
    /// A `Success` without a supply id is downgraded to `Error`: there is
    /// nothing to confirm to the user.
    pub fn from_wire(
        code: OutcomeCode,
        supply_id: Option<String>,
        diagnostic: Option<String>,
    ) -> Self {
        match code {
            OutcomeCode::Success => match supply_id {
                Some(supply_id) => MoveOutcome::Success { supply_id },
                None => MoveOutcome::Error {
                    diagnostic: Some("success reported without a supply id".into()),
                },
            },
            OutcomeCode::NoQuota => MoveOutcome::NoQuota { diagnostic },
            OutcomeCode::InvalidArticle => MoveOutcome::InvalidArticle { diagnostic },
            OutcomeCode::InvalidQuantity => MoveOutcome::InvalidQuantity { diagnostic },
            OutcomeCode::SessionExpired => MoveOutcome::SessionExpired,
            OutcomeCode::Error => MoveOutcome::Error { diagnostic },
        }
    }
}

/// Status of an external marketplace session.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Active,
    Expired,
}

/// Collaborator-owned marketplace session. The pipeline reads it and may mark
/// it expired; it never touches the credentials.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExternalSession {
    pub id: String,
    pub user_id: String,
    pub status: SessionStatus,
    pub expires_at: Option<DateTime<Utc>>,
    /// Opaque credential blob (browser storage state, cookies).
    pub credentials: String,
}

impl ExternalSession {
    /// Active and not past its expiry.
    pub fn is_usable(&self, now: DateTime<Utc>) -> bool {
        self.status == SessionStatus::Active && self.expires_at.is_none_or(|at| at > now)
    }
}

/// Published on every completion, cancel, and sweep.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskEvent {
    pub task_id: String,
    pub user_id: String,
    pub status: TaskStatus,
    pub attempts: u32,
    pub error_message: Option<String>,
}

/// Task counts by status.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TaskStats {
    pub pending: u64,
    pub processing: u64,
    pub completed: u64,
    pub failed: u64,
    pub cancelled: u64,
}
