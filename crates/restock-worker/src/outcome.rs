// SPDX-FileCopyrightText: 2026 Restock Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! What each automation outcome means for the ledger and the queue.

use restock_core::types::{MoveOutcome, TaskOutcome};

/// Ledger and queue consequences of one automation outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutcomeAction {
    /// Give the attempt's charge back.
    pub refund: bool,
    /// Mark the external session expired.
    pub deactivate_session: bool,
    /// What to record on the task.
    pub task_outcome: TaskOutcome,
}

fn with_diagnostic(reason: &str, diagnostic: Option<String>) -> String {
    match diagnostic {
        Some(d) if !d.trim().is_empty() => format!("{reason}: {d}"),
        _ => reason.to_string(),
    }
}

/// Map an automation outcome onto its ledger and queue action.
///
/// | Outcome | Ledger | Queue |
/// |---|---|---|
/// | SUCCESS | keep charge | succeeded |
/// | NO_QUOTA | refund | retryable |
/// | SESSION_EXPIRED | refund, deactivate session | terminal |
/// | INVALID_ARTICLE / INVALID_QUANTITY | refund | terminal |
/// | ERROR | refund | retryable |
pub fn map_outcome(outcome: MoveOutcome) -> OutcomeAction {
    match outcome {
        MoveOutcome::Success { supply_id } => OutcomeAction {
            refund: false,
            deactivate_session: false,
            task_outcome: TaskOutcome::Succeeded {
                supply_id: Some(supply_id),
            },
        },
        MoveOutcome::NoQuota { diagnostic } => OutcomeAction {
            refund: true,
            deactivate_session: false,
            task_outcome: TaskOutcome::Retryable {
                error: with_diagnostic("no acceptance quota at the target warehouse", diagnostic),
            },
        },
        MoveOutcome::SessionExpired => OutcomeAction {
            refund: true,
            deactivate_session: true,
            task_outcome: TaskOutcome::Terminal {
                error: "marketplace session expired, sign in again".to_string(),
            },
        },
        MoveOutcome::InvalidArticle { diagnostic } => OutcomeAction {
            refund: true,
            deactivate_session: false,
            task_outcome: TaskOutcome::Terminal {
                error: with_diagnostic("article not found at the source warehouse", diagnostic),
            },
        },
        MoveOutcome::InvalidQuantity { diagnostic } => OutcomeAction {
            refund: true,
            deactivate_session: false,
            task_outcome: TaskOutcome::Terminal {
                error: with_diagnostic("requested quantity is not available", diagnostic),
            },
        },
        MoveOutcome::Error { diagnostic } => OutcomeAction {
            refund: true,
            deactivate_session: false,
            task_outcome: TaskOutcome::Retryable {
                error: with_diagnostic("automation error", diagnostic),
            },
        },
    }
}
