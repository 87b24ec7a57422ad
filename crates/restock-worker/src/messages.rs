// SPDX-FileCopyrightText: 2026 Restock Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! User-facing notification texts.

use restock_core::types::Task;

fn describe(task: &Task) -> String {
    format!(
        "Move of {} x {} from warehouse {} to {}",
        task.quantity, task.item, task.source_warehouse_id, task.target_warehouse_id
    )
}

pub fn succeeded(task: &Task, supply_id: Option<&str>) -> String {
    match supply_id {
        Some(id) => format!("{} completed. Supply id: {id}.", describe(task)),
        None => format!("{} completed.", describe(task)),
    }
}

pub fn requeued(task: &Task, reason: &str) -> String {
    format!(
        "{} did not go through ({reason}). The task remains queued and will be retried \
         (attempt {} of {} used).",
        describe(task),
        task.attempts,
        task.max_attempts
    )
}

/// Terminal failure. `balance` is omitted when it could not be read.
pub fn failed(task: &Task, reason: &str, balance: Option<i64>) -> String {
    match balance {
        Some(balance) => format!(
            "{} failed: {reason}. Remaining balance: {balance}.",
            describe(task)
        ),
        None => format!("{} failed: {reason}.", describe(task)),
    }
}
