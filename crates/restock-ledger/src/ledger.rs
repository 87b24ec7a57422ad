// SPDX-FileCopyrightText: 2026 Restock Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Balance ledger backed by SQLite.
//!
//! Balances live in `balances`; every mutation appends one row to
//! `ledger_entries` in the same transaction. Charges and refunds are keyed by
//! `(task_id, attempt)` so replays after a crash or retry are no-ops, and a
//! refund is only applied against a recorded charge.

use chrono::{DateTime, Utc};
use restock_core::RestockError;
use restock_storage::queries::{format_ts, parse_enum, parse_ts};
use restock_storage::{Database, map_tr_err};
use rusqlite::{OptionalExtension, Transaction, params};
use serde::Serialize;
use strum::{Display, EnumString};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum LedgerEntryKind {
    Charge,
    Refund,
    Credit,
}

/// One append-only ledger row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LedgerEntry {
    pub id: i64,
    pub user_id: String,
    pub kind: LedgerEntryKind,
    pub amount: i64,
    /// Balance immediately after this entry was applied.
    pub balance_after: i64,
    pub task_id: Option<String>,
    pub attempt: Option<u32>,
    /// External reference of a credit (payment id).
    pub reference: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BalanceAccount {
    pub user_id: String,
    pub balance: i64,
    pub total_spent: i64,
}

struct NewEntry<'a> {
    user_id: &'a str,
    kind: LedgerEntryKind,
    amount: i64,
    balance_after: i64,
    task_id: Option<&'a str>,
    attempt: Option<u32>,
    reference: Option<&'a str>,
}

fn read_account(tx: &Transaction<'_>, user_id: &str) -> Result<BalanceAccount, rusqlite::Error> {
    let row = tx
        .query_row(
            "SELECT balance, total_spent FROM balances WHERE user_id = ?1",
            params![user_id],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?;
    let (balance, total_spent) = row.unwrap_or((0, 0));
    Ok(BalanceAccount {
        user_id: user_id.to_string(),
        balance,
        total_spent,
    })
}

fn write_account(tx: &Transaction<'_>, account: &BalanceAccount) -> Result<(), rusqlite::Error> {
    tx.execute(
        "INSERT INTO balances (user_id, balance, total_spent, updated_at)
         VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(user_id) DO UPDATE SET
            balance = excluded.balance,
            total_spent = excluded.total_spent,
            updated_at = excluded.updated_at",
        params![
            account.user_id,
            account.balance,
            account.total_spent,
            format_ts(Utc::now())
        ],
    )?;
    Ok(())
}

fn append_entry(tx: &Transaction<'_>, entry: NewEntry<'_>) -> Result<(), rusqlite::Error> {
    tx.execute(
        "INSERT INTO ledger_entries
            (user_id, kind, amount, balance_after, task_id, attempt, reference, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            entry.user_id,
            entry.kind.to_string(),
            entry.amount,
            entry.balance_after,
            entry.task_id,
            entry.attempt,
            entry.reference,
            format_ts(Utc::now()),
        ],
    )?;
    Ok(())
}

/// Amount of the `kind` entry recorded for one task attempt, if any.
fn attempt_entry(
    tx: &Transaction<'_>,
    task_id: &str,
    attempt: u32,
    kind: LedgerEntryKind,
) -> Result<Option<i64>, rusqlite::Error> {
    tx.query_row(
        "SELECT amount FROM ledger_entries WHERE task_id = ?1 AND attempt = ?2 AND kind = ?3",
        params![task_id, attempt, kind.to_string()],
        |row| row.get(0),
    )
    .optional()
}

/// Result of a charge inside the transaction.
enum ChargeResult {
    Applied(i64),
    Replayed,
    Insufficient(i64),
}

/// Owner and amount of a recorded charge.
fn charge_entry(
    tx: &Transaction<'_>,
    task_id: &str,
    attempt: u32,
) -> Result<Option<(String, i64)>, rusqlite::Error> {
    tx.query_row(
        "SELECT user_id, amount FROM ledger_entries
         WHERE task_id = ?1 AND attempt = ?2 AND kind = 'charge'",
        params![task_id, attempt],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )
    .optional()
}

/// Result of a refund inside the transaction.
enum RefundResult {
    Applied(i64),
    AlreadyRefunded(i64),
    NoCharge(i64),
    OtherUser { owner: String, balance: i64 },
}

pub struct BalanceLedger {
    db: Database,
}

impl BalanceLedger {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Current balance; 0 for users without an account.
    pub async fn balance(&self, user_id: &str) -> Result<i64, RestockError> {
        Ok(self.account(user_id).await?.balance)
    }

    /// Balance and lifetime spend of one user.
    pub async fn account(&self, user_id: &str) -> Result<BalanceAccount, RestockError> {
        let user_id = user_id.to_string();
        self.db
            .connection()
            .call(move |conn| {
                let tx = conn.transaction()?;
                let account = read_account(&tx, &user_id)?;
                tx.commit()?;
                Ok(account)
            })
            .await
            .map_err(map_tr_err)
    }

    /// Charge `amount` for attempt `attempt` of `task_id`.
    ///
    /// Returns `false` without touching the balance when funds are
    /// insufficient. A replay of an already recorded charge returns `true`
    /// and charges nothing.
    pub async fn charge(
        &self,
        user_id: &str,
        amount: i64,
        task_id: &str,
        attempt: u32,
    ) -> Result<bool, RestockError> {
        if amount < 0 {
            return Err(RestockError::Validation(format!(
                "charge amount must be non-negative, got {amount}"
            )));
        }
        let (user, task) = (user_id.to_string(), task_id.to_string());
        let result = self
            .db
            .connection()
            .call(move |conn| {
                let tx = conn.transaction_with_behavior(rusqlite::TransactionBehavior::Immediate)?;
                if attempt_entry(&tx, &task, attempt, LedgerEntryKind::Charge)?.is_some() {
                    tx.commit()?;
                    return Ok(ChargeResult::Replayed);
                }
                let mut account = read_account(&tx, &user)?;
                if account.balance < amount {
                    tx.commit()?;
                    return Ok(ChargeResult::Insufficient(account.balance));
                }
                account.balance -= amount;
                account.total_spent += amount;
                write_account(&tx, &account)?;
                append_entry(
                    &tx,
                    NewEntry {
                        user_id: &user,
                        kind: LedgerEntryKind::Charge,
                        amount,
                        balance_after: account.balance,
                        task_id: Some(&task),
                        attempt: Some(attempt),
                        reference: None,
                    },
                )?;
                tx.commit()?;
                Ok(ChargeResult::Applied(account.balance))
            })
            .await
            .map_err(map_tr_err)?;

        match result {
            ChargeResult::Applied(balance) => {
                metrics::counter!("restock_ledger_charges_total").increment(1);
                info!(user_id, task_id, attempt, amount, balance, "balance charged");
                Ok(true)
            }
            ChargeResult::Replayed => {
                debug!(task_id, attempt, "charge already recorded");
                Ok(true)
            }
            ChargeResult::Insufficient(balance) => {
                info!(user_id, task_id, amount, balance, "insufficient balance");
                Ok(false)
            }
        }
    }

    /// Refund the charge of attempt `attempt` of `task_id`.
    ///
    /// Never fails on business grounds: without a matching charge, when the
    /// charge belongs to another user, or when the refund was already
    /// recorded, nothing changes. The refunded amount never exceeds the
    /// recorded charge. Returns the resulting balance of `user_id`.
    pub async fn refund(
        &self,
        user_id: &str,
        amount: i64,
        task_id: &str,
        attempt: u32,
    ) -> Result<i64, RestockError> {
        let (user, task) = (user_id.to_string(), task_id.to_string());
        let result = self
            .db
            .connection()
            .call(move |conn| {
                let tx = conn.transaction_with_behavior(rusqlite::TransactionBehavior::Immediate)?;
                let mut account = read_account(&tx, &user)?;
                let Some((owner, charged)) = charge_entry(&tx, &task, attempt)? else {
                    tx.commit()?;
                    return Ok(RefundResult::NoCharge(account.balance));
                };
                if owner != user {
                    tx.commit()?;
                    return Ok(RefundResult::OtherUser {
                        owner,
                        balance: account.balance,
                    });
                }
                if attempt_entry(&tx, &task, attempt, LedgerEntryKind::Refund)?.is_some() {
                    tx.commit()?;
                    return Ok(RefundResult::AlreadyRefunded(account.balance));
                }
                let refunded = amount.clamp(0, charged);
                account.balance += refunded;
                account.total_spent -= refunded;
                write_account(&tx, &account)?;
                append_entry(
                    &tx,
                    NewEntry {
                        user_id: &user,
                        kind: LedgerEntryKind::Refund,
                        amount: refunded,
                        balance_after: account.balance,
                        task_id: Some(&task),
                        attempt: Some(attempt),
                        reference: None,
                    },
                )?;
                tx.commit()?;
                Ok(RefundResult::Applied(account.balance))
            })
            .await
            .map_err(map_tr_err)?;

        match result {
            RefundResult::Applied(balance) => {
                metrics::counter!("restock_ledger_refunds_total").increment(1);
                info!(user_id, task_id, attempt, balance, "charge refunded");
                Ok(balance)
            }
            RefundResult::AlreadyRefunded(balance) => {
                debug!(task_id, attempt, "refund already recorded");
                Ok(balance)
            }
            RefundResult::NoCharge(balance) => {
                warn!(task_id, attempt, "refund without matching charge ignored");
                Ok(balance)
            }
            RefundResult::OtherUser { owner, balance } => {
                warn!(
                    user_id,
                    charged_user = %owner,
                    task_id,
                    attempt,
                    "refund for a charge of another user ignored"
                );
                Ok(balance)
            }
        }
    }

    /// Top up a balance. Idempotent on `reference`; returns the resulting balance.
    pub async fn credit(
        &self,
        user_id: &str,
        amount: i64,
        reference: &str,
    ) -> Result<i64, RestockError> {
        if amount <= 0 {
            return Err(RestockError::Validation(format!(
                "credit amount must be positive, got {amount}"
            )));
        }
        let (user, reference) = (user_id.to_string(), reference.to_string());
        let (balance, applied) = self
            .db
            .connection()
            .call(move |conn| {
                let tx = conn.transaction_with_behavior(rusqlite::TransactionBehavior::Immediate)?;
                let mut account = read_account(&tx, &user)?;
                let seen: Option<i64> = tx
                    .query_row(
                        "SELECT id FROM ledger_entries WHERE kind = 'credit' AND reference = ?1",
                        params![reference],
                        |row| row.get(0),
                    )
                    .optional()?;
                if seen.is_some() {
                    tx.commit()?;
                    return Ok((account.balance, false));
                }
                account.balance += amount;
                write_account(&tx, &account)?;
                append_entry(
                    &tx,
                    NewEntry {
                        user_id: &user,
                        kind: LedgerEntryKind::Credit,
                        amount,
                        balance_after: account.balance,
                        task_id: None,
                        attempt: None,
                        reference: Some(&reference),
                    },
                )?;
                tx.commit()?;
                Ok((account.balance, true))
            })
            .await
            .map_err(map_tr_err)?;

        if applied {
            info!(user_id, amount, balance, "balance credited");
        } else {
            debug!(user_id, "credit reference already applied");
        }
        Ok(balance)
    }

    /// Every ledger row that references `task_id`, oldest first.
    pub async fn entries_for_task(&self, task_id: &str) -> Result<Vec<LedgerEntry>, RestockError> {
        let task_id = task_id.to_string();
        self.db
            .connection()
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT id, user_id, kind, amount, balance_after, task_id, attempt,
                            reference, created_at
                     FROM ledger_entries WHERE task_id = ?1 ORDER BY id ASC",
                )?;
                let rows = stmt.query_map(params![task_id], |row| {
                    Ok(LedgerEntry {
                        id: row.get(0)?,
                        user_id: row.get(1)?,
                        kind: parse_enum(2, &row.get::<_, String>(2)?)?,
                        amount: row.get(3)?,
                        balance_after: row.get(4)?,
                        task_id: row.get(5)?,
                        attempt: row.get(6)?,
                        reference: row.get(7)?,
                        created_at: parse_ts(8, &row.get::<_, String>(8)?)?,
                    })
                })?;
                rows.collect()
            })
            .await
            .map_err(map_tr_err)
    }
}
