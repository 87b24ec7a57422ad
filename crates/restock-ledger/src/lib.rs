// SPDX-FileCopyrightText: 2026 Restock Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! User balances, the append-only ledger, and the per-move fee.

pub mod ledger;
pub mod pricing;

pub use ledger::{BalanceAccount, BalanceLedger, LedgerEntry, LedgerEntryKind};
pub use pricing::Pricing;
