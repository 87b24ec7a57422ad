// SPDX-FileCopyrightText: 2026 Restock Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Execution side of the Restock pipeline.
//!
//! The [`WorkerPool`] runs N pull loops over the shared [`TaskQueue`]; each
//! claimed task goes through the [`MoveExecutor`], which couples the
//! automation outcome to the balance ledger. Two background loops live
//! next to it: the [`StaleSweeper`] recovers abandoned tasks and the
//! [`CoefficientWatcher`] boosts tasks waiting on a warehouse that just
//! opened up.
//!
//! [`TaskQueue`]: restock_core::TaskQueue

pub mod executor;
pub mod log_notifier;
pub mod messages;
pub mod outcome;
pub mod pool;
pub mod session_lock;
pub mod shutdown;
pub mod sweeper;
pub mod watcher;

pub use executor::{MoveExecutor, ProcessReport};
pub use log_notifier::LogNotifier;
pub use outcome::{OutcomeAction, map_outcome};
pub use pool::WorkerPool;
pub use session_lock::SessionLocks;
pub use sweeper::StaleSweeper;
pub use watcher::CoefficientWatcher;
