// SPDX-FileCopyrightText: 2026 Restock Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Restock integration tests.
//!
//! Provides mock collaborators and a harness assembling the whole pipeline
//! on a temporary SQLite database, so tests run without a browser, a
//! marketplace or a chat front end.
//!
//! # Components
//!
//! - [`MockAutomation`] - scripted automation outcomes
//! - [`MockNotifier`] - captures notifications for assertions
//! - [`TestHarness`] - queue, ledger, sessions and executor wired together

pub mod harness;
pub mod mock_automation;
pub mod mock_notifier;

pub use harness::{TestHarness, TestHarnessBuilder};
pub use mock_automation::MockAutomation;
pub use mock_notifier::MockNotifier;
