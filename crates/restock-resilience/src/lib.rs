// SPDX-FileCopyrightText: 2026 Restock Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Resilience primitives for calls leaving the process.
//!
//! - [`TokenBucket`]: async, lazily refilled request budget.
//! - [`RetryPolicy`]: capped exponential backoff schedule.

pub mod backoff;
pub mod token_bucket;

pub use backoff::RetryPolicy;
pub use token_bucket::TokenBucket;
