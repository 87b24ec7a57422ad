// SPDX-FileCopyrightText: 2026 Restock Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! User notification collaborator.

use async_trait::async_trait;

use crate::error::RestockError;

/// Delivers a short text message to a user.
///
/// Best-effort: callers log failures and carry on.
#[async_trait]
pub trait Notifier: Send + Sync + 'static {
    fn name(&self) -> &str;

    async fn notify(&self, user_id: &str, message: &str) -> Result<(), RestockError>;
}
