// SPDX-FileCopyrightText: 2026 Restock Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Notifier that only writes to the log.

use async_trait::async_trait;
use restock_core::{Notifier, RestockError};
use tracing::info;

/// Used when no chat front end is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    fn name(&self) -> &str {
        "log"
    }

    async fn notify(&self, user_id: &str, message: &str) -> Result<(), RestockError> {
        info!(user_id, message, "user notification");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn log_notifier_never_fails() {
        assert!(LogNotifier.notify("u1", "hello").await.is_ok());
        assert_eq!(LogNotifier.name(), "log");
    }
}
