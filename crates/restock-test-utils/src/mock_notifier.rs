// SPDX-FileCopyrightText: 2026 Restock Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock notifier capturing every message.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use restock_core::{Notifier, RestockError};

/// Records `(user_id, message)` pairs. Can be switched to fail every call.
#[derive(Default)]
pub struct MockNotifier {
    sent: Mutex<Vec<(String, String)>>,
    failing: AtomicBool,
}

impl MockNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every following `notify` returns an error (after recording the message).
    pub fn fail_deliveries(&self) {
        self.failing.store(true, Ordering::SeqCst);
    }

    pub async fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().await.clone()
    }

    /// Messages addressed to `user_id`, oldest first.
    pub async fn messages_for(&self, user_id: &str) -> Vec<String> {
        self.sent
            .lock()
            .await
            .iter()
            .filter(|(user, _)| user == user_id)
            .map(|(_, message)| message.clone())
            .collect()
    }

    pub async fn sent_count(&self) -> usize {
        self.sent.lock().await.len()
    }
}

#[async_trait]
impl Notifier for MockNotifier {
    fn name(&self) -> &str {
        "mock-notifier"
    }

    async fn notify(&self, user_id: &str, message: &str) -> Result<(), RestockError> {
        self.sent
            .lock()
            .await
            .push((user_id.to_string(), message.to_string()));
        if self.failing.load(Ordering::SeqCst) {
            return Err(RestockError::Notifier {
                message: "mock delivery failure".into(),
                source: None,
            });
        }
        Ok(())
    }
}
