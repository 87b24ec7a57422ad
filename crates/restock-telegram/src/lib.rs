// SPDX-FileCopyrightText: 2026 Restock Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Telegram notifier for Restock.
//!
//! Users talk to the front-end bot, so their Telegram user id doubles as the
//! private chat id the notification goes to.

use async_trait::async_trait;
use restock_config::model::TelegramConfig;
use restock_core::{Notifier, RestockError};
use teloxide::prelude::*;
use teloxide::types::{ChatId, Recipient};
use tracing::debug;

/// Delivers notifications as plain-text Telegram messages.
pub struct TelegramNotifier {
    bot: Bot,
}

impl TelegramNotifier {
    /// Requires `telegram.bot_token` to be set.
    pub fn new(config: &TelegramConfig) -> Result<Self, RestockError> {
        let token = config.bot_token.as_deref().ok_or_else(|| {
            RestockError::Config("telegram.bot_token is required for the Telegram notifier".into())
        })?;
        if token.trim().is_empty() {
            return Err(RestockError::Config(
                "telegram.bot_token cannot be empty".into(),
            ));
        }
        Ok(Self {
            bot: Bot::new(token),
        })
    }

    pub fn bot(&self) -> &Bot {
        &self.bot
    }
}

/// Telegram chat id of a user id.
fn chat_id(user_id: &str) -> Result<ChatId, RestockError> {
    user_id
        .trim()
        .parse::<i64>()
        .map(ChatId)
        .map_err(|_| RestockError::Notifier {
            message: format!("user id {user_id:?} is not a Telegram chat id"),
            source: None,
        })
}

#[async_trait]
impl Notifier for TelegramNotifier {
    fn name(&self) -> &str {
        "telegram"
    }

    async fn notify(&self, user_id: &str, message: &str) -> Result<(), RestockError> {
        let chat = chat_id(user_id)?;
        self.bot
            .send_message(Recipient::Id(chat), message)
            .await
            .map_err(|e| {
                metrics::counter!("restock_notifications_failed_total").increment(1);
                RestockError::Notifier {
                    message: format!("failed to send message: {e}"),
                    source: Some(Box::new(e)),
                }
            })?;
        metrics::counter!("restock_notifications_sent_total").increment(1);
        debug!(user_id, "telegram notification sent");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_requires_bot_token() {
        assert!(TelegramNotifier::new(&TelegramConfig { bot_token: None }).is_err());
        assert!(
            TelegramNotifier::new(&TelegramConfig {
                bot_token: Some("  ".into())
            })
            .is_err()
        );
    }

    #[test]
    fn new_accepts_token() {
        let notifier = TelegramNotifier::new(&TelegramConfig {
            bot_token: Some("123:abc".into()),
        })
        .unwrap();
        assert_eq!(notifier.name(), "telegram");
    }

    #[test]
    fn user_ids_map_to_chat_ids() {
        assert_eq!(chat_id("42").unwrap(), ChatId(42));
        assert_eq!(chat_id(" -1001 ").unwrap(), ChatId(-1001));
    }

    #[tokio::test]
    async fn non_numeric_user_is_rejected_before_sending() {
        let notifier = TelegramNotifier::new(&TelegramConfig {
            bot_token: Some("123:abc".into()),
        })
        .unwrap();
        let err = notifier.notify("alice", "hi").await.unwrap_err();
        assert!(matches!(err, RestockError::Notifier { .. }));
    }
}
