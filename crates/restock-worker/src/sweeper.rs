// SPDX-FileCopyrightText: 2026 Restock Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Periodic recovery of tasks whose worker went away.

use std::sync::Arc;
use std::time::Duration;

use restock_config::model::WorkerConfig;
use restock_core::types::TaskStatus;
use restock_core::{Notifier, RestockError, TaskQueue};
use restock_ledger::{BalanceLedger, Pricing};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::messages;

/// Sweeps stale PROCESSING tasks back through the retry path, refunds the
/// abandoned attempt and tells the user.
pub struct StaleSweeper {
    queue: Arc<dyn TaskQueue>,
    ledger: Arc<BalanceLedger>,
    notifier: Arc<dyn Notifier>,
    pricing: Pricing,
    stale_timeout: Duration,
    interval: Duration,
}

impl StaleSweeper {
    pub fn new(
        queue: Arc<dyn TaskQueue>,
        ledger: Arc<BalanceLedger>,
        notifier: Arc<dyn Notifier>,
        pricing: Pricing,
        config: &WorkerConfig,
    ) -> Self {
        Self {
            queue,
            ledger,
            notifier,
            pricing,
            stale_timeout: Duration::from_secs(config.stale_timeout_secs),
            interval: Duration::from_secs(config.sweep_interval_secs),
        }
    }

    /// Override the staleness threshold.
    pub fn with_stale_timeout(mut self, timeout: Duration) -> Self {
        self.stale_timeout = timeout;
        self
    }

    /// One sweep. Returns how many tasks were recovered.
    pub async fn sweep_once(&self) -> Result<usize, RestockError> {
        let swept = self.queue.sweep_stale(self.stale_timeout).await?;
        for task in &swept {
            let fee = self.pricing.fee_for(task);
            let balance = match self
                .ledger
                .refund(&task.user_id, fee, &task.id, task.attempts)
                .await
            {
                Ok(balance) => Some(balance),
                Err(e) => {
                    warn!(task_id = %task.id, error = %e, "refund of abandoned attempt failed");
                    None
                }
            };
            let reason = task.error_message.as_deref().unwrap_or("worker timed out");
            let message = if task.status == TaskStatus::Pending {
                messages::requeued(task, reason)
            } else {
                messages::failed(task, reason, balance)
            };
            if let Err(e) = self.notifier.notify(&task.user_id, &message).await {
                warn!(task_id = %task.id, error = %e, "notification failed");
            }
        }
        if !swept.is_empty() {
            info!(count = swept.len(), "stale tasks recovered");
        }
        Ok(swept.len())
    }

    pub async fn run(&self, cancel: CancellationToken) {
        let mut interval = tokio::time::interval(self.interval);
        // Skip the first immediate tick.
        interval.tick().await;

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    match self.sweep_once().await {
                        Ok(0) => debug!("stale sweep found nothing"),
                        Ok(_) => {}
                        Err(e) => warn!(error = %e, "stale sweep failed"),
                    }
                }
                _ = cancel.cancelled() => {
                    info!("stale sweeper shutting down");
                    break;
                }
            }
        }
    }
}
