// SPDX-FileCopyrightText: 2026 Restock Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Acceptance coefficient watcher.
//!
//! Polls coefficients through the gateway, diffs them against the previous
//! poll and lifts the priority of pending tasks whose target warehouse just
//! became attractive.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use restock_config::model::WatcherConfig;
use restock_core::{RestockError, TaskQueue};
use restock_marketplace::{ChangeDetector, RateLimitedGateway};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub struct CoefficientWatcher {
    gateway: Arc<RateLimitedGateway>,
    queue: Arc<dyn TaskQueue>,
    detector: Mutex<ChangeDetector>,
    warehouse_ids: Vec<i64>,
    boost_threshold: i64,
    interval: Duration,
}

impl CoefficientWatcher {
    pub fn new(
        gateway: Arc<RateLimitedGateway>,
        queue: Arc<dyn TaskQueue>,
        config: &WatcherConfig,
    ) -> Self {
        Self {
            gateway,
            queue,
            detector: Mutex::new(ChangeDetector::new()),
            warehouse_ids: config.warehouse_ids.clone(),
            boost_threshold: config.boost_threshold,
            interval: Duration::from_secs(config.poll_interval_secs),
        }
    }

    /// One poll. Returns how many pending tasks were boosted.
    pub async fn poll_once(&self) -> Result<usize, RestockError> {
        let coefficients = self
            .gateway
            .acceptance_coefficients(&self.warehouse_ids)
            .await?;
        let changes = self.detector.lock().await.observe(&coefficients);
        debug!(rows = coefficients.len(), changes = changes.len(), "coefficients polled");

        // Best score per warehouse.
        let mut best: HashMap<i64, i64> = HashMap::new();
        for change in changes.iter().filter(|c| c.score >= self.boost_threshold) {
            let entry = best.entry(change.warehouse_id).or_insert(change.score);
            *entry = (*entry).max(change.score);
        }

        let mut boosted = 0;
        for (warehouse_id, score) in best {
            boosted += self.queue.boost_waiting(warehouse_id, score).await?;
        }
        if boosted > 0 {
            metrics::counter!("restock_tasks_boosted_total").increment(boosted as u64);
            info!(boosted, "waiting tasks boosted after coefficient change");
        }
        Ok(boosted)
    }

    pub async fn run(&self, cancel: CancellationToken) {
        let mut interval = tokio::time::interval(self.interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if let Err(e) = self.poll_once().await {
                        warn!(error = %e, "coefficient poll failed (non-fatal)");
                    }
                }
                _ = cancel.cancelled() => {
                    info!("coefficient watcher shutting down");
                    break;
                }
            }
        }
    }
}
