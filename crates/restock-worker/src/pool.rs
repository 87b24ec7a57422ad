// SPDX-FileCopyrightText: 2026 Restock Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! N concurrent pull loops over the shared queue.

use std::sync::Arc;
use std::time::Duration;

use restock_config::model::WorkerConfig;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::executor::MoveExecutor;

/// Runs `workers` independent claim/execute/complete loops.
///
/// Coordination between workers is the queue's atomic claim only. On
/// cancellation idle workers stop at once; busy workers finish their task.
pub struct WorkerPool {
    executor: Arc<MoveExecutor>,
    workers: usize,
    poll_interval: Duration,
}

impl WorkerPool {
    pub fn new(executor: Arc<MoveExecutor>, workers: usize, poll_interval: Duration) -> Self {
        Self {
            executor,
            workers: workers.max(1),
            poll_interval,
        }
    }

    pub fn from_config(executor: Arc<MoveExecutor>, config: &WorkerConfig) -> Self {
        Self::new(
            executor,
            config.workers,
            Duration::from_millis(config.poll_interval_ms),
        )
    }

    /// Run until `cancel` fires and every worker has drained.
    pub async fn run(&self, cancel: CancellationToken) {
        info!(workers = self.workers, "worker pool starting");
        let mut set = JoinSet::new();
        for worker_id in 0..self.workers {
            set.spawn(worker_loop(
                worker_id,
                self.executor.clone(),
                self.poll_interval,
                cancel.clone(),
            ));
        }
        while let Some(joined) = set.join_next().await {
            if let Err(e) = joined {
                error!(error = %e, "worker task panicked");
            }
        }
        info!("worker pool stopped");
    }
}

async fn worker_loop(
    worker_id: usize,
    executor: Arc<MoveExecutor>,
    poll_interval: Duration,
    cancel: CancellationToken,
) {
    debug!(worker_id, "worker started");
    while !cancel.is_cancelled() {
        let idle = match executor.process_next().await {
            Ok(Some(report)) => {
                debug!(worker_id, task_id = %report.task_id, completion = ?report.completion, "task processed");
                false
            }
            Ok(None) => true,
            Err(e) => {
                error!(worker_id, error = %e, "worker iteration failed");
                true
            }
        };
        if idle {
            tokio::select! {
                _ = tokio::time::sleep(poll_interval) => {}
                _ = cancel.cancelled() => break,
            }
        }
    }
    debug!(worker_id, "worker stopped");
}
