// SPDX-FileCopyrightText: 2026 Restock Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `restock serve` command implementation.
//!
//! Opens the database, builds the collaborators from configuration and runs
//! the worker pool next to the stale sweeper and, when enabled, the
//! coefficient watcher. Everything stops on SIGINT/SIGTERM once in-flight
//! tasks have finished.

use std::sync::Arc;
use std::time::Duration;

use restock_config::RestockConfig;
use restock_core::{MoveAutomation, Notifier, RestockError, SessionStore, TaskQueue};
use restock_ledger::{BalanceLedger, Pricing};
use restock_marketplace::{QuotaPrecheck, RateLimitedGateway, RemoteAutomation};
use restock_storage::{Database, SqliteSessionStore, SqliteTaskQueue};
use restock_telegram::TelegramNotifier;
use restock_worker::{
    CoefficientWatcher, LogNotifier, MoveExecutor, StaleSweeper, WorkerPool, shutdown,
};
use tracing::{info, warn};

/// Runs the `restock serve` command.
pub async fn run_serve(config: RestockConfig) -> Result<(), RestockError> {
    init_tracing(&config.service.log_level);
    info!(name = %config.service.name, "starting restock serve");

    let db = Database::from_config(&config.storage).await?;
    let queue: Arc<dyn TaskQueue> = Arc::new(SqliteTaskQueue::new(db.clone()));
    let sessions: Arc<dyn SessionStore> = Arc::new(SqliteSessionStore::new(db.clone()));
    let ledger = Arc::new(BalanceLedger::new(db.clone()));
    let pricing = Pricing::from_config(&config.pricing);

    let gateway = match config.marketplace.api_token {
        Some(_) => Some(Arc::new(RateLimitedGateway::new(&config.marketplace)?)),
        None => {
            info!("no marketplace api token, gateway disabled");
            None
        }
    };

    let notifier = build_notifier(&config)?;
    let automation = build_automation(&config, gateway.clone())?;
    info!(
        automation = automation.name(),
        notifier = notifier.name(),
        move_fee = pricing.move_fee(),
        "collaborators ready"
    );

    let executor = Arc::new(
        MoveExecutor::new(
            queue.clone(),
            sessions,
            ledger.clone(),
            automation,
            notifier.clone(),
            pricing,
        )
        .with_automation_timeout(Duration::from_secs(config.worker.automation_timeout_secs)),
    );
    let pool = WorkerPool::from_config(executor, &config.worker);
    let sweeper = Arc::new(StaleSweeper::new(
        queue.clone(),
        ledger,
        notifier,
        pricing,
        &config.worker,
    ));

    // Tasks left processing by a previous run.
    match sweeper.sweep_once().await {
        Ok(0) => {}
        Ok(count) => info!(count, "recovered tasks from previous run"),
        Err(e) => warn!(error = %e, "startup sweep failed"),
    }

    let cancel = shutdown::install_signal_handler();
    let mut background = Vec::new();

    {
        let sweeper = sweeper.clone();
        let cancel = cancel.clone();
        background.push(tokio::spawn(async move { sweeper.run(cancel).await }));
        info!(
            interval_secs = config.worker.sweep_interval_secs,
            stale_timeout_secs = config.worker.stale_timeout_secs,
            "stale sweeper started"
        );
    }

    match (&gateway, config.watcher.enabled) {
        (Some(gateway), true) => {
            let watcher = CoefficientWatcher::new(gateway.clone(), queue.clone(), &config.watcher);
            let cancel = cancel.clone();
            background.push(tokio::spawn(async move { watcher.run(cancel).await }));
            info!(
                interval_secs = config.watcher.poll_interval_secs,
                warehouses = config.watcher.warehouse_ids.len(),
                "coefficient watcher started"
            );
        }
        (None, true) => warn!("coefficient watcher needs a marketplace api token"),
        (_, false) => info!("coefficient watcher disabled"),
    }

    pool.run(cancel.clone()).await;

    for handle in background {
        if let Err(e) = handle.await {
            warn!(error = %e, "background task ended abnormally");
        }
    }

    db.close().await?;
    info!("restock serve shutdown complete");
    Ok(())
}

fn build_notifier(config: &RestockConfig) -> Result<Arc<dyn Notifier>, RestockError> {
    match config.telegram.bot_token {
        Some(_) => Ok(Arc::new(TelegramNotifier::new(&config.telegram)?)),
        None => {
            info!("no telegram bot token, notifications go to the log");
            Ok(Arc::new(LogNotifier))
        }
    }
}

fn build_automation(
    config: &RestockConfig,
    gateway: Option<Arc<RateLimitedGateway>>,
) -> Result<Arc<dyn MoveAutomation>, RestockError> {
    let remote: Arc<dyn MoveAutomation> = Arc::new(RemoteAutomation::new(
        &config.automation,
        Duration::from_secs(config.worker.automation_timeout_secs),
    )?);
    match gateway {
        Some(gateway) if config.automation.precheck => {
            Ok(Arc::new(QuotaPrecheck::new(remote, gateway)))
        }
        _ => Ok(remote),
    }
}

/// Initializes the tracing subscriber with the given log level.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("restock={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use restock_config::model::TelegramConfig;

    #[test]
    fn log_notifier_without_bot_token() {
        let config = RestockConfig::default();
        assert_eq!(build_notifier(&config).unwrap().name(), "log");
    }

    #[test]
    fn telegram_notifier_with_bot_token() {
        let config = RestockConfig {
            telegram: TelegramConfig {
                bot_token: Some("123:abc".into()),
            },
            ..RestockConfig::default()
        };
        assert_eq!(build_notifier(&config).unwrap().name(), "telegram");
    }

    #[tokio::test]
    async fn precheck_wraps_remote_only_with_gateway() {
        let config = RestockConfig::default();
        assert_eq!(build_automation(&config, None).unwrap().name(), "remote");

        let mut with_token = RestockConfig::default();
        with_token.marketplace.api_token = Some("token".into());
        let gateway = Arc::new(RateLimitedGateway::new(&with_token.marketplace).unwrap());
        assert_eq!(
            build_automation(&with_token, Some(gateway)).unwrap().name(),
            "quota-precheck"
        );
    }
}
