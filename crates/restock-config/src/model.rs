// SPDX-FileCopyrightText: 2026 Restock Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Restock move pipeline.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level Restock configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RestockConfig {
    /// Service identity and logging.
    #[serde(default)]
    pub service: ServiceConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Marketplace API gateway settings.
    #[serde(default)]
    pub marketplace: MarketplaceConfig,

    /// Worker pool settings.
    #[serde(default)]
    pub worker: WorkerConfig,

    /// Per-move fee.
    #[serde(default)]
    pub pricing: PricingConfig,

    /// Automation collaborator settings.
    #[serde(default)]
    pub automation: AutomationConfig,

    /// Acceptance coefficient watcher settings.
    #[serde(default)]
    pub watcher: WatcherConfig,

    /// Telegram notifier settings.
    #[serde(default)]
    pub telegram: TelegramConfig,
}

/// Service identity and logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceConfig {
    /// Display name used in logs.
    #[serde(default = "default_service_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: default_service_name(),
            log_level: default_log_level(),
        }
    }
}

fn default_service_name() -> String {
    "restock".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("restock").join("restock.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("restock.db"))
        .to_string_lossy()
        .into_owned()
}

fn default_wal_mode() -> bool {
    true
}

/// Advertised request limit of one endpoint class.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct EndpointLimit {
    /// Requests allowed per period, as advertised by the marketplace.
    pub requests: u32,

    /// Length of the period in seconds.
    pub period_secs: u64,
}

impl EndpointLimit {
    pub const fn per_minute(requests: u32) -> Self {
        Self {
            requests,
            period_secs: 60,
        }
    }
}

/// Marketplace API gateway configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MarketplaceConfig {
    /// Base URL of the supplies API.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// API token sent in the `Authorization` header. `None` disables API calls.
    #[serde(default)]
    pub api_token: Option<String>,

    /// Fraction of the advertised limit the gateway allows itself (0.0-1.0].
    #[serde(default = "default_safety_margin")]
    pub safety_margin: f64,

    /// Acceptance coefficient lookups.
    #[serde(default = "default_coefficients_limit")]
    pub coefficients_limit: EndpointLimit,

    /// Warehouse listing.
    #[serde(default = "default_warehouses_limit")]
    pub warehouses_limit: EndpointLimit,

    /// Supply lookups.
    #[serde(default = "default_supplies_limit")]
    pub supplies_limit: EndpointLimit,

    /// Everything else.
    #[serde(default = "default_general_limit")]
    pub general_limit: EndpointLimit,

    /// Per-request HTTP timeout in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Attempts for transient network failures (including the first).
    #[serde(default = "default_max_network_attempts")]
    pub max_network_attempts: u32,

    /// Base delay of the exponential backoff, in milliseconds.
    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,

    /// Cap of the exponential backoff, in milliseconds.
    #[serde(default = "default_backoff_cap_ms")]
    pub backoff_cap_ms: u64,
}

impl Default for MarketplaceConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_token: None,
            safety_margin: default_safety_margin(),
            coefficients_limit: default_coefficients_limit(),
            warehouses_limit: default_warehouses_limit(),
            supplies_limit: default_supplies_limit(),
            general_limit: default_general_limit(),
            request_timeout_secs: default_request_timeout_secs(),
            max_network_attempts: default_max_network_attempts(),
            backoff_base_ms: default_backoff_base_ms(),
            backoff_cap_ms: default_backoff_cap_ms(),
        }
    }
}

fn default_base_url() -> String {
    "https://supplies-api.wildberries.ru".to_string()
}

fn default_safety_margin() -> f64 {
    0.8
}

fn default_coefficients_limit() -> EndpointLimit {
    EndpointLimit::per_minute(6)
}

fn default_warehouses_limit() -> EndpointLimit {
    EndpointLimit::per_minute(6)
}

fn default_supplies_limit() -> EndpointLimit {
    EndpointLimit::per_minute(30)
}

fn default_general_limit() -> EndpointLimit {
    EndpointLimit::per_minute(300)
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_max_network_attempts() -> u32 {
    3
}

fn default_backoff_base_ms() -> u64 {
    2_000
}

fn default_backoff_cap_ms() -> u64 {
    10_000
}

/// Worker pool configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct WorkerConfig {
    /// Number of concurrent workers.
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Sleep between polls of an empty queue, in milliseconds.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// How often the stale sweep runs, in seconds.
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,

    /// A task processing longer than this is presumed abandoned.
    #[serde(default = "default_stale_timeout_secs")]
    pub stale_timeout_secs: u64,

    /// Upper bound for one automation call; exceeding it counts as ERROR.
    #[serde(default = "default_automation_timeout_secs")]
    pub automation_timeout_secs: u64,

    /// Attempts given to newly submitted tasks.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            poll_interval_ms: default_poll_interval_ms(),
            sweep_interval_secs: default_sweep_interval_secs(),
            stale_timeout_secs: default_stale_timeout_secs(),
            automation_timeout_secs: default_automation_timeout_secs(),
            max_attempts: default_max_attempts(),
        }
    }
}

fn default_workers() -> usize {
    3
}

fn default_poll_interval_ms() -> u64 {
    1_000
}

fn default_sweep_interval_secs() -> u64 {
    60
}

fn default_stale_timeout_secs() -> u64 {
    600 // 10 minutes
}

fn default_automation_timeout_secs() -> u64 {
    300
}

fn default_max_attempts() -> u32 {
    restock_core::types::DEFAULT_MAX_ATTEMPTS
}

/// Pricing configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PricingConfig {
    /// Fixed fee charged per move attempt, in whole currency units.
    #[serde(default = "default_move_fee")]
    pub move_fee: i64,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            move_fee: default_move_fee(),
        }
    }
}

fn default_move_fee() -> i64 {
    50
}

/// Automation collaborator configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AutomationConfig {
    /// URL of the automation sidecar's move endpoint.
    #[serde(default = "default_automation_endpoint")]
    pub endpoint: String,

    /// Check the target warehouse's coefficients before driving the browser.
    #[serde(default = "default_precheck")]
    pub precheck: bool,
}

impl Default for AutomationConfig {
    fn default() -> Self {
        Self {
            endpoint: default_automation_endpoint(),
            precheck: default_precheck(),
        }
    }
}

fn default_automation_endpoint() -> String {
    "http://127.0.0.1:8790/moves".to_string()
}

fn default_precheck() -> bool {
    true
}

/// Acceptance coefficient watcher configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct WatcherConfig {
    /// Enable the watcher. Requires `marketplace.api_token`.
    #[serde(default)]
    pub enabled: bool,

    /// Seconds between coefficient polls.
    #[serde(default = "default_watcher_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Warehouses to watch. Empty means all.
    #[serde(default)]
    pub warehouse_ids: Vec<i64>,

    /// Minimum change score that boosts waiting tasks.
    #[serde(default = "default_boost_threshold")]
    pub boost_threshold: i64,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            poll_interval_secs: default_watcher_poll_interval_secs(),
            warehouse_ids: Vec::new(),
            boost_threshold: default_boost_threshold(),
        }
    }
}

fn default_watcher_poll_interval_secs() -> u64 {
    15
}

fn default_boost_threshold() -> i64 {
    70
}

/// Telegram notifier configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TelegramConfig {
    /// Telegram Bot API token. `None` falls back to log-only notifications.
    #[serde(default)]
    pub bot_token: Option<String>,
}
