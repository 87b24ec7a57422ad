// SPDX-FileCopyrightText: 2026 Restock Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./restock.toml` > `~/.config/restock/restock.toml` > `/etc/restock/restock.toml`
//! with environment variable overrides via `RESTOCK_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external

use std::path::{Path, PathBuf};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::RestockConfig;

/// System-wide configuration file.
pub const SYSTEM_CONFIG_PATH: &str = "/etc/restock/restock.toml";

/// Configuration file looked up in the working directory.
pub const LOCAL_CONFIG_FILE: &str = "restock.toml";

/// Top-level sections, used to map `RESTOCK_<SECTION>_<KEY>` onto `section.key`.
const SECTIONS: &[&str] = &[
    "service",
    "storage",
    "marketplace",
    "worker",
    "pricing",
    "automation",
    "watcher",
    "telegram",
];

/// Path of the per-user configuration file, if the platform has a config dir.
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("restock").join(LOCAL_CONFIG_FILE))
}

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/restock/restock.toml`
/// 3. `~/.config/restock/restock.toml`
/// 4. `./restock.toml`
/// 5. `RESTOCK_*` environment variables
pub fn load_config() -> Result<RestockConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env).
pub fn load_config_from_str(toml_content: &str) -> Result<RestockConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(RestockConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<RestockConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(RestockConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used for config loading, before extraction.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(RestockConfig::default()))
        .merge(Toml::file(SYSTEM_CONFIG_PATH))
        .merge(Toml::file(user_config_path().unwrap_or_default()))
        .merge(Toml::file(LOCAL_CONFIG_FILE))
        .merge(env_provider())
}

/// Environment provider mapping `RESTOCK_WORKER_STALE_TIMEOUT_SECS` to
/// `worker.stale_timeout_secs`.
///
/// Only the first underscore after a known section name becomes a dot; key
/// names keep their own underscores.
fn env_provider() -> Env {
    Env::prefixed("RESTOCK_").map(|key| map_env_key(key.as_str()).into())
}

fn map_env_key(key: &str) -> String {
    for section in SECTIONS {
        if let Some(rest) = key
            .strip_prefix(section)
            .and_then(|r| r.strip_prefix('_'))
        {
            return format!("{section}.{rest}");
        }
    }
    key.to_string()
}
