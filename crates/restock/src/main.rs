// SPDX-FileCopyrightText: 2026 Restock Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Restock - moves marketplace inventory between warehouses for sellers.
//!
//! This is the binary entry point: `serve` runs the pipeline, the other
//! subcommands are operator tools over the same database.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod commands;
mod serve;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use restock_config::RestockConfig;

/// Restock - marketplace inventory move service.
#[derive(Parser, Debug)]
#[command(name = "restock", version, about, long_about = None)]
struct Cli {
    /// Read configuration from this file instead of the XDG hierarchy.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the worker pool, stale sweeper and coefficient watcher.
    Serve,
    /// Submit a move request.
    Enqueue {
        #[arg(long)]
        user: String,
        #[arg(long)]
        session: String,
        /// Article identifier.
        #[arg(long)]
        item: String,
        /// Source warehouse id.
        #[arg(long)]
        from: i64,
        /// Target warehouse id.
        #[arg(long)]
        to: i64,
        #[arg(long)]
        quantity: u32,
        #[arg(long, default_value_t = 0)]
        priority: i64,
        /// Link to the front end's request record.
        #[arg(long)]
        request_id: Option<String>,
        #[arg(long)]
        json: bool,
    },
    /// Show one task, or the latest tasks of a user.
    Status {
        task_id: Option<String>,
        #[arg(long, conflicts_with = "task_id")]
        user: Option<String>,
        #[arg(long, default_value_t = 10)]
        limit: usize,
        #[arg(long)]
        json: bool,
    },
    /// Cancel a task that has not been picked up yet.
    Cancel { task_id: String },
    /// Top up a user's balance.
    Credit {
        user: String,
        amount: i64,
        /// Payment reference; a replay with the same reference is ignored.
        #[arg(long)]
        reference: Option<String>,
    },
    /// Show a user's balance.
    Balance {
        user: String,
        #[arg(long)]
        json: bool,
    },
    /// Task counts by status.
    Stats {
        #[arg(long)]
        json: bool,
    },
}

fn load_config(path: Option<&PathBuf>) -> RestockConfig {
    let loaded = match path {
        Some(path) => restock_config::load_and_validate_path(path),
        None => restock_config::load_and_validate(),
    };
    match loaded {
        Ok(config) => config,
        Err(errors) => {
            restock_config::render_errors(&errors);
            std::process::exit(1);
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_ref());

    let result = match cli.command {
        Commands::Serve => serve::run_serve(config).await,
        Commands::Enqueue {
            user,
            session,
            item,
            from,
            to,
            quantity,
            priority,
            request_id,
            json,
        } => {
            let request = restock_core::MoveRequest {
                user_id: user,
                session_id: session,
                request_id,
                item,
                source_warehouse_id: from,
                target_warehouse_id: to,
                quantity,
                priority,
                max_attempts: config.worker.max_attempts,
            };
            commands::run_enqueue(&config, request, json)
                .await
                .map(|_| ())
        }
        Commands::Status {
            task_id,
            user,
            limit,
            json,
        } => commands::run_status(&config, task_id.as_deref(), user.as_deref(), limit, json).await,
        Commands::Cancel { task_id } => commands::run_cancel(&config, &task_id).await,
        Commands::Credit {
            user,
            amount,
            reference,
        } => commands::run_credit(&config, &user, amount, reference)
            .await
            .map(|_| ()),
        Commands::Balance { user, json } => commands::run_balance(&config, &user, json).await,
        Commands::Stats { json } => commands::run_stats(&config, json).await,
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[cfg(not(target_env = "msvc"))]
    fn jemalloc_is_active() {
        use tikv_jemalloc_ctl::{epoch, stats};
        epoch::advance().unwrap();
        let allocated = stats::allocated::read().unwrap();
        assert!(allocated > 0, "jemalloc should report non-zero allocation");
    }

    #[test]
    fn parses_enqueue_arguments() {
        let cli = Cli::try_parse_from([
            "restock", "enqueue", "--user", "42", "--session", "s1", "--item", "168245517",
            "--from", "507", "--to", "117986", "--quantity", "12", "--priority", "5",
        ])
        .unwrap();
        match cli.command {
            Commands::Enqueue {
                quantity, priority, to, ..
            } => {
                assert_eq!(quantity, 12);
                assert_eq!(priority, 5);
                assert_eq!(to, 117986);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn status_rejects_task_and_user_together() {
        let parsed = Cli::try_parse_from(["restock", "status", "t-1", "--user", "42"]);
        assert!(parsed.is_err());
    }

    #[test]
    fn global_config_flag_is_accepted_after_subcommand() {
        let cli = Cli::try_parse_from(["restock", "stats", "--config", "/tmp/r.toml"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/r.toml")));
    }
}
