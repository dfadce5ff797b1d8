// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Runsync Control CLI
//!
//! Operator tool that runs reconciliation in-process against the run store
//! and the workflow engine, without going through the admin API.
//!
//! Usage:
//!   runsync-ctl <command> [options]
//!
//! Commands:
//!   status                        Report running runs that need attention
//!   sync-all                      Reconcile every running run
//!   sync <run_id>                 Reconcile one run
//!   force-fail <run_id> --reason <text>

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use runsync_engine_sdk::ExecutionsClient;
use runsync_reconciler::clock::SystemClock;
use runsync_reconciler::config::Config;
use runsync_reconciler::persistence;
use runsync_reconciler::reconciler::{Reconciler, ReconcilerConfig};
use serde::Serialize;
use tracing::warn;

fn print_usage() {
    eprintln!(
        r#"Usage: runsync-ctl <command> [options]

Reconcile workflow runs against the workflow engine.

COMMANDS:
    status                          Report running runs that need attention
    sync-all                        Reconcile every running run
    sync <run_id>                   Reconcile one run
    force-fail <run_id>             Mark a run as failed

FORCE-FAIL OPTIONS:
    --reason <text>                 Error message recorded on the run (required)

ENVIRONMENT:
    RUNSYNC_DATABASE_URL            Run store URL (required)
    RUNSYNC_ENGINE_URL              Executions API base URL
    RUNSYNC_ENGINE_ACCESS_TOKEN     Bearer token for the executions API
    RUNSYNC_STALE_THRESHOLD_SECS    Staleness threshold (default: 21600)
    RUNSYNC_FETCH_TIMEOUT_MS        Per-fetch timeout (default: 15000)

EXAMPLES:
    # Which running runs are stale or out of sync?
    runsync-ctl status

    # Fix a single run
    runsync-ctl sync run_123

    # Give up on a run the engine cannot explain
    runsync-ctl force-fail run_123 --reason "stuck after engine migration"
"#
    );
}

#[derive(Debug, PartialEq, Eq)]
enum Command {
    Status,
    SyncAll,
    Sync { run_id: String },
    ForceFail { run_id: String, reason: String },
}

fn parse_args() -> Result<Command, String> {
    let args: Vec<String> = std::env::args().collect();
    parse_args_from_vec(&args)
}

fn parse_args_from_vec(args: &[String]) -> Result<Command, String> {
    if args.len() < 2 {
        return Err("No command specified".to_string());
    }

    match args[1].as_str() {
        "help" | "--help" | "-h" => {
            print_usage();
            std::process::exit(0);
        }
        "status" => Ok(Command::Status),
        "sync-all" => Ok(Command::SyncAll),
        "sync" => {
            let run_id = args.get(2).ok_or("sync requires a run ID")?.clone();
            Ok(Command::Sync { run_id })
        }
        "force-fail" => {
            let run_id = args.get(2).ok_or("force-fail requires a run ID")?.clone();
            let mut reason: Option<String> = None;

            let mut i = 3;
            while i < args.len() {
                match args[i].as_str() {
                    "--reason" => {
                        i += 1;
                        reason = Some(args.get(i).ok_or("--reason requires a value")?.clone());
                    }
                    arg => return Err(format!("Unknown argument: {}", arg)),
                }
                i += 1;
            }

            let reason = reason.ok_or("--reason is required")?;
            if reason.trim().is_empty() {
                return Err("--reason must not be empty".to_string());
            }

            Ok(Command::ForceFail { run_id, reason })
        }
        cmd => Err(format!("Unknown command: {}", cmd)),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "runsync_reconciler=warn,runsync_ctl=warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cmd = match parse_args() {
        Ok(cmd) => cmd,
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!();
            print_usage();
            return ExitCode::FAILURE;
        }
    };

    load_env_file(dotenvy::dotenv());

    let reconciler = match build_reconciler().await {
        Ok(r) => r,
        Err(e) => {
            eprintln!("Failed to initialize: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match execute_command(&reconciler, cmd).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

/// Report the outcome of loading `.env`, returning the file that was loaded.
fn load_env_file(result: dotenvy::Result<PathBuf>) -> Option<PathBuf> {
    match result {
        Ok(path) => Some(path),
        Err(e) => {
            warn!("No .env file loaded: {}", e);
            None
        }
    }
}

async fn build_reconciler() -> anyhow::Result<Reconciler> {
    let config = Config::from_env()?;
    let store = persistence::connect(&config.database_url).await?;
    let engine = Arc::new(ExecutionsClient::from_env()?);

    Ok(Reconciler::new(
        store,
        engine,
        Arc::new(SystemClock),
        ReconcilerConfig::from(&config),
    ))
}

async fn execute_command(reconciler: &Reconciler, cmd: Command) -> Result<(), String> {
    match cmd {
        Command::Status => {
            let summary = reconciler.status_summary().await.map_err(|e| e.to_string())?;
            print_json(&summary)
        }
        Command::SyncAll => {
            let report = reconciler.reconcile_all().await.map_err(|e| e.to_string())?;
            print_json(&report)
        }
        Command::Sync { run_id } => {
            let result = reconciler
                .reconcile_run(&run_id)
                .await
                .map_err(|e| e.to_string())?;
            print_json(&result)
        }
        Command::ForceFail { run_id, reason } => {
            let result = reconciler
                .force_mark_failed(&run_id, reason.trim())
                .await
                .map_err(|e| e.to_string())?;
            print_json(&result)
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<(), String> {
    println!(
        "{}",
        serde_json::to_string_pretty(value).map_err(|e| e.to_string())?
    );
    Ok(())
}
