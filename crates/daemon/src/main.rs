// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! pulsed: the health-check scheduler daemon.
//!
//! Wires the generic task/change work model (`pulse-state`/`pulse-runner`),
//! the ensure loop (`pulse-overlord`), and the check scheduler
//! (`pulse-checkstate`) together, loads the configured plan, and serves
//! until a termination signal arrives.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod config;
mod env;
mod plan;
mod probe;

use std::sync::Arc;

use pulse_checkstate::CheckManagerBuilder;
use pulse_core::{Clock, SystemClock};
use pulse_overlord::{Intervals, Manager, Overlord};
use pulse_runner::TaskRunner;
use pulse_state::{load_state_document, Checkpointer, PatchRegistry, State};
use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info, warn};

use config::Config;
use probe::DefaultCheckerFactory;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    if let Some(arg) = std::env::args().nth(1) {
        match arg.as_str() {
            "--version" | "-V" | "-v" => {
                println!("pulsed {}", env!("CARGO_PKG_VERSION"));
                return Ok(());
            }
            "--help" | "-h" | "help" => {
                print_help();
                return Ok(());
            }
            _ => {
                eprintln!("error: unexpected argument '{arg}'");
                eprintln!("Usage: pulsed [--help | --version]");
                std::process::exit(1);
            }
        }
    }

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive("pulse_daemon=info".parse()?))
        .init();

    let config = Config::load()?;
    info!(state_dir = %config.state_dir.display(), "starting pulsed");

    let doc = load_state_document(&config.state_path, &PatchRegistry::new())?;
    let state = Arc::new(State::new(doc));
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let checkpointer = Checkpointer::new(config.state_path.clone());

    let builder = CheckManagerBuilder::new(Arc::new(DefaultCheckerFactory));
    builder.add_failure_handler("log-threshold-breach", Arc::new(|check_name: &str| {
        warn!(check = check_name, "check reached failure threshold");
    }));

    let runner = TaskRunner::new(Arc::clone(&state), builder.handler_registry(), Arc::clone(&clock));
    let check_manager = builder.finish(Arc::clone(&runner), Arc::clone(&clock));

    let intervals = Intervals {
        ensure: env::ensure_interval_ms().unwrap_or(Intervals::default().ensure),
        ..Intervals::default()
    };
    let overlord = Arc::new(Overlord::new(
        Arc::clone(&state),
        Arc::clone(&runner),
        Arc::clone(&clock),
        checkpointer,
        vec![check_manager.clone() as Arc<dyn Manager>],
        intervals,
    ));

    overlord.start_up()?;

    match plan::load_plan(&config.plan_path) {
        Ok(configs) => {
            info!(count = configs.len(), "loaded check plan");
            check_manager.plan(&state, configs);
        }
        Err(err) => {
            error!(?err, "failed to load check plan, starting with no checks configured");
        }
    }

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    println!("READY");
    info!("pulsed ready");

    let serve_handle = {
        let overlord = Arc::clone(&overlord);
        tokio::spawn(async move {
            overlord.serve().await;
        })
    };

    tokio::select! {
        _ = sigterm.recv() => {
            info!("received SIGTERM, shutting down");
        }
        _ = sigint.recv() => {
            info!("received SIGINT, shutting down");
        }
    }

    overlord.shutdown().await;
    serve_handle.abort();

    info!("pulsed stopped");
    Ok(())
}

fn print_help() {
    println!("pulsed {}", env!("CARGO_PKG_VERSION"));
    println!("pulse health-check scheduler daemon");
    println!();
    println!("USAGE:");
    println!("    pulsed");
    println!();
    println!("Reads its plan from $PULSE_STATE_DIR/plan.json (or $PULSE_PLAN_PATH)");
    println!("and persists durable state under $PULSE_STATE_DIR.");
    println!();
    println!("OPTIONS:");
    println!("    -h, --help       Print help information");
    println!("    -v, --version    Print version information");
}

#[cfg(test)]
#[path = "main_tests.rs"]
mod tests;
