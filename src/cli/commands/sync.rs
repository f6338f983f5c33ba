//! Sync and mode commands.

use crate::cli::context::{open_cache, open_remote, runtime, CommandContext};
use crate::cli::{ModeArg, SyncCommands};
use crate::config::load_config;
use crate::error::{Error, Result};
use crate::sync::{
    get_sync_status, go_offline, go_online, print_status, reconcile, HttpConnectivity,
    StaticConnectivity, SyncOutcome, SyncReport, SyncWorker, WorkerConfig, WorkerSummary,
};
use colored::Colorize;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::info;

/// Execute sync commands.
pub fn execute(
    command: &SyncCommands,
    db_path: Option<&PathBuf>,
    remote_path: Option<&PathBuf>,
    json: bool,
) -> Result<()> {
    match command {
        SyncCommands::Run => run(db_path, remote_path, json),
        SyncCommands::Status => status(db_path, remote_path, json),
        SyncCommands::Watch {
            until_idle,
            assume_online,
        } => watch_loop(*until_idle, *assume_online, db_path, remote_path, json),
    }
}

fn run(db_path: Option<&PathBuf>, remote_path: Option<&PathBuf>, json: bool) -> Result<()> {
    let mut cache = open_cache(db_path)?;
    let remote = open_remote(remote_path)?;
    let report = runtime()?.block_on(reconcile(&remote, &mut cache));

    print_report(&report, json)?;
    outcome_to_result(&report.outcome)
}

fn status(db_path: Option<&PathBuf>, remote_path: Option<&PathBuf>, json: bool) -> Result<()> {
    let ctx = CommandContext::open(db_path, remote_path)?;
    let status = get_sync_status(&ctx.cache, &ctx.session)?;

    if json {
        println!("{}", serde_json::to_string(&status)?);
    } else {
        print_status(&status);
    }
    Ok(())
}

fn watch_loop(
    until_idle: bool,
    assume_online: bool,
    db_path: Option<&PathBuf>,
    remote_path: Option<&PathBuf>,
    json: bool,
) -> Result<()> {
    let cache = open_cache(db_path)?;
    let remote = Arc::new(open_remote(remote_path)?);
    let settings = load_config()?.sync;
    let config = WorkerConfig {
        retry_delay: settings.retry_delay(),
        poll_interval: settings.poll_interval(),
        stop_when_idle: until_idle,
    };

    let rt = runtime()?;
    let summary = rt.block_on(async {
        let (shutdown, receiver) = watch::channel(false);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Interrupted, stopping sync worker");
                shutdown.send_replace(true);
            }
        });

        if assume_online {
            SyncWorker::new(remote, cache, StaticConnectivity::new(true), config)
                .run(receiver)
                .await
        } else {
            let probe = HttpConnectivity::new(&settings.probe_url);
            SyncWorker::new(remote, cache, probe, config).run(receiver).await
        }
    });

    print_summary(&summary, json)?;
    match &summary.last_outcome {
        Some(outcome) => outcome_to_result(outcome),
        None => Ok(()),
    }
}

/// Switch between online and offline mode.
///
/// # Errors
///
/// Returns an error if pending changes could not be pushed when going online.
pub fn mode(
    mode: ModeArg,
    db_path: Option<&PathBuf>,
    remote_path: Option<&PathBuf>,
    json: bool,
) -> Result<()> {
    let mut ctx = CommandContext::open(db_path, remote_path)?;

    match mode {
        ModeArg::Offline => {
            go_offline(&mut ctx.session);
            ctx.save_session()?;
            if json {
                println!("{}", serde_json::json!({ "mode": ctx.session.mode }));
            } else {
                println!("Offline mode. Changes will sync when you go online.");
            }
            Ok(())
        }
        ModeArg::Online => {
            let report = runtime()?.block_on(go_online(&ctx.remote, &mut ctx.cache, &mut ctx.session));
            ctx.save_session()?;
            if json {
                let output = serde_json::json!({ "mode": ctx.session.mode, "sync": report });
                println!("{}", serde_json::to_string(&output)?);
            } else if report.outcome.is_success() {
                if report.stats.cleared > 0 {
                    println!("Pushed {} offline change(s).", report.stats.cleared);
                }
                println!("Online mode.");
            } else {
                println!("{}", "Still offline: pending changes could not be pushed.".yellow());
            }
            outcome_to_result(&report.outcome)
        }
    }
}

fn outcome_to_result(outcome: &SyncOutcome) -> Result<()> {
    match outcome {
        SyncOutcome::Success => Ok(()),
        SyncOutcome::Retry(reason) => Err(Error::Remote(format!("sync incomplete, retry later: {reason}"))),
        SyncOutcome::Failure(reason) => Err(Error::Other(format!("sync failed: {reason}"))),
    }
}

fn print_report(report: &SyncReport, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string(report)?);
        return Ok(());
    }

    let stats = &report.stats;
    if stats.pending == 0 {
        println!("Nothing to sync.");
        return Ok(());
    }

    println!("{}", "Sync".bold().underline());
    println!("  Added:   {}", stats.inserted);
    if stats.already_present > 0 {
        println!("  Already on list: {}", stats.already_present);
    }
    println!("  Removed: {}", stats.deleted);
    if stats.remaining() > 0 {
        println!("  {}: {}", "Still pending".yellow(), stats.remaining());
    }
    Ok(())
}

fn print_summary(summary: &WorkerSummary, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string(summary)?);
    } else {
        println!(
            "Sync worker stopped after {} pass(es), {} change(s) pushed, {} retr{}.",
            summary.passes,
            summary.cleared,
            summary.retries,
            if summary.retries == 1 { "y" } else { "ies" }
        );
    }
    Ok(())
}
