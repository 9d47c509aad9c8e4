// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// printdock: shared-printer job scheduler daemon.

mod args;

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use clap::Parser;
use tokio::signal;
use tracing::{error, info, warn};

use printdock_core::{AppConfig, PrintdockError, Result, SubmissionForm};
use printdock_print::{JsonPrinterRegistry, PrintScheduler, SchedulerHandle, SystemPrintExecutor};

use crate::args::{Args, Command, ServeArgs};

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "printdock exited with an error");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<()> {
    let config = AppConfig::load(&args.config)?;

    match args.command {
        Command::Serve(serve_args) => serve(config, serve_args).await,
        Command::Printers => {
            let registry = JsonPrinterRegistry::open(&config.printers_path)?;
            println!("{}", serde_json::to_string_pretty(&registry.all()?)?);
            Ok(())
        }
        Command::TestPrinter { id } => {
            let registry = JsonPrinterRegistry::open(&config.printers_path)?;
            let report = registry.test_connection(&id, &config.executor).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(())
        }
    }
}

async fn serve(config: AppConfig, args: ServeArgs) -> Result<()> {
    info!("printdock starting");

    let registry = Arc::new(JsonPrinterRegistry::open(&config.printers_path)?);
    let executor = Arc::new(SystemPrintExecutor::new(config.executor.clone()));
    let mut scheduler = PrintScheduler::new(config.scheduler.clone(), registry, executor);
    scheduler.start();

    let handle = scheduler.handle();
    let uploads = config.scheduler.temp_dir.join("uploads");
    let form = args.form();
    for file in &args.files {
        if let Err(e) = submit_file(&handle, &form, file, &uploads).await {
            warn!(file = %file.display(), error = %e, "submission rejected");
        }
    }

    let mut status_timer = tokio::time::interval(Duration::from_secs(args.status_every.max(1)));
    loop {
        tokio::select! {
            result = signal::ctrl_c() => {
                if let Err(e) = result {
                    error!(error = %e, "cannot listen for Ctrl-C");
                }
                break;
            }

            _ = status_timer.tick() => log_status(&handle),
        }
    }

    info!("shutting down");
    scheduler.shutdown().await?;
    log_status(&handle);
    Ok(())
}

/// Stage `file` into the uploads directory and submit it.
///
/// The scheduler owns and eventually deletes the staged copy; the caller's
/// file is never touched.
async fn submit_file(
    handle: &SchedulerHandle,
    form: &SubmissionForm,
    file: &Path,
    uploads: &Path,
) -> Result<()> {
    let filename = file
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or_else(|| PrintdockError::Validation(format!("{} is not a file", file.display())))?;

    let staged = staged_path(uploads, &filename);
    let submission = form.into_submission(&filename, &staged, None, Utc::now())?;

    if !tokio::fs::try_exists(file).await? {
        return Err(PrintdockError::NotFound(file.to_path_buf()));
    }
    tokio::fs::create_dir_all(uploads).await?;
    tokio::fs::copy(file, &staged).await?;

    match handle.submit(submission) {
        Ok(id) => {
            info!(job_id = %id, filename = %filename, "submitted");
            Ok(())
        }
        Err(e) => {
            discard_staged(&staged).await;
            Err(e)
        }
    }
}

/// Remove a staged copy the scheduler refused.  Returns whether it is gone.
async fn discard_staged(staged: &Path) -> bool {
    match tokio::fs::remove_file(staged).await {
        Ok(()) => true,
        Err(e) => {
            warn!(path = %staged.display(), error = %e, "failed to remove staged upload");
            false
        }
    }
}

fn staged_path(uploads: &Path, filename: &str) -> PathBuf {
    uploads.join(format!("{}-{}", uuid::Uuid::new_v4(), filename))
}

fn log_status(handle: &SchedulerHandle) {
    match handle.status() {
        Ok(status) => info!(
            queue_length = status.queue_length,
            active = status.active_jobs,
            pending = status.pending_count,
            completed = status.completed_count,
            failed = status.failed_count,
            "queue status"
        ),
        Err(e) => warn!(error = %e, "cannot read queue status"),
    }
}
