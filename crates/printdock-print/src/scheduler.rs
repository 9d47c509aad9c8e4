// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Print scheduler: the dispatch loop around the job queue.
//
// One background task wakes on two intervals.  The fast one (tick) promotes
// the oldest pending job to Processing when a concurrency slot is free and
// spawns its dispatch; the slow one (sweep) evicts expired terminal jobs.
// Dispatches run as independent tasks and feed their outcome back into the
// queue under its mutex.  The mutex is never held across an await.
//
// Per-job dispatch order:
//
//   registry lookup -> upload exists? -> simplex transform (duplex off,
//   first attempt only) -> executor

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use printdock_core::clock::{Clock, SystemClock};
use printdock_core::config::SchedulerConfig;
use printdock_core::error::{PrintdockError, Result};
use printdock_core::types::{JobId, JobSubmission, JobSummary, QueueStatus};
use printdock_document::SimplexTransformer;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{Instrument, debug, error, info, instrument};

use crate::cleanup::{self, CleanupHandle};
use crate::executor::PrintExecutor;
use crate::queue::{DispatchTicket, JobQueue};
use crate::registry::PrinterRegistry;
use crate::retry::RetryPolicy;

/// State shared by the loop, every dispatch task and every handle.
struct Shared {
    queue: Mutex<JobQueue>,
    registry: Arc<dyn PrinterRegistry>,
    executor: Arc<dyn PrintExecutor>,
    clock: Arc<dyn Clock>,
    config: SchedulerConfig,
    policy: RetryPolicy,
}

impl Shared {
    fn lock(&self) -> Result<MutexGuard<'_, JobQueue>> {
        self.queue
            .lock()
            .map_err(|_| PrintdockError::Scheduler("job queue lock poisoned".into()))
    }

    /// Run one attempt for `ticket`, up to and including the executor call.
    async fn attempt(&self, ticket: &DispatchTicket) -> Result<()> {
        let printer = self.registry.lookup(&ticket.printer_id)?;

        if !tokio::fs::try_exists(&ticket.file_path).await? {
            return Err(PrintdockError::NotFound(ticket.file_path.clone()));
        }

        let print_path = if ticket.needs_simplex {
            self.transform(ticket).await?
        } else {
            ticket.print_path().to_path_buf()
        };

        self.executor
            .dispatch(&print_path, &printer, &ticket.options)
            .await
    }

    /// Write the simplex version of the upload and attach it to the job.
    async fn transform(&self, ticket: &DispatchTicket) -> Result<PathBuf> {
        let output = self
            .config
            .temp_dir
            .join(format!("simplex-{}.pdf", ticket.job_id));

        let input = ticket.file_path.clone();
        let target = output.clone();
        let transformed =
            tokio::task::spawn_blocking(move || SimplexTransformer::transform_file(&input, &target))
                .await
                .map_err(|e| PrintdockError::Transform(format!("transform task failed: {e}")))?;

        if let Err(e) = transformed {
            // A failed write may have left a partial file behind.
            cleanup::run_all([CleanupHandle::new(&output)]);
            return Err(e);
        }

        self.attach(&ticket.job_id, &output)?;
        Ok(output)
    }

    fn attach(&self, id: &JobId, output: &Path) -> Result<()> {
        let attached = self
            .lock()
            .and_then(|mut queue| queue.attach_transformed(id, CleanupHandle::new(output)));
        match attached {
            Ok(replaced) => {
                cleanup::run_all(replaced);
                Ok(())
            }
            Err(e) => {
                cleanup::run_all([CleanupHandle::new(output)]);
                Err(e)
            }
        }
    }

    /// Apply an attempt's outcome, then delete whatever the transition
    /// released.
    fn finish(&self, ticket: &DispatchTicket, outcome: Result<()>) {
        let now = self.clock.now();
        let released = self.lock().and_then(|mut queue| match &outcome {
            Ok(()) => queue.complete(&ticket.job_id, now),
            Err(err) => queue
                .fail(&ticket.job_id, err, &self.policy, now)
                .map(|failure| failure.cleanup),
        });

        match released {
            Ok(handles) => {
                cleanup::run_all(handles);
            }
            Err(e) => error!(job_id = %ticket.job_id, error = %e, "cannot record dispatch outcome"),
        }
    }
}

#[instrument(skip_all, fields(job_id = %ticket.job_id, attempt = ticket.attempt))]
async fn dispatch(shared: Arc<Shared>, ticket: DispatchTicket) {
    debug!(printer_id = %ticket.printer_id, simplex = ticket.needs_simplex, "dispatching");

    // A panicking attempt must still release its slot.
    let attempt = {
        let shared = Arc::clone(&shared);
        let ticket = ticket.clone();
        tokio::spawn(async move { shared.attempt(&ticket).await }.in_current_span())
    };
    let outcome = attempt.await.unwrap_or_else(|e| {
        Err(PrintdockError::Execution(format!("dispatch task failed: {e}")))
    });

    shared.finish(&ticket, outcome);
}

/// Cheap, cloneable access to a running scheduler.
#[derive(Clone)]
pub struct SchedulerHandle {
    shared: Arc<Shared>,
}

impl SchedulerHandle {
    /// Enqueue a job.
    ///
    /// An empty printer ID or zero copies is rejected before any job is
    /// created.
    pub fn submit(&self, submission: JobSubmission) -> Result<JobId> {
        if submission.printer_id.trim().is_empty() {
            return Err(PrintdockError::Validation("printer id is required".into()));
        }
        if submission.options.copies == 0 {
            return Err(PrintdockError::Validation("copies must be at least 1".into()));
        }
        Ok(self.shared.lock()?.enqueue(submission))
    }

    pub fn status(&self) -> Result<QueueStatus> {
        Ok(self
            .shared
            .lock()?
            .status(self.shared.config.recent_jobs_limit))
    }

    pub fn job(&self, id: &JobId) -> Result<Option<JobSummary>> {
        Ok(self.shared.lock()?.summary(id))
    }

    /// One scheduling step.
    ///
    /// Promotes at most one pending job and spawns its dispatch, returning
    /// the task so callers may await it.  Returns `None` when no slot is free
    /// or nothing is pending.  Must be called inside a Tokio runtime.
    pub fn tick(&self) -> Result<Option<JoinHandle<()>>> {
        let ticket = self
            .shared
            .lock()?
            .next_pending(self.shared.config.max_concurrent);

        Ok(ticket.map(|ticket| tokio::spawn(dispatch(Arc::clone(&self.shared), ticket))))
    }

    /// One retention pass.  Returns the number of jobs evicted.
    pub fn sweep(&self) -> Result<usize> {
        let now = self.shared.clock.now();
        let (evicted, released) = {
            let mut queue = self.shared.lock()?;
            let before = queue.len();
            let released = queue.evict_expired(now, self.shared.config.retention());
            (before - queue.len(), released)
        };

        if evicted > 0 {
            let removed = cleanup::run_all(released);
            info!(evicted, files_removed = removed, "retention sweep");
        }
        Ok(evicted)
    }
}

/// Owns the background loop.
pub struct PrintScheduler {
    handle: SchedulerHandle,
    shutdown_signal: Arc<Notify>,
    task_handle: Option<JoinHandle<()>>,
}

impl PrintScheduler {
    pub fn new(
        config: SchedulerConfig,
        registry: Arc<dyn PrinterRegistry>,
        executor: Arc<dyn PrintExecutor>,
    ) -> Self {
        Self::with_clock(config, registry, executor, Arc::new(SystemClock))
    }

    pub fn with_clock(
        config: SchedulerConfig,
        registry: Arc<dyn PrinterRegistry>,
        executor: Arc<dyn PrintExecutor>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let policy = RetryPolicy::new(config.max_attempts);
        let shared = Shared {
            queue: Mutex::new(JobQueue::new()),
            registry,
            executor,
            clock,
            config,
            policy,
        };
        Self {
            handle: SchedulerHandle {
                shared: Arc::new(shared),
            },
            shutdown_signal: Arc::new(Notify::new()),
            task_handle: None,
        }
    }

    pub fn handle(&self) -> SchedulerHandle {
        self.handle.clone()
    }

    pub fn is_running(&self) -> bool {
        self.task_handle.is_some()
    }

    pub fn submit(&self, submission: JobSubmission) -> Result<JobId> {
        self.handle.submit(submission)
    }

    pub fn status(&self) -> Result<QueueStatus> {
        self.handle.status()
    }

    /// Spawn the scheduling loop.  Calling `start` twice is a no-op.
    pub fn start(&mut self) {
        if self.is_running() {
            debug!("scheduler already running");
            return;
        }

        let config = &self.handle.shared.config;
        info!(
            tick_ms = config.tick_interval_ms,
            sweep_ms = config.sweep_interval_ms,
            max_concurrent = config.max_concurrent,
            "print scheduler started"
        );

        let handle = self.handle.clone();
        let shutdown = Arc::clone(&self.shutdown_signal);
        self.task_handle = Some(tokio::spawn(Self::run_loop(handle, shutdown)));
    }

    /// Stop the loop and wait for it to exit.  In-flight dispatches finish
    /// on their own.
    pub async fn shutdown(&mut self) -> Result<()> {
        let Some(task) = self.task_handle.take() else {
            return Ok(());
        };

        self.shutdown_signal.notify_one();
        task.await
            .map_err(|e| PrintdockError::Scheduler(format!("loop join: {e}")))?;

        info!("print scheduler stopped");
        Ok(())
    }

    async fn run_loop(handle: SchedulerHandle, shutdown: Arc<Notify>) {
        let config = &handle.shared.config;
        let mut tick = tokio::time::interval(config.tick_interval());
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut sweep = tokio::time::interval(config.sweep_interval());
        sweep.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.notified() => {
                    debug!("scheduler loop received shutdown signal");
                    break;
                }

                _ = tick.tick() => {
                    if let Err(e) = handle.tick() {
                        error!(error = %e, "dispatch tick failed");
                    }
                }

                _ = sweep.tick() => {
                    if let Err(e) = handle.sweep() {
                        error!(error = %e, "retention sweep failed");
                    }
                }
            }
        }
    }
}
