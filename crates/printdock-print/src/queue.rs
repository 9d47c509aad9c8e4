// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// In-memory print job queue and its state machine.
//
//   Pending ──(dispatcher)──> Processing ──> Completed
//      ^                          │
//      └──(transient, budget left)┤
//                                 └──> Failed
//
// The queue owns every job record.  It is not thread-safe by itself: the
// scheduler keeps it behind a single mutex so status changes and the
// derived active-job count can never disagree.  Methods that release files
// return `CleanupHandle`s instead of deleting inline, so callers can do the
// I/O after dropping the lock.

use std::net::IpAddr;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use printdock_core::error::{PrintdockError, Result};
use printdock_core::types::{
    ErrorClass, JobId, JobStatus, JobSubmission, JobSummary, PrintOptions, QueueStatus,
};
use tracing::{debug, info, warn};

use crate::cleanup::CleanupHandle;
use crate::retry::{RetryDecision, RetryPolicy, classify_error};

/// A queued print job.
#[derive(Debug)]
pub struct PrintJob {
    pub id: JobId,
    /// Insertion order; breaks `submitted_at` ties.
    seq: u64,
    pub filename: String,
    pub file_path: PathBuf,
    pub printer_id: String,
    pub options: PrintOptions,
    pub duplex: bool,
    pub client_ip: Option<IpAddr>,
    pub submitted_at: DateTime<Utc>,
    pub status: JobStatus,
    /// Failed attempts that counted against the retry budget.
    pub attempts: u32,
    pub last_error: Option<String>,
    pub completed_at: Option<DateTime<Utc>>,
    /// Simplex-transformed copy of the upload, deleted on the first terminal
    /// transition.
    transformed: Option<CleanupHandle>,
}

impl PrintJob {
    fn from_submission(submission: JobSubmission, seq: u64) -> Self {
        Self {
            id: JobId::new(),
            seq,
            filename: submission.filename,
            file_path: submission.file_path,
            printer_id: submission.printer_id,
            options: submission.options,
            duplex: submission.duplex,
            client_ip: submission.client_ip,
            submitted_at: submission.submitted_at,
            status: JobStatus::Pending,
            attempts: 0,
            last_error: None,
            completed_at: None,
            transformed: None,
        }
    }

    /// Path of the simplex-transformed file, if one is attached.
    pub fn transformed_path(&self) -> Option<&Path> {
        self.transformed.as_ref().map(CleanupHandle::path)
    }

    pub fn summary(&self) -> JobSummary {
        JobSummary {
            id: self.id,
            filename: self.filename.clone(),
            printer_id: self.printer_id.clone(),
            status: self.status,
            attempts: self.attempts,
            last_error: self.last_error.clone(),
            submitted_at: self.submitted_at,
            completed_at: self.completed_at,
        }
    }

    /// Move to a terminal state, releasing the transformed file.
    fn finish(&mut self, status: JobStatus, now: DateTime<Utc>) -> Option<CleanupHandle> {
        self.status = status;
        self.completed_at = Some(now);
        self.transformed.take()
    }
}

/// Everything a dispatch task needs, copied out of the queue so the lock is
/// not held while printing.
#[derive(Debug, Clone)]
pub struct DispatchTicket {
    pub job_id: JobId,
    pub filename: String,
    pub file_path: PathBuf,
    pub printer_id: String,
    pub options: PrintOptions,
    /// Transformed file from an earlier attempt, reused as-is.
    pub transformed_path: Option<PathBuf>,
    /// The job wants simplex output and has no transformed file yet.
    pub needs_simplex: bool,
    /// 1-based number of this attempt.
    pub attempt: u32,
}

impl DispatchTicket {
    /// The file the executor should print.
    pub fn print_path(&self) -> &Path {
        self.transformed_path.as_deref().unwrap_or(&self.file_path)
    }
}

/// What a failure did to the job.
#[derive(Debug)]
pub struct FailureOutcome {
    /// `Pending` if the job will be retried, otherwise `Failed`.
    pub status: JobStatus,
    pub attempts: u32,
    /// Files to delete now that the job is terminal.
    pub cleanup: Vec<CleanupHandle>,
}

/// Ordered collection of print jobs.
#[derive(Debug, Default)]
pub struct JobQueue {
    jobs: Vec<PrintJob>,
    next_seq: u64,
}

impl JobQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a job in `Pending` state.
    pub fn enqueue(&mut self, submission: JobSubmission) -> JobId {
        let job = PrintJob::from_submission(submission, self.next_seq);
        self.next_seq += 1;
        let id = job.id;

        info!(
            job_id = %id,
            filename = %job.filename,
            printer_id = %job.printer_id,
            queue_len = self.jobs.len() + 1,
            "job enqueued"
        );
        self.jobs.push(job);
        id
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Number of jobs currently `Processing`.
    pub fn active_jobs(&self) -> usize {
        self.count(JobStatus::Processing)
    }

    pub fn get(&self, id: &JobId) -> Option<&PrintJob> {
        self.jobs.iter().find(|job| job.id == *id)
    }

    /// Select the oldest pending job and mark it `Processing`.
    ///
    /// Returns `None` when `max_concurrent` jobs are already processing or
    /// nothing is pending.
    pub fn next_pending(&mut self, max_concurrent: usize) -> Option<DispatchTicket> {
        let active = self.active_jobs();
        if active >= max_concurrent {
            debug!(active, max_concurrent, "no free dispatch slot");
            return None;
        }

        let job = self
            .jobs
            .iter_mut()
            .filter(|job| job.status == JobStatus::Pending)
            .min_by_key(|job| (job.submitted_at, job.seq))?;

        job.status = JobStatus::Processing;
        let transformed_path = job.transformed_path().map(Path::to_path_buf);

        info!(
            job_id = %job.id,
            filename = %job.filename,
            printer_id = %job.printer_id,
            attempt = job.attempts + 1,
            "job processing"
        );

        Some(DispatchTicket {
            job_id: job.id,
            filename: job.filename.clone(),
            file_path: job.file_path.clone(),
            printer_id: job.printer_id.clone(),
            options: job.options.clone(),
            needs_simplex: !job.duplex && transformed_path.is_none(),
            transformed_path,
            attempt: job.attempts + 1,
        })
    }

    /// Attach a simplex-transformed file to a processing job.
    ///
    /// Returns the handle it replaces, if any; the caller deletes it.
    pub fn attach_transformed(
        &mut self,
        id: &JobId,
        handle: CleanupHandle,
    ) -> Result<Option<CleanupHandle>> {
        let job = self.processing_mut(id)?;
        let previous = job.transformed.replace(handle);
        if previous.is_some() {
            warn!(job_id = %id, "replacing existing transformed file");
        }
        Ok(previous)
    }

    /// `Processing → Completed`.
    pub fn complete(&mut self, id: &JobId, now: DateTime<Utc>) -> Result<Vec<CleanupHandle>> {
        let job = self.processing_mut(id)?;
        let released = job.finish(JobStatus::Completed, now);
        info!(job_id = %id, filename = %job.filename, attempts = job.attempts, "job completed");
        Ok(released.into_iter().collect())
    }

    /// Record a failed attempt and apply the retry policy.
    ///
    /// Transient errors count against the attempt budget and send the job
    /// back to `Pending` while budget remains.  Permanent errors fail the job
    /// immediately without touching `attempts`.
    pub fn fail(
        &mut self,
        id: &JobId,
        err: &PrintdockError,
        policy: &RetryPolicy,
        now: DateTime<Utc>,
    ) -> Result<FailureOutcome> {
        let job = self.processing_mut(id)?;

        if classify_error(err) == ErrorClass::Transient {
            job.attempts += 1;
        }
        job.last_error = Some(err.to_string());

        let cleanup = match policy.decide(err, job.attempts) {
            RetryDecision::Retry => {
                job.status = JobStatus::Pending;
                warn!(
                    job_id = %id,
                    attempts = job.attempts,
                    error = %err,
                    "print attempt failed, job requeued"
                );
                Vec::new()
            }
            RetryDecision::GiveUp(_) | RetryDecision::Exhausted => {
                let released = job.finish(JobStatus::Failed, now);
                tracing::error!(
                    job_id = %id,
                    filename = %job.filename,
                    attempts = job.attempts,
                    error = %err,
                    "job failed"
                );
                released.into_iter().collect()
            }
        };

        Ok(FailureOutcome {
            status: job.status,
            attempts: job.attempts,
            cleanup,
        })
    }

    /// Remove terminal jobs that finished more than `retention` before `now`.
    ///
    /// Returns the handles for every file the evicted jobs still own: any
    /// transformed file not yet released, and the original upload.
    pub fn evict_expired(&mut self, now: DateTime<Utc>, retention: Duration) -> Vec<CleanupHandle> {
        let Some(cutoff) = now.checked_sub_signed(retention) else {
            // Window reaches past the earliest representable time.
            return Vec::new();
        };
        let mut released = Vec::new();

        self.jobs.retain_mut(|job| {
            let expired = job.status.is_terminal()
                && job.completed_at.is_some_and(|finished| finished < cutoff);
            if expired {
                debug!(job_id = %job.id, status = %job.status, "evicting job");
                released.extend(job.transformed.take());
                released.push(CleanupHandle::new(&job.file_path));
            }
            !expired
        });

        if !released.is_empty() {
            info!(remaining = self.jobs.len(), "evicted expired jobs");
        }
        released
    }

    pub fn summary(&self, id: &JobId) -> Option<JobSummary> {
        self.get(id).map(PrintJob::summary)
    }

    /// Aggregate counts plus the `recent_limit` most recently submitted jobs.
    pub fn status(&self, recent_limit: usize) -> QueueStatus {
        let mut by_submission: Vec<&PrintJob> = self.jobs.iter().collect();
        by_submission.sort_by_key(|job| (job.submitted_at, job.seq));
        let skip = by_submission.len().saturating_sub(recent_limit);
        QueueStatus {
            queue_length: self.jobs.len(),
            active_jobs: self.active_jobs(),
            pending_count: self.count(JobStatus::Pending),
            completed_count: self.count(JobStatus::Completed),
            failed_count: self.count(JobStatus::Failed),
            recent_jobs: by_submission[skip..].iter().map(|job| job.summary()).collect(),
        }
    }

    // -- Helpers --------------------------------------------------------------

    fn count(&self, status: JobStatus) -> usize {
        self.jobs.iter().filter(|job| job.status == status).count()
    }

    fn processing_mut(&mut self, id: &JobId) -> Result<&mut PrintJob> {
        let job = self
            .jobs
            .iter_mut()
            .find(|job| job.id == *id)
            .ok_or_else(|| PrintdockError::Scheduler(format!("job {id} not found")))?;

        if job.status != JobStatus::Processing {
            return Err(PrintdockError::Scheduler(format!(
                "job {id} is {}, not processing",
                job.status
            )));
        }
        Ok(job)
    }
}
