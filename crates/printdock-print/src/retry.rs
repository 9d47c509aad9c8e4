// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Retry policy for failed print attempts.
//
// Count-based with no backoff: a job that fails with a transient error goes
// straight back to Pending and is eligible on the next tick.  Only executor
// failures are transient; a missing printer, a missing file or a malformed
// document cannot get better by trying again.

use printdock_core::error::{ErrorKind, PrintdockError};
use printdock_core::types::ErrorClass;
use tracing::{debug, info, warn};

/// Default total attempts per job (initial try plus two retries).
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Retry configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts allowed, the first one included.
    pub max_attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

/// Result of evaluating a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Put the job back in the pending pool.
    Retry,
    /// Do not retry; the error is permanent.
    GiveUp(ErrorClass),
    /// Transient error, but the attempt budget is spent.
    Exhausted,
}

/// Classify a `PrintdockError` into an `ErrorClass` for retry decisions.
pub fn classify_error(err: &PrintdockError) -> ErrorClass {
    match err.kind() {
        ErrorKind::Execution => ErrorClass::Transient,
        ErrorKind::Validation
        | ErrorKind::Transform
        | ErrorKind::NotFound
        | ErrorKind::Internal => ErrorClass::Permanent,
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32) -> Self {
        Self { max_attempts }
    }

    /// Decide what happens after a failure, given the number of failed
    /// attempts recorded *including* this one.
    pub fn decide(&self, err: &PrintdockError, failed_attempts: u32) -> RetryDecision {
        match classify_error(err) {
            ErrorClass::Permanent => {
                info!(error = %err, "permanent error, not retrying");
                RetryDecision::GiveUp(ErrorClass::Permanent)
            }
            ErrorClass::Transient if failed_attempts >= self.max_attempts => {
                warn!(failed_attempts, max = self.max_attempts, "retry limit exhausted");
                RetryDecision::Exhausted
            }
            ErrorClass::Transient => {
                debug!(failed_attempts, max = self.max_attempts, "scheduling retry");
                RetryDecision::Retry
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn only_execution_errors_are_transient() {
        assert_eq!(
            classify_error(&PrintdockError::Execution("lp exited with 1".into())),
            ErrorClass::Transient
        );
        assert_eq!(
            classify_error(&PrintdockError::Validation("unknown printer 999".into())),
            ErrorClass::Permanent
        );
        assert_eq!(
            classify_error(&PrintdockError::Transform("no pages".into())),
            ErrorClass::Permanent
        );
        assert_eq!(
            classify_error(&PrintdockError::NotFound(PathBuf::from("gone.pdf"))),
            ErrorClass::Permanent
        );
    }

    #[test]
    fn retry_respects_attempt_budget() {
        let policy = RetryPolicy::default();
        let err = PrintdockError::Execution("spooler busy".into());
        assert_eq!(policy.decide(&err, 1), RetryDecision::Retry);
        assert_eq!(policy.decide(&err, 2), RetryDecision::Retry);
        assert_eq!(policy.decide(&err, 3), RetryDecision::Exhausted);
    }

    #[test]
    fn permanent_error_never_retries() {
        let policy = RetryPolicy::new(10);
        let err = PrintdockError::Transform("malformed xref".into());
        assert_eq!(
            policy.decide(&err, 1),
            RetryDecision::GiveUp(ErrorClass::Permanent)
        );
    }
}
