// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// printdock: core types, submission parsing, configuration and the unified
// error type shared across all crates.

pub mod clock;
pub mod config;
pub mod error;
pub mod submission;
pub mod types;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{AppConfig, ExecutorConfig, SchedulerConfig};
pub use error::{ErrorKind, PrintdockError, Result};
pub use submission::SubmissionForm;
pub use types::*;
