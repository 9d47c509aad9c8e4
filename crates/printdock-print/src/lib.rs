// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// printdock-print: the job queue and its dispatcher, plus the two
// collaborators the dispatcher drives: the printer registry and the print
// executor (OS print commands or raw TCP).

pub mod cleanup;
pub mod executor;
pub mod queue;
pub mod raw_client;
pub mod registry;
pub mod retry;
pub mod scheduler;

pub use cleanup::CleanupHandle;
pub use executor::{PrintExecutor, SystemPrintExecutor};
pub use queue::JobQueue;
pub use registry::{JsonPrinterRegistry, PrinterRegistry};
pub use retry::RetryPolicy;
pub use scheduler::{PrintScheduler, SchedulerHandle};
