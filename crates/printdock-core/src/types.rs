// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the printdock scheduler.

use std::net::IpAddr;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a print job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobId(pub Uuid);

impl JobId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle states of a print job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    /// Queued, waiting for a free dispatch slot.
    Pending,
    /// Handed to the dispatcher; transform and/or executor call in flight.
    Processing,
    /// Successfully printed.
    Completed,
    /// Gave up: non-retryable error or attempts exhausted.
    Failed,
}

impl JobStatus {
    /// Completed and Failed accept no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Classification of errors for retry logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorClass {
    /// Spooler hiccup, timeout or busy printer. Safe to try again.
    Transient,
    /// Unknown printer, missing file, malformed document.
    Permanent,
}

/// Options forwarded verbatim to the print executor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrintOptions {
    /// Printer-command-specific page range, passed through unvalidated.
    pub page_range: Option<String>,
    pub copies: u32,
}

impl Default for PrintOptions {
    fn default() -> Self {
        Self {
            page_range: None,
            copies: 1,
        }
    }
}

/// A request to print one uploaded file.
///
/// Built by the submission layer (see [`crate::SubmissionForm`]) and handed to
/// the scheduler, which turns it into a queued job.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobSubmission {
    /// Display name of the document.
    pub filename: String,
    /// Upload location on local storage.
    pub file_path: PathBuf,
    pub printer_id: String,
    pub options: PrintOptions,
    /// `true` lets the printer duplex normally; `false` requests the simplex
    /// transform.
    pub duplex: bool,
    pub client_ip: Option<IpAddr>,
    pub submitted_at: DateTime<Utc>,
}

impl JobSubmission {
    pub fn new(
        filename: impl Into<String>,
        file_path: impl Into<PathBuf>,
        printer_id: impl Into<String>,
        submitted_at: DateTime<Utc>,
    ) -> Self {
        Self {
            filename: filename.into(),
            file_path: file_path.into(),
            printer_id: printer_id.into(),
            options: PrintOptions::default(),
            duplex: true,
            client_ip: None,
            submitted_at,
        }
    }

    pub fn with_copies(mut self, copies: u32) -> Self {
        self.options.copies = copies;
        self
    }

    pub fn with_page_range(mut self, range: impl Into<String>) -> Self {
        self.options.page_range = Some(range.into());
        self
    }

    pub fn with_duplex(mut self, duplex: bool) -> Self {
        self.duplex = duplex;
        self
    }

    pub fn with_client_ip(mut self, ip: IpAddr) -> Self {
        self.client_ip = Some(ip);
        self
    }
}

/// A configured printer as stored in the registry.
///
/// Field names serialise in camelCase so existing `printers.json` files keep
/// working.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrinterDescriptor {
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Name of the queue in the OS print system, if different from `name`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_name: Option<String>,
    /// Print through the OS spooler rather than directly over the network.
    #[serde(default)]
    pub use_system_printing: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
}

impl PrinterDescriptor {
    /// A printer driven through the OS print system.
    pub fn system(id: impl Into<String>, name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            id: id.into(),
            system_name: Some(name.clone()),
            name,
            use_system_printing: true,
            ip: None,
            port: None,
        }
    }

    /// A network printer reached over raw TCP.
    pub fn network(id: impl Into<String>, name: impl Into<String>, ip: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            system_name: None,
            use_system_printing: false,
            ip: Some(ip.into()),
            port: None,
        }
    }

    /// The queue name handed to the OS print command.
    pub fn device_name(&self) -> &str {
        self.system_name.as_deref().unwrap_or(&self.name)
    }
}

/// One row of the status report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobSummary {
    pub id: JobId,
    pub filename: String,
    pub printer_id: String,
    pub status: JobStatus,
    pub attempts: u32,
    pub last_error: Option<String>,
    pub submitted_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Aggregate queue status returned by the status query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueStatus {
    pub queue_length: usize,
    pub active_jobs: usize,
    pub pending_count: usize,
    pub completed_count: usize,
    pub failed_count: usize,
    /// Most recently submitted jobs, oldest first.
    pub recent_jobs: Vec<JobSummary>,
}
