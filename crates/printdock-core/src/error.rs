// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for printdock.

use std::path::PathBuf;

use thiserror::Error;

/// Top-level error type for all printdock operations.
#[derive(Debug, Error)]
pub enum PrintdockError {
    // -- Job failures (the four kinds the scheduler distinguishes) --
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("document transform failed: {0}")]
    Transform(String),

    #[error("print execution failed: {0}")]
    Execution(String),

    #[error("file not found: {}", .0.display())]
    NotFound(PathBuf),

    // -- Collaborators and plumbing --
    #[error("printer registry error: {0}")]
    Registry(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("scheduler error: {0}")]
    Scheduler(String),

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// The failure taxonomy reported for a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Transform,
    NotFound,
    Execution,
    /// Registry, configuration, scheduler or plumbing errors.
    Internal,
}

impl PrintdockError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::Transform(_) => ErrorKind::Transform,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Execution(_) => ErrorKind::Execution,
            Self::Registry(_)
            | Self::Config(_)
            | Self::Scheduler(_)
            | Self::Io(_)
            | Self::Serialization(_) => ErrorKind::Internal,
        }
    }
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, PrintdockError>;
