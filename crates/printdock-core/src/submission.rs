// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Submission boundary: turns untyped form fields into a `JobSubmission`.
//
// Upload forms deliver every field as a string (or not at all).  All coercion
// happens here so the scheduler only ever sees typed values.

use std::net::IpAddr;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{PrintdockError, Result};
use crate::types::{JobSubmission, PrintOptions};

/// Raw form fields accompanying one or more uploaded files.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionForm {
    pub printer_id: Option<String>,
    pub page_range: Option<String>,
    pub copies: Option<String>,
    pub duplex: Option<String>,
}

impl SubmissionForm {
    /// Build a typed submission for a single uploaded file.
    ///
    /// Rejects a missing printer, non-PDF uploads, and malformed
    /// `copies`/`duplex` values before any job exists.
    pub fn into_submission(
        &self,
        filename: impl Into<String>,
        file_path: impl Into<PathBuf>,
        client_ip: Option<IpAddr>,
        submitted_at: DateTime<Utc>,
    ) -> Result<JobSubmission> {
        let filename = filename.into();
        let file_path = file_path.into();

        let printer_id = non_blank(self.printer_id.as_deref())
            .ok_or_else(|| PrintdockError::Validation("printer id is required".into()))?;
        ensure_pdf(&filename)?;

        Ok(JobSubmission {
            filename,
            file_path,
            printer_id: printer_id.to_owned(),
            options: PrintOptions {
                page_range: non_blank(self.page_range.as_deref()).map(str::to_owned),
                copies: parse_copies(self.copies.as_deref())?,
            },
            duplex: parse_duplex(self.duplex.as_deref())?,
            client_ip,
            submitted_at,
        })
    }
}

/// Parse the `copies` field. Absent or blank means one copy.
pub fn parse_copies(raw: Option<&str>) -> Result<u32> {
    let Some(raw) = non_blank(raw) else {
        return Ok(1);
    };
    match raw.parse::<u32>() {
        Ok(0) => Err(PrintdockError::Validation("copies must be at least 1".into())),
        Ok(n) => Ok(n),
        Err(_) => Err(PrintdockError::Validation(format!(
            "copies must be a positive integer, got {raw:?}"
        ))),
    }
}

/// Parse the `duplex` field. Absent or blank means duplex (`true`).
pub fn parse_duplex(raw: Option<&str>) -> Result<bool> {
    let Some(raw) = non_blank(raw) else {
        return Ok(true);
    };
    match raw.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(PrintdockError::Validation(format!(
            "duplex must be a boolean, got {raw:?}"
        ))),
    }
}

/// Only PDF uploads can be printed (and simplex-transformed).
pub fn ensure_pdf(filename: &str) -> Result<()> {
    let is_pdf = Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));

    if is_pdf {
        Ok(())
    } else {
        Err(PrintdockError::Validation(format!(
            "only PDF files are supported, got {filename:?}"
        )))
    }
}

fn non_blank(raw: Option<&str>) -> Option<&str> {
    raw.map(str::trim).filter(|s| !s.is_empty())
}
