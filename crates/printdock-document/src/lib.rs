// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// printdock-document: document processing for the printdock scheduler.
//
// Provides PDF inspection and the simplex transform, which interleaves blank
// pages so duplex-only printers produce single-sided output.

pub mod pdf;

// Re-export the primary structs so callers can use `printdock_document::PdfReader` etc.
pub use pdf::reader::PdfReader;
pub use pdf::simplex::{SimplexOutput, SimplexTransformer};
