// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF inspection and simplex rewriting.

pub mod reader;
pub mod simplex;

pub use reader::PdfReader;
pub use simplex::{SimplexOutput, SimplexTransformer};

#[cfg(test)]
pub(crate) mod fixtures;
