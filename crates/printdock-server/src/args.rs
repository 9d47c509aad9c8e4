// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Command-line arguments.

use std::path::PathBuf;

use clap::{Args as ClapArgs, Parser, Subcommand};
use printdock_core::SubmissionForm;

#[derive(Parser, Debug)]
#[command(about, long_about = None, version)]
pub(crate) struct Args {
    /// Settings file (JSON).  Missing file means built-in defaults.
    #[arg(short, long, global = true, default_value = "config/printdock.json")]
    pub(crate) config: PathBuf,

    #[command(subcommand)]
    pub(crate) command: Command,
}

#[derive(Subcommand, Debug)]
pub(crate) enum Command {
    /// Run the scheduler, optionally submitting files, until Ctrl-C.
    Serve(ServeArgs),
    /// Print the printer registry as JSON.
    Printers,
    /// Check whether a printer is reachable.
    TestPrinter {
        /// Printer ID from the registry.
        id: String,
    },
}

#[derive(ClapArgs, Debug)]
pub(crate) struct ServeArgs {
    /// Printer to send the given files to.
    #[arg(short, long)]
    pub(crate) printer: Option<String>,
    /// Number of copies.
    #[arg(short = 'n', long)]
    pub(crate) copies: Option<String>,
    /// Page range, passed to the print command as-is.
    #[arg(short = 'P', long)]
    pub(crate) pages: Option<String>,
    /// `false` interleaves blank pages for one-sided output.
    #[arg(short, long)]
    pub(crate) duplex: Option<String>,
    /// Seconds between queue status log lines.
    #[arg(long, default_value_t = 30)]
    pub(crate) status_every: u64,
    /// PDF files to print.
    pub(crate) files: Vec<PathBuf>,
}

impl ServeArgs {
    /// The print options as untyped form fields, for the strict parser.
    pub(crate) fn form(&self) -> SubmissionForm {
        SubmissionForm {
            printer_id: self.printer.clone(),
            page_range: self.pages.clone(),
            copies: self.copies.clone(),
            duplex: self.duplex.clone(),
        }
    }
}
