// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Print executor: hands a file to a printer.
//
// System printers go through the platform print command, spawned directly
// (no shell) and awaited under a timeout.  Network printers get the file
// over raw TCP.

use std::ffi::OsString;
use std::path::Path;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info, instrument};

use printdock_core::config::ExecutorConfig;
use printdock_core::error::{PrintdockError, Result};
use printdock_core::types::{PrintOptions, PrinterDescriptor};

use crate::raw_client;

/// Capability that transmits a file to a printing device.
#[async_trait]
pub trait PrintExecutor: Send + Sync {
    /// Print `file` on `printer`.  Every failure to print is reported as
    /// [`PrintdockError::Execution`].
    async fn dispatch(
        &self,
        file: &Path,
        printer: &PrinterDescriptor,
        options: &PrintOptions,
    ) -> Result<()>;
}

/// Which print command family to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Windows,
    MacOs,
    /// `lp` from CUPS; also the fallback for other Unix systems.
    Linux,
}

impl Platform {
    pub fn current() -> Self {
        if cfg!(target_os = "windows") {
            Self::Windows
        } else if cfg!(target_os = "macos") {
            Self::MacOs
        } else {
            Self::Linux
        }
    }
}

/// A program and its argument vector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrintCommand {
    pub program: OsString,
    pub args: Vec<OsString>,
}

impl PrintCommand {
    fn new(program: impl Into<OsString>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }
}

/// Executor backed by the host's print system.
#[derive(Debug, Clone)]
pub struct SystemPrintExecutor {
    config: ExecutorConfig,
    platform: Platform,
}

impl SystemPrintExecutor {
    pub fn new(config: ExecutorConfig) -> Self {
        Self::for_platform(config, Platform::current())
    }

    pub fn for_platform(config: ExecutorConfig, platform: Platform) -> Self {
        Self { config, platform }
    }

    /// The command that prints `file` on the system queue `device`.
    pub fn build_command(&self, file: &Path, device: &str, options: &PrintOptions) -> PrintCommand {
        let copies = (options.copies > 1).then_some(options.copies);
        let pages = options.page_range.as_deref();

        match self.platform {
            Platform::Windows => {
                let mut cmd = PrintCommand::new(&self.config.pdf_to_printer_path)
                    .arg(file)
                    .arg(device);
                if let Some(range) = pages {
                    cmd = cmd.arg(format!("pages={range}"));
                }
                if let Some(n) = copies {
                    cmd = cmd.arg(format!("copies={n}"));
                }
                cmd
            }
            Platform::MacOs => {
                let mut cmd = PrintCommand::new("lpr").arg("-P").arg(device);
                if let Some(n) = copies {
                    cmd = cmd.arg("-#").arg(n.to_string());
                }
                if let Some(range) = pages {
                    cmd = cmd.arg("-o").arg(format!("page-ranges={range}"));
                }
                cmd.arg(file)
            }
            Platform::Linux => {
                let mut cmd = PrintCommand::new("lp").arg("-d").arg(device);
                if let Some(n) = copies {
                    cmd = cmd.arg("-n").arg(n.to_string());
                }
                if let Some(range) = pages {
                    cmd = cmd.arg("-P").arg(range);
                }
                cmd.arg(file)
            }
        }
    }

    /// Spawn `command` and wait for it, killing it if the timeout expires.
    #[instrument(skip_all, fields(program = ?command.program))]
    pub async fn run_command(&self, command: &PrintCommand) -> Result<()> {
        let timeout = self.config.command_timeout();
        let child = Command::new(&command.program)
            .args(&command.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output();

        let output = tokio::time::timeout(timeout, child)
            .await
            .map_err(|_| {
                PrintdockError::Execution(format!(
                    "print command timed out after {}s",
                    timeout.as_secs()
                ))
            })?
            .map_err(|e| {
                PrintdockError::Execution(format!(
                    "failed to start {}: {}",
                    command.program.to_string_lossy(),
                    e
                ))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(PrintdockError::Execution(format!(
                "{} exited with {}: {}",
                command.program.to_string_lossy(),
                output.status,
                stderr.trim()
            )));
        }

        debug!(stdout = %String::from_utf8_lossy(&output.stdout).trim(), "print command finished");
        Ok(())
    }

    async fn send_network(
        &self,
        file: &Path,
        ip: &str,
        port: u16,
        options: &PrintOptions,
    ) -> Result<()> {
        let document = tokio::fs::read(file).await?;
        if options.page_range.is_some() {
            debug!("page range ignored for raw TCP printing");
        }
        for copy in 1..=options.copies.max(1) {
            debug!(copy, copies = options.copies, "sending copy");
            raw_client::send_raw(ip, port, &document, self.config.command_timeout()).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl PrintExecutor for SystemPrintExecutor {
    #[instrument(skip(self, options), fields(file = %file.display(), printer_id = %printer.id))]
    async fn dispatch(
        &self,
        file: &Path,
        printer: &PrinterDescriptor,
        options: &PrintOptions,
    ) -> Result<()> {
        if printer.use_system_printing {
            let command = self.build_command(file, printer.device_name(), options);
            info!(device = printer.device_name(), args = ?command.args, "running print command");
            self.run_command(&command).await
        } else if let Some(ip) = &printer.ip {
            let port = printer.port.unwrap_or(self.config.raw_port);
            self.send_network(file, ip, port, options).await
        } else {
            Err(PrintdockError::Execution(format!(
                "printer {} has no IP address and system printing is disabled",
                printer.id
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn args(cmd: &PrintCommand) -> Vec<&str> {
        cmd.args.iter().map(|a| a.to_str().expect("utf-8")).collect()
    }

    fn options(copies: u32, pages: Option<&str>) -> PrintOptions {
        PrintOptions {
            page_range: pages.map(str::to_string),
            copies,
        }
    }

    #[test]
    fn windows_command_uses_pdf_to_printer() {
        let executor = SystemPrintExecutor::for_platform(ExecutorConfig::default(), Platform::Windows);
        let cmd = executor.build_command(Path::new("job.pdf"), "809打印机", &options(2, Some("1-3")));
        assert_eq!(cmd.program, OsString::from("PDFtoPrinter.exe"));
        assert_eq!(args(&cmd), vec!["job.pdf", "809打印机", "pages=1-3", "copies=2"]);
    }

    #[test]
    fn single_copy_adds_no_copies_flag() {
        let executor = SystemPrintExecutor::for_platform(ExecutorConfig::default(), Platform::Windows);
        let cmd = executor.build_command(Path::new("job.pdf"), "809", &options(1, None));
        assert_eq!(args(&cmd), vec!["job.pdf", "809"]);
    }

    #[test]
    fn macos_command_uses_lpr() {
        let executor = SystemPrintExecutor::for_platform(ExecutorConfig::default(), Platform::MacOs);
        let cmd = executor.build_command(Path::new("/tmp/a.pdf"), "Office", &options(3, Some("2")));
        assert_eq!(cmd.program, OsString::from("lpr"));
        assert_eq!(
            args(&cmd),
            vec!["-P", "Office", "-#", "3", "-o", "page-ranges=2", "/tmp/a.pdf"]
        );
    }

    #[test]
    fn linux_command_uses_lp() {
        let executor = SystemPrintExecutor::for_platform(ExecutorConfig::default(), Platform::Linux);
        let cmd = executor.build_command(Path::new("/tmp/a b.pdf"), "Office 5", &options(1, None));
        assert_eq!(cmd.program, OsString::from("lp"));
        // Spaces survive because no shell is involved.
        assert_eq!(args(&cmd), vec!["-d", "Office 5", "/tmp/a b.pdf"]);
    }

    #[tokio::test]
    async fn printer_without_route_is_an_execution_error() {
        let executor = SystemPrintExecutor::new(ExecutorConfig::default());
        let mut printer = PrinterDescriptor::network("x", "Nowhere", "");
        printer.ip = None;

        let err = executor
            .dispatch(&PathBuf::from("a.pdf"), &printer, &PrintOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, PrintdockError::Execution(_)));
    }

    #[tokio::test]
    async fn missing_program_is_an_execution_error() {
        let executor = SystemPrintExecutor::new(ExecutorConfig::default());
        let cmd = PrintCommand::new("printdock-no-such-program");
        let err = executor.run_command(&cmd).await.unwrap_err();
        assert!(matches!(err, PrintdockError::Execution(_)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn nonzero_exit_reports_stderr() {
        let executor = SystemPrintExecutor::new(ExecutorConfig::default());
        let cmd = PrintCommand::new("sh")
            .arg("-c")
            .arg("echo 'printer on fire' >&2; exit 3");
        let err = executor.run_command(&cmd).await.unwrap_err();
        match err {
            PrintdockError::Execution(message) => assert!(message.contains("printer on fire")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn slow_command_times_out() {
        let config = ExecutorConfig {
            command_timeout_secs: 1,
            ..ExecutorConfig::default()
        };
        let executor = SystemPrintExecutor::new(config);
        let cmd = PrintCommand::new("sleep").arg("10");
        let err = executor.run_command(&cmd).await.unwrap_err();
        assert!(matches!(err, PrintdockError::Execution(m) if m.contains("timed out")));
    }

    #[tokio::test]
    async fn network_printer_receives_one_transfer_per_copy() {
        use tokio::io::AsyncReadExt;
        use tokio::net::TcpListener;

        let dir = tempfile::tempdir().expect("tempdir");
        let file = dir.path().join("job.pdf");
        std::fs::write(&file, b"%PDF-1.5 raw").expect("write");

        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let port = listener.local_addr().expect("addr").port();
        let receiver = tokio::spawn(async move {
            let mut transfers = Vec::new();
            for _ in 0..2 {
                let (mut socket, _) = listener.accept().await.expect("accept");
                let mut data = Vec::new();
                socket.read_to_end(&mut data).await.expect("read");
                transfers.push(data);
            }
            transfers
        });

        let mut printer = PrinterDescriptor::network("net", "Network", "127.0.0.1");
        printer.port = Some(port);
        let executor = SystemPrintExecutor::new(ExecutorConfig::default());
        executor
            .dispatch(&file, &printer, &options(2, None))
            .await
            .expect("dispatch");

        let transfers = receiver.await.expect("join");
        assert_eq!(transfers, vec![b"%PDF-1.5 raw".to_vec(), b"%PDF-1.5 raw".to_vec()]);
    }
}
