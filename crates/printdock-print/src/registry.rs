// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Printer registry: maps printer IDs to descriptors.
//
// The JSON file is an array of descriptors with camelCase keys.  When the
// file does not exist it is created with the four default office printers.

use std::path::{Path, PathBuf};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use printdock_core::config::ExecutorConfig;
use printdock_core::error::{PrintdockError, Result};
use printdock_core::types::PrinterDescriptor;

use crate::raw_client;

/// Lookup seam used by the scheduler on every dispatch attempt.
pub trait PrinterRegistry: Send + Sync {
    /// Resolve `printer_id`.  An unknown ID is a validation error.
    fn lookup(&self, printer_id: &str) -> Result<PrinterDescriptor>;
}

/// Outcome of [`JsonPrinterRegistry::test_connection`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionReport {
    pub printer_id: String,
    pub reachable: bool,
    pub message: String,
}

/// Printer set seeded into a fresh registry file.
pub fn default_printers() -> Vec<PrinterDescriptor> {
    vec![
        PrinterDescriptor::system("809", "809打印机"),
        PrinterDescriptor::system("502", "502办公室打印机"),
        PrinterDescriptor::system("301", "301办公室打印机"),
        PrinterDescriptor::system("201", "201办公室打印机"),
    ]
}

/// Registry backed by a JSON file, rewritten after every mutation.
#[derive(Debug)]
pub struct JsonPrinterRegistry {
    printers: RwLock<Vec<PrinterDescriptor>>,
    /// `None` for in-memory registries.
    path: Option<PathBuf>,
}

impl JsonPrinterRegistry {
    /// Load the registry at `path`, seeding and writing the defaults if the
    /// file does not exist.
    #[instrument(fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(data) => {
                let printers: Vec<PrinterDescriptor> = serde_json::from_str(&data)?;
                info!(count = printers.len(), "loaded printer registry");
                Ok(Self {
                    printers: RwLock::new(printers),
                    path: Some(path.to_path_buf()),
                })
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let registry = Self {
                    printers: RwLock::new(default_printers()),
                    path: Some(path.to_path_buf()),
                };
                registry.save()?;
                info!("created default printer registry");
                Ok(registry)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// A registry that never touches disk.
    pub fn in_memory(printers: Vec<PrinterDescriptor>) -> Self {
        Self {
            printers: RwLock::new(printers),
            path: None,
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn all(&self) -> Result<Vec<PrinterDescriptor>> {
        Ok(self.read()?.clone())
    }

    pub fn get(&self, printer_id: &str) -> Result<Option<PrinterDescriptor>> {
        Ok(self.read()?.iter().find(|p| p.id == printer_id).cloned())
    }

    /// Insert `printer`, or merge it into the entry with the same ID.
    ///
    /// When merging, optional fields the update leaves unset keep their
    /// current value.
    pub fn upsert(&self, printer: PrinterDescriptor) -> Result<()> {
        {
            let mut printers = self.write()?;
            match printers.iter_mut().find(|p| p.id == printer.id) {
                Some(existing) => {
                    debug!(printer_id = %printer.id, "updating printer");
                    existing.name = printer.name;
                    existing.use_system_printing = printer.use_system_printing;
                    if printer.system_name.is_some() {
                        existing.system_name = printer.system_name;
                    }
                    if printer.ip.is_some() {
                        existing.ip = printer.ip;
                    }
                    if printer.port.is_some() {
                        existing.port = printer.port;
                    }
                }
                None => {
                    debug!(printer_id = %printer.id, "adding printer");
                    printers.push(printer);
                }
            }
        }
        self.save()
    }

    /// Remove a printer.  Returns `false` if no such printer existed.
    pub fn delete(&self, printer_id: &str) -> Result<bool> {
        let removed = {
            let mut printers = self.write()?;
            let before = printers.len();
            printers.retain(|p| p.id != printer_id);
            printers.len() != before
        };
        if removed {
            self.save()?;
        }
        Ok(removed)
    }

    /// Persist to the backing file, if any.
    pub fn save(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)?;
        }
        let json = serde_json::to_string_pretty(&*self.read()?)?;
        std::fs::write(path, json)?;
        debug!(path = %path.display(), "printer registry saved");
        Ok(())
    }

    /// Check whether a printer is reachable.
    ///
    /// System printers are assumed reachable; the OS spooler owns the
    /// connection.  Network printers get a TCP connect probe.
    #[instrument(skip(self, config))]
    pub async fn test_connection(
        &self,
        printer_id: &str,
        config: &ExecutorConfig,
    ) -> Result<ConnectionReport> {
        let printer = self.lookup(printer_id)?;

        let (reachable, message) = if printer.use_system_printing {
            (
                true,
                format!("{} uses the system print queue, no connection test needed", printer.name),
            )
        } else if let Some(ip) = &printer.ip {
            let port = printer.port.unwrap_or(config.raw_port);
            let reachable = raw_client::probe(ip, port, config.connect_timeout()).await;
            let verb = if reachable { "connected to" } else { "cannot connect to" };
            (reachable, format!("{} {} ({}:{})", verb, printer.name, ip, port))
        } else {
            (
                false,
                format!("{} has no IP address and system printing is disabled", printer.name),
            )
        };

        if reachable {
            info!(printer_id, "printer reachable");
        } else {
            warn!(printer_id, %message, "printer unreachable");
        }
        Ok(ConnectionReport {
            printer_id: printer.id,
            reachable,
            message,
        })
    }

    // -- Lock helpers ---------------------------------------------------------

    fn read(&self) -> Result<RwLockReadGuard<'_, Vec<PrinterDescriptor>>> {
        self.printers
            .read()
            .map_err(|_| PrintdockError::Registry("registry lock poisoned".into()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Vec<PrinterDescriptor>>> {
        self.printers
            .write()
            .map_err(|_| PrintdockError::Registry("registry lock poisoned".into()))
    }
}

impl PrinterRegistry for JsonPrinterRegistry {
    fn lookup(&self, printer_id: &str) -> Result<PrinterDescriptor> {
        self.get(printer_id)?
            .ok_or_else(|| PrintdockError::Validation(format!("unknown printer {printer_id}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[test]
    fn missing_file_is_seeded_with_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config").join("printers.json");

        let registry = JsonPrinterRegistry::open(&path).expect("open");
        let ids: Vec<String> = registry.all().expect("all").into_iter().map(|p| p.id).collect();
        assert_eq!(ids, vec!["809", "502", "301", "201"]);
        assert!(path.exists());

        let reopened = JsonPrinterRegistry::open(&path).expect("reopen");
        assert_eq!(reopened.all().expect("all").len(), 4);
    }

    #[test]
    fn reads_camel_case_entries() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("printers.json");
        std::fs::write(
            &path,
            r#"[{"id":"lab","name":"Lab","ip":"10.0.0.7","port":9101,"useSystemPrinting":false}]"#,
        )
        .expect("write");

        let registry = JsonPrinterRegistry::open(&path).expect("open");
        let lab = registry.lookup("lab").expect("lookup");
        assert_eq!(lab.ip.as_deref(), Some("10.0.0.7"));
        assert_eq!(lab.port, Some(9101));
        assert!(!lab.use_system_printing);
        assert_eq!(lab.device_name(), "Lab");
    }

    #[test]
    fn unknown_printer_is_a_validation_error() {
        let registry = JsonPrinterRegistry::in_memory(default_printers());
        let err = registry.lookup("999").unwrap_err();
        assert!(matches!(err, PrintdockError::Validation(_)));
    }

    #[test]
    fn upsert_merges_and_persists() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("printers.json");
        let registry = JsonPrinterRegistry::open(&path).expect("open");

        let mut update = PrinterDescriptor::system("809", "Floor 8");
        update.system_name = None;
        registry.upsert(update).expect("upsert");
        registry
            .upsert(PrinterDescriptor::network("lab", "Lab", "10.0.0.7"))
            .expect("insert");

        let reopened = JsonPrinterRegistry::open(&path).expect("reopen");
        let merged = reopened.lookup("809").expect("809");
        assert_eq!(merged.name, "Floor 8");
        // Unset in the update, so the old queue name survives.
        assert_eq!(merged.system_name.as_deref(), Some("809打印机"));
        assert!(reopened.lookup("lab").is_ok());
    }

    #[test]
    fn delete_reports_whether_anything_was_removed() {
        let registry = JsonPrinterRegistry::in_memory(default_printers());
        assert!(registry.delete("502").expect("delete"));
        assert!(!registry.delete("502").expect("delete again"));
        assert_eq!(registry.all().expect("all").len(), 3);
    }

    #[tokio::test]
    async fn connection_test_per_printer_kind() {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let port = listener.local_addr().expect("addr").port();

        let mut network = PrinterDescriptor::network("net", "Network", "127.0.0.1");
        network.port = Some(port);
        let mut orphan = PrinterDescriptor::network("orphan", "Orphan", "");
        orphan.ip = None;

        let registry = JsonPrinterRegistry::in_memory(vec![
            PrinterDescriptor::system("sys", "System"),
            network,
            orphan,
        ]);
        let config = ExecutorConfig::default();

        assert!(registry.test_connection("sys", &config).await.expect("sys").reachable);
        assert!(registry.test_connection("net", &config).await.expect("net").reachable);
        assert!(!registry.test_connection("orphan", &config).await.expect("orphan").reachable);
        assert!(registry.test_connection("missing", &config).await.is_err());
    }
}
