// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Daemon configuration, persisted as JSON.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{PrintdockError, Result};

/// Top-level settings file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AppConfig {
    pub scheduler: SchedulerConfig,
    pub executor: ExecutorConfig,
    /// Location of the JSON printer registry.
    pub printers_path: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            scheduler: SchedulerConfig::default(),
            executor: ExecutorConfig::default(),
            printers_path: PathBuf::from("config").join("printers.json"),
        }
    }
}

impl AppConfig {
    /// Load settings from `path`, falling back to defaults when the file does
    /// not exist.  Fields missing from the file take their default value.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let config = match std::fs::read_to_string(path) {
            Ok(data) => {
                info!(path = %path.display(), "loaded configuration");
                serde_json::from_str(&data)?
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no configuration file, using defaults");
                Self::default()
            }
            Err(e) => return Err(e.into()),
        };
        config.validate()?;
        Ok(config)
    }

    /// Write settings to `path` as pretty-printed JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        self.scheduler.validate()?;
        self.executor.validate()
    }
}

/// Scheduling loop and retention settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SchedulerConfig {
    /// Period of the dispatch loop.
    pub tick_interval_ms: u64,
    /// Period of the retention sweep.
    pub sweep_interval_ms: u64,
    /// Maximum number of jobs in `Processing` at once.  1 serialises all
    /// jobs, for spoolers that are not reentrant.
    pub max_concurrent: usize,
    /// Total attempts per job (initial try included).
    pub max_attempts: u32,
    /// How long terminal jobs stay visible before eviction.
    pub retention_secs: u64,
    /// Number of jobs listed in the status report.
    pub recent_jobs_limit: usize,
    /// Where simplex-transformed files are written.
    pub temp_dir: PathBuf,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 1000,
            sweep_interval_ms: 60_000,
            max_concurrent: 1,
            max_attempts: 3,
            retention_secs: 30 * 60,
            recent_jobs_limit: 10,
            temp_dir: PathBuf::from("temp"),
        }
    }
}

impl SchedulerConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_millis(self.sweep_interval_ms)
    }

    /// Retention window.  Values too large to represent saturate to the
    /// longest window; `validate` rejects them up front.
    pub fn retention(&self) -> chrono::Duration {
        self.checked_retention().unwrap_or(chrono::Duration::MAX)
    }

    fn checked_retention(&self) -> Option<chrono::Duration> {
        i64::try_from(self.retention_secs)
            .ok()
            .and_then(chrono::Duration::try_seconds)
    }

    pub fn validate(&self) -> Result<()> {
        if self.tick_interval_ms == 0 || self.sweep_interval_ms == 0 {
            return Err(PrintdockError::Config(
                "scheduler intervals must be non-zero".into(),
            ));
        }
        if self.max_concurrent == 0 {
            return Err(PrintdockError::Config(
                "maxConcurrent must be at least 1".into(),
            ));
        }
        if self.max_attempts == 0 {
            return Err(PrintdockError::Config(
                "maxAttempts must be at least 1".into(),
            ));
        }
        if self.checked_retention().is_none() {
            return Err(PrintdockError::Config(format!(
                "retentionSecs {} is out of range",
                self.retention_secs
            )));
        }
        Ok(())
    }
}

/// Print executor settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ExecutorConfig {
    /// Upper bound on one print command or raw transfer.
    pub command_timeout_secs: u64,
    /// PDF printing helper used on Windows.
    pub pdf_to_printer_path: PathBuf,
    /// Port used for network printers without an explicit port.
    pub raw_port: u16,
    /// Timeout for connectivity probes and raw TCP connects.
    pub connect_timeout_secs: u64,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            command_timeout_secs: 120,
            pdf_to_printer_path: PathBuf::from("PDFtoPrinter.exe"),
            raw_port: 9100,
            connect_timeout_secs: 5,
        }
    }
}

impl ExecutorConfig {
    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn validate(&self) -> Result<()> {
        if self.command_timeout_secs == 0 || self.connect_timeout_secs == 0 {
            return Err(PrintdockError::Config("executor timeouts must be non-zero".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = AppConfig::default();
        assert_eq!(config.scheduler.max_concurrent, 1);
        assert_eq!(config.scheduler.max_attempts, 3);
        assert_eq!(config.scheduler.retention(), chrono::Duration::minutes(30));
        assert_eq!(config.scheduler.recent_jobs_limit, 10);
        assert_eq!(config.executor.raw_port, 9100);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let config: AppConfig =
            serde_json::from_str(r#"{"scheduler":{"maxConcurrent":4}}"#).expect("parse");
        assert_eq!(config.scheduler.max_concurrent, 4);
        assert_eq!(config.scheduler.tick_interval_ms, 1000);
        assert_eq!(config.executor.command_timeout_secs, 120);
    }

    #[test]
    fn zero_ceiling_is_rejected() {
        let mut config = AppConfig::default();
        config.scheduler.max_concurrent = 0;
        assert!(matches!(config.validate(), Err(PrintdockError::Config(_))));
    }

    #[test]
    fn out_of_range_retention_is_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("printdock.json");

        for secs in ["18446744073709551615", "10000000000000000"] {
            std::fs::write(&path, format!(r#"{{"scheduler":{{"retentionSecs":{secs}}}}}"#))
                .expect("write");
            assert!(
                matches!(AppConfig::load(&path), Err(PrintdockError::Config(_))),
                "retentionSecs = {secs}"
            );
        }
    }

    #[test]
    fn oversized_retention_saturates_instead_of_wrapping() {
        let scheduler = SchedulerConfig {
            retention_secs: u64::MAX,
            ..SchedulerConfig::default()
        };
        assert_eq!(scheduler.retention(), chrono::Duration::MAX);
        assert!(scheduler.retention() > chrono::Duration::zero());
    }

    #[test]
    fn missing_file_loads_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = AppConfig::load(dir.path().join("absent.json")).expect("load");
        assert_eq!(config.scheduler.max_attempts, 3);
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("printdock.json");

        let mut config = AppConfig::default();
        config.scheduler.max_concurrent = 2;
        config.save(&path).expect("save");

        let loaded = AppConfig::load(&path).expect("load");
        assert_eq!(loaded.scheduler.max_concurrent, 2);
    }
}
