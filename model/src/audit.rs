use std::{
    env,
    fs::OpenOptions,
    io::Write,
    path::PathBuf,
    time::{SystemTime, UNIX_EPOCH},
};

use log::debug;
use serde::Serialize;

/// One immutable prediction event. Append order is the only ordering;
/// nothing in this service reads these back.
#[derive(Debug, Serialize)]
pub struct AuditRecord<'a, I> {
    pub event: &'static str,
    pub ts: f64,
    pub model_version: &'a str,
    pub input: &'a I,
    pub prediction: f64,
    pub latency_s: f64,
}

/// Seconds since the Unix epoch, as a float.
pub fn unix_ts() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}

/// Best-effort append-only sink for prediction events.
///
/// Disabled by default. Every I/O failure is swallowed: auditing must
/// never affect a predict response.
#[derive(Debug, Clone)]
pub struct AuditSink {
    enabled: bool,
    path: PathBuf,
}

impl AuditSink {
    pub fn new(enabled: bool, path: PathBuf) -> Self {
        Self { enabled, path }
    }

    /// Builds the sink from `ENABLE_AUDIT_LOGS` and `AUDIT_LOG_PATH`.
    pub fn from_env() -> Self {
        let enabled = env::var("ENABLE_AUDIT_LOGS")
            .map(|v| v.to_lowercase() == "true")
            .unwrap_or(false);
        let path = env::var("AUDIT_LOG_PATH")
            .unwrap_or_else(|_| "./data/audit_log.txt".to_string())
            .into();

        Self { enabled, path }
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Appends one JSON line for the given record. No-op when disabled.
    pub fn record<I: Serialize>(&self, record: &AuditRecord<'_, I>) {
        if !self.enabled {
            return;
        }

        let Ok(line) = serde_json::to_string(record) else {
            return;
        };

        let appended = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .and_then(|mut file| writeln!(file, "{line}"));

        if let Err(e) = appended {
            debug!("audit append failed: {e}");
        }
    }
}
