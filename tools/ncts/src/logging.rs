use crate::config::LoggingConfig;
use crate::errors::NctsError;
use crate::log_retention::rotate_if_over_budget;
use serde::Serialize;
use serde_json::Value;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

pub const DEFAULT_DISK_BUDGET_BYTES: u64 = 5 * 1024 * 1024;

/// Append-only JSON-lines event log. The terminal belongs to the dashboard
/// while it runs, so this file is the only diagnostic channel.
#[derive(Debug, Clone)]
pub struct JsonlLogger {
    pub path: PathBuf,
    pub max_payload_bytes: usize,
    pub budget_bytes: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct LogEvent<'a> {
    pub level: &'a str,
    pub event_type: &'a str,
    pub payload: Value,
}

#[derive(Serialize)]
struct LogLine<'a> {
    ts_unix_ms: u128,
    level: &'a str,
    event_type: &'a str,
    payload: Value,
}

impl JsonlLogger {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            max_payload_bytes: 4096,
            budget_bytes: DEFAULT_DISK_BUDGET_BYTES,
        }
    }

    pub fn from_config(cfg: &LoggingConfig) -> Option<Self> {
        if !cfg.enabled {
            return None;
        }
        Some(Self {
            path: cfg.path.clone(),
            max_payload_bytes: cfg.max_payload_bytes,
            budget_bytes: cfg.budget_bytes,
        })
    }

    pub fn append(&self, event: &LogEvent<'_>) -> Result<(), NctsError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| NctsError::Io(e.to_string()))?;
        }
        let ts_unix_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_millis())
            .unwrap_or_default();
        let line = serde_json::to_string(&LogLine {
            ts_unix_ms,
            level: event.level,
            event_type: event.event_type,
            payload: truncate_json(event.payload.clone(), self.max_payload_bytes),
        })
        .map_err(|e| NctsError::Io(e.to_string()))?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| NctsError::Io(e.to_string()))?;
        file.write_all(line.as_bytes())
            .map_err(|e| NctsError::Io(e.to_string()))?;
        file.write_all(b"\n")
            .map_err(|e| NctsError::Io(e.to_string()))?;

        drop(file);
        rotate_if_over_budget(&self.path, self.budget_bytes)?;
        Ok(())
    }

    /// Like `append`, but a failing log never interrupts the caller.
    pub fn record(&self, level: &str, event_type: &str, payload: Value) {
        let _ = self.append(&LogEvent {
            level,
            event_type,
            payload,
        });
    }
}

fn truncate_json(value: Value, max_bytes: usize) -> Value {
    let rendered = serde_json::to_string(&value).unwrap_or_default();
    if rendered.len() <= max_bytes {
        return value;
    }
    let mut cut = max_bytes.saturating_sub(3);
    while !rendered.is_char_boundary(cut) {
        cut -= 1;
    }
    Value::String(format!("{}...", &rendered[..cut]))
}
