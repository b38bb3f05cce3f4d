use crate::errors::NctsError;
use crate::logging::DEFAULT_DISK_BUDGET_BYTES;
use crate::runtime::FileSystem;
use crate::scheduler::DEFAULT_REFRESH_INTERVAL;
use crate::types::SortKey;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub config_path: Option<PathBuf>,
    pub command: Option<String>,
    pub sort: Option<String>,
    pub reverse: bool,
    pub refresh_ms: Option<u64>,
    pub log_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppConfig {
    pub spooler: SpoolerConfig,
    pub display: DisplayConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SpoolerConfig {
    pub command: String,
    pub remove_flag: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DisplayConfig {
    pub refresh_interval_ms: u64,
    pub max_lines: u16,
    pub pad_width: u16,
    pub sort_key: String,
    pub reverse: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LoggingConfig {
    pub enabled: bool,
    pub path: PathBuf,
    pub max_payload_bytes: usize,
    pub budget_bytes: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            spooler: SpoolerConfig {
                command: "tsp".to_string(),
                remove_flag: "-r".to_string(),
            },
            display: DisplayConfig {
                refresh_interval_ms: DEFAULT_REFRESH_INTERVAL.as_millis() as u64,
                max_lines: 500,
                pad_width: 80,
                sort_key: "state".to_string(),
                reverse: false,
            },
            logging: LoggingConfig {
                enabled: true,
                path: std::env::temp_dir().join("ncts").join("events.jsonl"),
                max_payload_bytes: 4096,
                budget_bytes: DEFAULT_DISK_BUDGET_BYTES,
            },
        }
    }
}

impl AppConfig {
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.display.refresh_interval_ms)
    }

    pub fn sort_key(&self) -> SortKey {
        SortKey::parse(&self.display.sort_key)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct PartialAppConfig {
    spooler: Option<PartialSpoolerConfig>,
    display: Option<PartialDisplayConfig>,
    logging: Option<PartialLoggingConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct PartialSpoolerConfig {
    command: Option<String>,
    remove_flag: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct PartialDisplayConfig {
    refresh_interval_ms: Option<u64>,
    max_lines: Option<u16>,
    pad_width: Option<u16>,
    sort_key: Option<String>,
    reverse: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct PartialLoggingConfig {
    enabled: Option<bool>,
    path: Option<PathBuf>,
    max_payload_bytes: Option<usize>,
    budget_bytes: Option<u64>,
}

pub fn load_config(overrides: &CliOverrides, fs: &dyn FileSystem) -> Result<AppConfig, NctsError> {
    let mut cfg = AppConfig::default();

    if let Some(path) = &overrides.config_path {
        let file_contents = fs.read_to_string(path)?;
        let partial: PartialAppConfig = toml::from_str(&file_contents)
            .map_err(|e| NctsError::ConfigParse(e.to_string()))?;
        merge_partial_config(&mut cfg, partial);
    }

    apply_cli_overrides(&mut cfg, overrides);
    validate_config(&cfg)?;
    Ok(cfg)
}

fn merge_partial_config(cfg: &mut AppConfig, partial: PartialAppConfig) {
    if let Some(spooler) = partial.spooler {
        if let Some(command) = spooler.command {
            cfg.spooler.command = command;
        }
        if let Some(remove_flag) = spooler.remove_flag {
            cfg.spooler.remove_flag = remove_flag;
        }
    }

    if let Some(display) = partial.display {
        if let Some(value) = display.refresh_interval_ms {
            cfg.display.refresh_interval_ms = value;
        }
        if let Some(value) = display.max_lines {
            cfg.display.max_lines = value;
        }
        if let Some(value) = display.pad_width {
            cfg.display.pad_width = value;
        }
        if let Some(value) = display.sort_key {
            cfg.display.sort_key = value;
        }
        if let Some(value) = display.reverse {
            cfg.display.reverse = value;
        }
    }

    if let Some(logging) = partial.logging {
        if let Some(value) = logging.enabled {
            cfg.logging.enabled = value;
        }
        if let Some(value) = logging.path {
            cfg.logging.path = value;
        }
        if let Some(value) = logging.max_payload_bytes {
            cfg.logging.max_payload_bytes = value;
        }
        if let Some(value) = logging.budget_bytes {
            cfg.logging.budget_bytes = value;
        }
    }
}

fn apply_cli_overrides(cfg: &mut AppConfig, overrides: &CliOverrides) {
    if let Some(command) = &overrides.command {
        cfg.spooler.command = command.clone();
    }
    if let Some(sort) = &overrides.sort {
        cfg.display.sort_key = sort.clone();
    }
    if overrides.reverse {
        cfg.display.reverse = true;
    }
    if let Some(refresh_ms) = overrides.refresh_ms {
        cfg.display.refresh_interval_ms = refresh_ms;
    }
    if let Some(path) = &overrides.log_file {
        cfg.logging.enabled = true;
        cfg.logging.path = path.clone();
    }
}

fn validate_config(cfg: &AppConfig) -> Result<(), NctsError> {
    if cfg.spooler.command.trim().is_empty() {
        return Err(NctsError::InvalidConfig(
            "spooler.command must not be empty".to_string(),
        ));
    }
    if cfg.spooler.remove_flag.trim().is_empty() {
        return Err(NctsError::InvalidConfig(
            "spooler.remove_flag must not be empty".to_string(),
        ));
    }
    if cfg.display.refresh_interval_ms == 0 {
        return Err(NctsError::InvalidConfig(
            "display.refresh_interval_ms must be greater than zero".to_string(),
        ));
    }
    if cfg.display.max_lines == 0 {
        return Err(NctsError::InvalidConfig(
            "display.max_lines must be greater than zero".to_string(),
        ));
    }
    if cfg.display.pad_width == 0 {
        return Err(NctsError::InvalidConfig(
            "display.pad_width must be greater than zero".to_string(),
        ));
    }
    if cfg.logging.enabled && cfg.logging.path.file_name().is_none() {
        return Err(NctsError::InvalidConfig(
            "logging.path must name a file".to_string(),
        ));
    }
    Ok(())
}
