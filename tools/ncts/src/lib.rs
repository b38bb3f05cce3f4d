pub mod config;
pub mod dashboard;
pub mod dimensions;
pub mod errors;
pub mod hotkeys;
pub mod log_retention;
pub mod logging;
pub mod palette;
pub mod runtime;
pub mod scheduler;
pub mod selection;
pub mod surface;
pub mod tailer;
pub mod task_list;
pub mod tui;
pub mod types;

use clap::{error::ErrorKind, Parser};
use config::{load_config, AppConfig, CliOverrides};
use errors::NctsError;
use logging::JsonlLogger;
use runtime::ProductionRuntime;
use serde_json::json;
use tui::{render_snapshot, run_interactive, SNAPSHOT_HEIGHT, SNAPSHOT_WIDTH};

#[derive(Debug, Clone, Parser)]
#[command(name = "ncts")]
#[command(about = "Terminal dashboard for Task Spooler queues")]
pub struct Cli {
    /// TOML file merged over the built-in defaults
    #[arg(long)]
    pub config: Option<std::path::PathBuf>,
    /// Spooler executable, e.g. `ts` where `tsp` is not installed
    #[arg(long)]
    pub command: Option<String>,
    /// Sort key: id, state, output, exit_level, elapsed, command
    #[arg(long)]
    pub sort: Option<String>,
    #[arg(long, default_value_t = false)]
    pub reverse: bool,
    #[arg(long = "refresh-ms")]
    pub refresh_ms: Option<u64>,
    /// JSONL event log; enables logging even if the config disables it
    #[arg(long)]
    pub log_file: Option<std::path::PathBuf>,
    /// Print one frame to stdout and exit; needs no terminal
    #[arg(long, default_value_t = false)]
    pub once: bool,
}

pub fn run() -> Result<i32, NctsError> {
    let args = std::env::args_os().collect::<Vec<_>>();
    let runtime = ProductionRuntime::new();
    run_with_runtime(&args, &runtime)
}

pub fn run_with_runtime(
    args: &[std::ffi::OsString],
    runtime: &ProductionRuntime,
) -> Result<i32, NctsError> {
    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(error) => match error.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
                print!("{error}");
                return Ok(0);
            }
            _ => return Err(NctsError::Cli(error.to_string())),
        },
    };

    if !cli.once && !runtime.terminal.stdin_is_tty() {
        return Err(NctsError::Cli(
            "the dashboard needs an interactive terminal; use --once for a snapshot".to_string(),
        ));
    }

    let overrides = CliOverrides {
        config_path: cli.config.clone(),
        command: cli.command.clone(),
        sort: cli.sort.clone(),
        reverse: cli.reverse,
        refresh_ms: cli.refresh_ms,
        log_file: cli.log_file.clone(),
    };
    let cfg = load_config(&overrides, runtime.file_system.as_ref())?;
    let logger = JsonlLogger::from_config(&cfg.logging);
    log_startup(logger.as_ref(), &cfg, cli.once);

    let outcome = if cli.once {
        render_snapshot(&cfg, runtime, logger.clone(), SNAPSHOT_WIDTH, SNAPSHOT_HEIGHT)
            .and_then(|frame| runtime.terminal.draw(&frame))
    } else {
        run_interactive(&cfg, runtime, logger.clone())
    };

    if let Some(logger) = &logger {
        match &outcome {
            Ok(()) => logger.record("info", "shutdown", json!({})),
            Err(error) => logger.record("error", "shutdown", json!({"error": error.to_string()})),
        }
    }
    outcome.map(|()| 0)
}

fn log_startup(logger: Option<&JsonlLogger>, cfg: &AppConfig, once: bool) {
    let Some(logger) = logger else {
        return;
    };
    logger.record(
        "info",
        "startup",
        json!({
            "command": cfg.spooler.command,
            "sort_key": cfg.sort_key().as_str(),
            "reverse": cfg.display.reverse,
            "refresh_interval_ms": cfg.display.refresh_interval_ms,
            "once": once,
        }),
    );
}
