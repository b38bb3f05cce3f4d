use crate::config::AppConfig;
use crate::dashboard::{Dashboard, DashboardEvent, EVENT_CHANNEL_CAPACITY};
use crate::errors::NctsError;
use crate::hotkeys::action_for_key;
use crate::logging::JsonlLogger;
use crate::runtime::ProductionRuntime;
use crate::scheduler::RefreshScheduler;
use crossterm::cursor::{Hide, Show};
use crossterm::event::{self, Event};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::{CrosstermBackend, TestBackend};
use ratatui::buffer::Buffer;
use ratatui::Terminal;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tokio::sync::mpsc;

pub const SNAPSHOT_WIDTH: u16 = 120;
pub const SNAPSHOT_HEIGHT: u16 = 30;
const KEY_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Raw mode plus alternate screen, undone on drop so a panic or an early
/// return still hands the shell back a usable terminal.
pub struct TerminalSession {
    active: bool,
}

impl TerminalSession {
    pub fn enter() -> Result<Self, NctsError> {
        enable_raw_mode().map_err(|e| NctsError::Terminal(e.to_string()))?;
        let session = Self { active: true };
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen, Hide)
            .map_err(|e| NctsError::Terminal(e.to_string()))?;
        Ok(session)
    }

    pub fn restore(&mut self) -> Result<(), NctsError> {
        if !self.active {
            return Ok(());
        }
        self.active = false;
        let raw = disable_raw_mode();
        let mut stdout = io::stdout();
        execute!(stdout, LeaveAlternateScreen, Show)
            .map_err(|e| NctsError::Terminal(e.to_string()))?;
        raw.map_err(|e| NctsError::Terminal(e.to_string()))
    }
}

impl Drop for TerminalSession {
    fn drop(&mut self) {
        let _ = self.restore();
    }
}

/// Forwards key presses and resizes from crossterm into the dashboard
/// channel. Polls with a short timeout so `stop` is noticed promptly.
pub struct KeyReader {
    stop: Arc<AtomicBool>,
    join: Option<thread::JoinHandle<()>>,
}

impl KeyReader {
    pub fn spawn(events: mpsc::Sender<DashboardEvent>) -> Self {
        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = stop.clone();
        let join = thread::spawn(move || {
            while !stop_flag.load(Ordering::SeqCst) {
                match event::poll(KEY_POLL_INTERVAL) {
                    Ok(true) => {}
                    Ok(false) => continue,
                    Err(_) => break,
                }
                let forwarded = match event::read() {
                    Ok(Event::Key(key)) => match action_for_key(&key) {
                        Some(action) => DashboardEvent::Key(action),
                        None => continue,
                    },
                    Ok(Event::Resize(_, _)) => DashboardEvent::Resize,
                    Ok(_) => continue,
                    Err(_) => break,
                };
                if events.blocking_send(forwarded).is_err() {
                    break;
                }
            }
        });
        Self {
            stop,
            join: Some(join),
        }
    }

    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(join) = self.join.take() {
            let _ = join.join();
        }
    }
}

impl Drop for KeyReader {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Full-screen dashboard until the operator quits.
pub fn run_interactive(
    cfg: &AppConfig,
    runtime: &ProductionRuntime,
    logger: Option<JsonlLogger>,
) -> Result<(), NctsError> {
    let mut session = TerminalSession::enter()?;
    let terminal = Terminal::new(CrosstermBackend::new(io::stdout()))
        .map_err(|e| NctsError::Terminal(e.to_string()))?;
    let mut dashboard = Dashboard::from_config(
        terminal,
        cfg,
        runtime.process_runner.clone(),
        runtime.file_system.clone(),
        logger,
    );

    let (events, mut inbox) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
    let mut keys = KeyReader::spawn(events.clone());
    let mut scheduler = RefreshScheduler::start(cfg.refresh_interval(), move |ticket| {
        events.blocking_send(DashboardEvent::Redraw(ticket)).is_ok()
    });

    let result = dashboard.run(&mut inbox);
    scheduler.cancel();
    keys.stop();
    drop(dashboard);
    let restored = session.restore();
    result.and(restored)
}

/// Renders a single dashboard frame off-screen and returns it as text.
pub fn render_snapshot(
    cfg: &AppConfig,
    runtime: &ProductionRuntime,
    logger: Option<JsonlLogger>,
    width: u16,
    height: u16,
) -> Result<String, NctsError> {
    let terminal = Terminal::new(TestBackend::new(width, height))
        .map_err(|e| NctsError::Terminal(e.to_string()))?;
    let mut dashboard = Dashboard::from_config(
        terminal,
        cfg,
        runtime.process_runner.clone(),
        runtime.file_system.clone(),
        logger,
    );
    dashboard.redraw()?;
    Ok(buffer_to_string(dashboard.terminal().backend().buffer()))
}

/// Buffer contents row by row, trailing blanks trimmed.
pub fn buffer_to_string(buffer: &Buffer) -> String {
    let area = buffer.area;
    let mut out = String::new();
    for y in area.top()..area.bottom() {
        let mut line = String::new();
        for x in area.left()..area.right() {
            line.push_str(buffer[(x, y)].symbol());
        }
        out.push_str(line.trim_end());
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::{buffer_to_string, render_snapshot};
    use crate::config::AppConfig;
    use crate::runtime::{FakeFileSystem, FakeProcessRunner, FakeTerminal, ProductionRuntime};
    use ratatui::buffer::Buffer;
    use ratatui::layout::Rect;
    use std::sync::Arc;

    fn runtime(runner: &FakeProcessRunner, fs: &FakeFileSystem) -> ProductionRuntime {
        ProductionRuntime {
            file_system: Arc::new(fs.clone()),
            process_runner: Arc::new(runner.clone()),
            terminal: Arc::new(FakeTerminal::new(false)),
        }
    }

    #[test]
    fn buffer_dump_trims_trailing_blanks() {
        let mut buf = Buffer::empty(Rect::new(0, 0, 6, 2));
        buf.set_string(0, 0, "ab", ratatui::style::Style::default());
        assert_eq!(buffer_to_string(&buf), "ab\n\n");
    }

    #[test]
    fn snapshot_shows_jobs_and_the_first_jobs_output() {
        let runner = FakeProcessRunner::default();
        runner.push_stdout(
            "ID   State      Output               E-Level  Times(r/u/s)   Command [run=0/1]\n\
             7    finished   /tmp/ts-out.7        0        0.01/0.00/0.00 ls -la\n",
        );
        let fs = FakeFileSystem::with_file("/tmp/ts-out.7", "total 0\n");
        let frame = render_snapshot(&AppConfig::default(), &runtime(&runner, &fs), None, 80, 20)
            .expect("snapshot");

        let lines = frame.lines().collect::<Vec<_>>();
        assert_eq!(lines.len(), 20);
        assert!(lines[0].starts_with("Keys: "));
        assert!(lines[2].contains("ID   State"));
        assert!(lines[3].contains("ls -la"));
        assert!(frame.contains("│total 0"));
    }

    #[test]
    fn snapshot_without_spooler_still_draws_the_frame() {
        let runner = FakeProcessRunner::default();
        let frame = render_snapshot(
            &AppConfig::default(),
            &runtime(&runner, &FakeFileSystem::default()),
            None,
            40,
            12,
        )
        .expect("snapshot");
        let lines = frame.lines().collect::<Vec<_>>();
        assert!(lines[1].starts_with('┌'));
        assert!(lines[11].starts_with('└'));
    }
}
