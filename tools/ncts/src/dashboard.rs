use crate::config::AppConfig;
use crate::dimensions::DimensionPlanner;
use crate::errors::NctsError;
use crate::hotkeys::{dashboard_controls_legend, HotkeyAction};
use crate::logging::JsonlLogger;
use crate::palette::{header_style, highlight};
use crate::runtime::{FileSystem, ProcessRunner};
use crate::scheduler::RedrawTicket;
use crate::selection::{SelectionController, SelectionEvent, SelectionState};
use crate::surface::Surface;
use crate::tailer::OutputTailer;
use crate::task_list::{JobList, TaskListSource, TaskSpooler};
use ratatui::backend::Backend;
use ratatui::style::Style;
use ratatui::Terminal;
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::sync::mpsc;

pub const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Everything that can wake the dashboard loop.
#[derive(Debug)]
pub enum DashboardEvent {
    Key(HotkeyAction),
    Redraw(RedrawTicket),
    Resize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopControl {
    Continue,
    Quit,
}

/// Owns the screen, the job list and the selection. Only the loop thread
/// touches it; timer and key threads talk to it through `DashboardEvent`s.
pub struct Dashboard<B: Backend> {
    terminal: Terminal<B>,
    source: TaskListSource,
    tailer: OutputTailer,
    planner: DimensionPlanner,
    selection: SelectionController,
    job_surface: Surface,
    output_surface: Surface,
    legend: String,
    logger: Option<JsonlLogger>,
    source_healthy: bool,
}

impl<B: Backend> Dashboard<B> {
    pub fn new(
        terminal: Terminal<B>,
        source: TaskListSource,
        tailer: OutputTailer,
        max_lines: u16,
        pad_width: u16,
        logger: Option<JsonlLogger>,
    ) -> Self {
        let mut job_surface = Surface::new(0, 0, 0, 0);
        job_surface.attach_pad(max_lines, pad_width);
        let mut output_surface = Surface::new(0, 0, 0, 0);
        output_surface.attach_pad(max_lines, pad_width);
        Self {
            terminal,
            source,
            tailer,
            planner: DimensionPlanner::new(),
            selection: SelectionController::new(),
            job_surface,
            output_surface,
            legend: dashboard_controls_legend(),
            logger,
            source_healthy: true,
        }
    }

    /// Wires a `tsp`-backed dashboard from the merged configuration.
    pub fn from_config(
        terminal: Terminal<B>,
        cfg: &AppConfig,
        process_runner: Arc<dyn ProcessRunner>,
        file_system: Arc<dyn FileSystem>,
        logger: Option<JsonlLogger>,
    ) -> Self {
        let spooler = TaskSpooler::new(
            process_runner,
            cfg.spooler.command.clone(),
            cfg.spooler.remove_flag.clone(),
        );
        let source = TaskListSource::new(Box::new(spooler), cfg.sort_key(), cfg.display.reverse);
        Self::new(
            terminal,
            source,
            OutputTailer::new(file_system),
            cfg.display.max_lines,
            cfg.display.pad_width,
            logger,
        )
    }

    pub fn terminal(&self) -> &Terminal<B> {
        &self.terminal
    }

    pub fn terminal_mut(&mut self) -> &mut Terminal<B> {
        &mut self.terminal
    }

    pub fn list(&self) -> &JobList {
        self.source.list()
    }

    pub fn selection(&self) -> SelectionState {
        self.selection.state()
    }

    pub fn job_surface(&self) -> &Surface {
        &self.job_surface
    }

    pub fn output_surface(&self) -> &Surface {
        &self.output_surface
    }

    /// One full cycle: fit the layout, re-poll, repaint both pads, then
    /// flush everything to the terminal in a single frame.
    pub fn redraw(&mut self) -> Result<(), NctsError> {
        let size = self
            .terminal
            .size()
            .map_err(|e| NctsError::Terminal(e.to_string()))?;
        if let Some(regions) = self.planner.recompute(size.height, size.width) {
            self.job_surface
                .resize(regions.job_list.height, regions.job_list.width);
            self.job_surface.move_to(regions.job_list.y, regions.job_list.x);
            self.output_surface
                .resize(regions.output.height, regions.output.width);
            self.output_surface.move_to(regions.output.y, regions.output.x);
            self.log(
                "debug",
                "resize",
                json!({"height": size.height, "width": size.width}),
            );
        }

        self.poll_source();
        self.selection
            .apply(SelectionEvent::JobListShrunk(self.source.list().len()));
        self.paint_job_rows();

        let target = OutputTailer::target(self.source.list(), self.selection.selected_row());
        let _ = self.tailer.render(target, self.output_surface.pad_mut());

        self.flush()
    }

    /// Applies a key. Returns `Quit` without touching the screen so the
    /// caller can tear down right away.
    pub fn dispatch(&mut self, action: HotkeyAction) -> LoopControl {
        match action {
            HotkeyAction::NavigateUp => {
                self.selection.apply(SelectionEvent::NavigateUp);
            }
            HotkeyAction::NavigateDown => {
                self.selection.apply(SelectionEvent::NavigateDown);
            }
            HotkeyAction::ClearSelection => {
                self.selection.apply(SelectionEvent::Escape);
            }
            HotkeyAction::RemoveJob => self.remove_selected(),
            HotkeyAction::Quit => return LoopControl::Quit,
        }
        LoopControl::Continue
    }

    /// Blocks on `events` until a quit key arrives, every sender is gone, or
    /// a redraw fails. The channel is closed on the way out so the timer and
    /// key threads stop at their next send.
    pub fn run(&mut self, events: &mut mpsc::Receiver<DashboardEvent>) -> Result<(), NctsError> {
        let result = self.run_until_quit(events);
        events.close();
        result
    }

    fn run_until_quit(
        &mut self,
        events: &mut mpsc::Receiver<DashboardEvent>,
    ) -> Result<(), NctsError> {
        self.redraw()?;
        while let Some(event) = events.blocking_recv() {
            match event {
                DashboardEvent::Key(action) => {
                    if self.dispatch(action) == LoopControl::Quit {
                        return Ok(());
                    }
                    self.redraw()?;
                }
                DashboardEvent::Redraw(ticket) => {
                    let outcome = self.redraw();
                    ticket.complete();
                    outcome?;
                }
                DashboardEvent::Resize => self.redraw()?,
            }
        }
        Ok(())
    }

    fn poll_source(&mut self) {
        match self.source.refresh() {
            Ok(malformed) => {
                if !self.source_healthy {
                    self.log("info", "poll_recovered", json!({"jobs": self.source.list().len()}));
                }
                self.source_healthy = true;
                if !malformed.is_empty() {
                    self.log(
                        "warn",
                        "malformed_lines",
                        json!({"count": malformed.len(), "lines": malformed}),
                    );
                }
            }
            Err(error) => {
                if self.source_healthy {
                    self.log("warn", "poll_failed", json!({"error": error.to_string()}));
                }
                self.source_healthy = false;
            }
        }
    }

    fn paint_job_rows(&mut self) {
        let pad = self.job_surface.pad_mut();
        pad.clear();
        let list = self.source.list();
        pad.put(0, list.header(), header_style());
        let selected_row = self.selection.selected_row();
        for (index, job) in list.jobs().iter().enumerate() {
            let row = index + 1;
            let Ok(pad_row) = u16::try_from(row) else {
                break;
            };
            if !pad.put(pad_row, &job.line, highlight(row, job.state, selected_row).style()) {
                break;
            }
        }
        let focus = selected_row
            .and_then(|row| u16::try_from(row).ok())
            .unwrap_or(0);
        self.job_surface.scroll_to_show(focus);
    }

    fn remove_selected(&mut self) {
        let id = self
            .selection
            .selected_row()
            .and_then(|row| self.source.list().at_row(row))
            .map(|job| job.id.clone());
        let target = id.clone().map_or(Value::Null, Value::String);
        match self.source.remove_job(id.as_deref()) {
            Ok(()) => self.log("info", "remove_requested", json!({"id": target})),
            Err(error) => self.log(
                "warn",
                "remove_failed",
                json!({"id": target, "error": error.to_string()}),
            ),
        }
    }

    fn flush(&mut self) -> Result<(), NctsError> {
        let legend = &self.legend;
        let job_surface = &self.job_surface;
        let output_surface = &self.output_surface;
        self.terminal
            .draw(|frame| {
                let area = frame.area();
                let buf = frame.buffer_mut();
                if area.height > 0 {
                    buf.set_stringn(area.x, area.y, legend, usize::from(area.width), Style::default());
                }
                job_surface.render(buf);
                output_surface.render(buf);
            })
            .map_err(|e| NctsError::Terminal(e.to_string()))?;
        Ok(())
    }

    fn log(&self, level: &str, event_type: &str, payload: Value) {
        if let Some(logger) = &self.logger {
            logger.record(level, event_type, payload);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Dashboard, DashboardEvent, LoopControl, EVENT_CHANNEL_CAPACITY};
    use crate::config::AppConfig;
    use crate::hotkeys::HotkeyAction;
    use crate::logging::JsonlLogger;
    use crate::runtime::{FakeFileSystem, FakeProcessRunner};
    use crate::selection::SelectionState;
    use ratatui::backend::TestBackend;
    use ratatui::buffer::Buffer;
    use ratatui::style::Color;
    use ratatui::Terminal;
    use std::sync::Arc;
    use tokio::sync::mpsc;

    const LISTING: &str = "ID   State      Output               E-Level  Times(r/u/s)   Command [run=1/1]\n\
        3    queued     (file)                                       make test\n\
        1    finished   /tmp/ts-out.a        0        1.00/0.10/0.00 echo hi\n\
        4    running    /tmp/ts-out.d                                sleep 100\n\
        2    finished   /tmp/ts-out.b        1        0.20/0.00/0.00 false\n";

    fn dashboard(
        runner: &FakeProcessRunner,
        fs: &FakeFileSystem,
        width: u16,
        height: u16,
    ) -> Dashboard<TestBackend> {
        let terminal = Terminal::new(TestBackend::new(width, height)).expect("terminal");
        Dashboard::from_config(
            terminal,
            &AppConfig::default(),
            Arc::new(runner.clone()),
            Arc::new(fs.clone()),
            None,
        )
    }

    fn row_text(buf: &Buffer, y: u16) -> String {
        (0..buf.area.width)
            .map(|x| buf[(x, y)].symbol().to_string())
            .collect()
    }

    fn outputs() -> FakeFileSystem {
        let fs = FakeFileSystem::with_file("/tmp/ts-out.d", "sleeping\nstill sleeping\n");
        fs.insert("/tmp/ts-out.a", "hi\n");
        fs
    }

    #[test]
    fn first_redraw_lays_out_legend_list_and_output() {
        let runner = FakeProcessRunner::default();
        runner.push_stdout(LISTING);
        let fs = outputs();
        let mut dashboard = dashboard(&runner, &fs, 100, 30);

        dashboard.redraw().expect("redraw");

        let buf = dashboard.terminal().backend().buffer();
        assert!(row_text(buf, 0).starts_with("Keys: "));
        assert!(row_text(buf, 1).starts_with('┌'));
        assert!(row_text(buf, 2).contains("ID   State"));
        assert!(row_text(buf, 3).contains("sleep 100"));
        assert!(row_text(buf, 4).contains("make test"));

        let output_top = dashboard.output_surface().area().y;
        assert_eq!(output_top, 13);
        assert!(row_text(buf, output_top + 1).contains("sleeping"));
        assert!(row_text(buf, output_top + 2).contains("still sleeping"));
    }

    #[test]
    fn rows_are_colored_by_state_and_header_is_bold() {
        let runner = FakeProcessRunner::default();
        runner.push_stdout(LISTING);
        let mut dashboard = dashboard(&runner, &outputs(), 100, 30);
        dashboard.redraw().expect("redraw");

        let pad = dashboard.job_surface().pad();
        let header = pad.row_style(0).expect("header");
        assert!(header.add_modifier.contains(ratatui::style::Modifier::BOLD));
        assert_eq!(pad.row_style(1).and_then(|s| s.fg), Some(Color::Green));
        assert_eq!(pad.row_style(2).and_then(|s| s.fg), Some(Color::Yellow));
        assert_eq!(pad.row_style(3).and_then(|s| s.fg), Some(Color::Red));
        assert_eq!(pad.row_style(4).and_then(|s| s.fg), Some(Color::White));
    }

    #[test]
    fn selecting_a_row_inverts_it_and_tails_its_output() {
        let runner = FakeProcessRunner::default();
        runner.push_stdout(LISTING);
        runner.push_stdout(LISTING);
        runner.push_stdout(LISTING);
        let fs = outputs();
        let mut dashboard = dashboard(&runner, &fs, 100, 30);
        dashboard.redraw().expect("redraw");

        for _ in 0..4 {
            assert_eq!(dashboard.dispatch(HotkeyAction::NavigateDown), LoopControl::Continue);
        }
        dashboard.redraw().expect("redraw");
        assert_eq!(dashboard.selection(), SelectionState::Selected(4));
        let selected = dashboard.job_surface().pad().row_style(4).expect("row");
        assert_eq!(selected.fg, Some(Color::Black));
        assert_eq!(selected.bg, Some(Color::White));
        assert_eq!(dashboard.output_surface().pad().row_text(0), Some("hi"));

        dashboard.dispatch(HotkeyAction::ClearSelection);
        dashboard.redraw().expect("redraw");
        assert_eq!(dashboard.selection(), SelectionState::Unselected);
        assert_eq!(dashboard.output_surface().pad().row_text(0), Some("sleeping"));
    }

    #[test]
    fn missing_output_file_leaves_the_output_pad_empty() {
        let runner = FakeProcessRunner::default();
        runner.push_stdout(LISTING);
        let mut dashboard = dashboard(&runner, &FakeFileSystem::default(), 100, 30);
        dashboard.redraw().expect("redraw");
        assert_eq!(dashboard.output_surface().pad().row_text(0), None);
    }

    #[test]
    fn failed_poll_keeps_the_previous_list_on_screen() {
        let runner = FakeProcessRunner::default();
        runner.push_stdout(LISTING);
        let mut dashboard = dashboard(&runner, &outputs(), 100, 30);
        dashboard.redraw().expect("redraw");

        dashboard.redraw().expect("redraw survives a failed poll");
        assert_eq!(dashboard.list().len(), 4);
    }

    #[test]
    fn shrinking_list_clamps_the_selection() {
        let runner = FakeProcessRunner::default();
        runner.push_stdout(LISTING);
        runner.push_stdout("ID State Output E-Level Times Command\n5 running /tmp/five x\n");
        let mut dashboard = dashboard(&runner, &outputs(), 100, 30);
        dashboard.redraw().expect("redraw");
        dashboard.dispatch(HotkeyAction::NavigateDown);
        dashboard.dispatch(HotkeyAction::NavigateDown);
        dashboard.dispatch(HotkeyAction::NavigateDown);

        dashboard.redraw().expect("redraw");
        assert_eq!(dashboard.selection(), SelectionState::Selected(1));
    }

    #[test]
    fn remove_targets_the_selected_job_or_the_spooler_default() {
        let runner = FakeProcessRunner::default();
        runner.push_stdout(LISTING);
        let mut dashboard = dashboard(&runner, &outputs(), 100, 30);
        dashboard.redraw().expect("redraw");

        runner.push_stdout("");
        dashboard.dispatch(HotkeyAction::RemoveJob);
        dashboard.dispatch(HotkeyAction::NavigateDown);
        dashboard.dispatch(HotkeyAction::NavigateDown);
        runner.push_stdout("");
        dashboard.dispatch(HotkeyAction::RemoveJob);

        let removals = runner
            .requests()
            .into_iter()
            .filter(|request| request.args.first().map(String::as_str) == Some("-r"))
            .map(|request| request.args)
            .collect::<Vec<_>>();
        assert_eq!(removals, vec![vec!["-r".to_string()], vec!["-r".to_string(), "3".to_string()]]);
    }

    #[test]
    fn resize_recomputes_regions_once() {
        let runner = FakeProcessRunner::default();
        runner.push_stdout(LISTING);
        runner.push_stdout(LISTING);
        let dir = tempfile::tempdir().expect("tempdir");
        let log_path = dir.path().join("events.jsonl");
        let terminal = Terminal::new(TestBackend::new(80, 20)).expect("terminal");
        let mut dashboard = Dashboard::from_config(
            terminal,
            &AppConfig::default(),
            Arc::new(runner.clone()),
            Arc::new(outputs()),
            Some(JsonlLogger::new(&log_path)),
        );
        dashboard.redraw().expect("redraw");
        assert_eq!(dashboard.job_surface().area().height, 8);

        dashboard.terminal_mut().backend_mut().resize(120, 40);
        dashboard.redraw().expect("redraw");
        assert_eq!(dashboard.job_surface().area().height, 16);
        assert_eq!(dashboard.output_surface().area().y, 17);
        assert_eq!(dashboard.output_surface().area().height, 23);

        let log = std::fs::read_to_string(&log_path).expect("log");
        assert_eq!(log.matches("\"event_type\":\"resize\"").count(), 2);
        assert_eq!(log.matches("\"event_type\":\"poll_failed\"").count(), 0);
    }

    #[test]
    fn run_stops_on_quit_and_closes_the_channel() {
        let runner = FakeProcessRunner::default();
        runner.push_stdout(LISTING);
        runner.push_stdout(LISTING);
        let mut dashboard = dashboard(&runner, &outputs(), 100, 30);
        let (tx, mut rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        tx.blocking_send(DashboardEvent::Key(HotkeyAction::NavigateDown))
            .expect("send");
        tx.blocking_send(DashboardEvent::Key(HotkeyAction::Quit))
            .expect("send");

        dashboard.run(&mut rx).expect("run");
        assert_eq!(dashboard.selection(), SelectionState::Selected(1));
        assert!(tx.blocking_send(DashboardEvent::Resize).is_err());
    }

    #[test]
    fn run_ends_when_every_sender_is_dropped() {
        let runner = FakeProcessRunner::default();
        runner.push_stdout(LISTING);
        let mut dashboard = dashboard(&runner, &outputs(), 100, 30);
        let (tx, mut rx) = mpsc::channel::<DashboardEvent>(EVENT_CHANNEL_CAPACITY);
        drop(tx);
        dashboard.run(&mut rx).expect("run");
        assert_eq!(dashboard.list().len(), 4);
    }
}
