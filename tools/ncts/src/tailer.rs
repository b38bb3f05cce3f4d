use crate::errors::NctsError;
use crate::runtime::FileSystem;
use crate::surface::Pad;
use crate::task_list::JobList;
use crate::types::JobRecord;
use ratatui::style::Style;
use std::sync::Arc;

/// Re-reads a job's output file from the top on every redraw.
pub struct OutputTailer {
    fs: Arc<dyn FileSystem>,
}

impl OutputTailer {
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self { fs }
    }

    /// The selected job, or the first listed one when nothing is selected.
    pub fn target(list: &JobList, selected_row: Option<usize>) -> Option<&JobRecord> {
        selected_row
            .and_then(|row| list.at_row(row))
            .or_else(|| list.jobs().first())
    }

    /// Clears `pad`, then fills it with the job's output, one line per row.
    /// A missing or unreadable file leaves the pad empty and reports
    /// `OutputUnavailable`, which callers are expected to swallow.
    pub fn render(&self, job: Option<&JobRecord>, pad: &mut Pad) -> Result<usize, NctsError> {
        pad.clear();
        let Some(job) = job else {
            return Ok(0);
        };
        let lines = self
            .fs
            .read_lines(&job.output, usize::from(pad.height()))
            .map_err(|e| NctsError::OutputUnavailable(format!("{}: {e}", job.output.display())))?;
        for (row, line) in lines.iter().enumerate() {
            let Ok(row) = u16::try_from(row) else {
                break;
            };
            pad.put(row, line, Style::default());
        }
        Ok(lines.len())
    }
}
