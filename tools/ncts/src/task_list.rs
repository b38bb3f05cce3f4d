use crate::errors::NctsError;
use crate::runtime::{ProcessRequest, ProcessRunner};
use crate::types::{JobRecord, JobState, SortKey};
use std::path::PathBuf;
use std::sync::Arc;

/// One poll's worth of jobs, in display order, plus the spooler's column captions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobList {
    header: String,
    jobs: Vec<JobRecord>,
}

impl JobList {
    pub fn new(header: impl Into<String>) -> Self {
        Self {
            header: header.into(),
            jobs: Vec::new(),
        }
    }

    /// A repeated id replaces the earlier record without moving it.
    pub fn insert(&mut self, record: JobRecord) {
        match self.jobs.iter_mut().find(|job| job.id == record.id) {
            Some(existing) => *existing = record,
            None => self.jobs.push(record),
        }
    }

    pub fn header(&self) -> &str {
        &self.header
    }

    pub fn jobs(&self) -> &[JobRecord] {
        &self.jobs
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Looks up a 1-based display row.
    pub fn at_row(&self, row: usize) -> Option<&JobRecord> {
        row.checked_sub(1).and_then(|index| self.jobs.get(index))
    }

    /// Stable in both directions: `reverse` flips the comparison, so ties keep
    /// their current relative order.
    pub fn order(&mut self, key: SortKey, reverse: bool) {
        self.jobs.sort_by(|a, b| {
            let ordering = key.compare(a, b);
            if reverse {
                ordering.reverse()
            } else {
                ordering
            }
        });
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PollOutcome {
    pub list: JobList,
    pub malformed: Vec<String>,
}

/// The queue tool as seen by the dashboard: a text listing in, removals out.
pub trait QueueBackend: Send + Sync {
    fn poll(&self) -> Result<PollOutcome, NctsError>;
    fn remove(&self, id: Option<&str>) -> Result<(), NctsError>;
}

pub fn parse_line(line: &str) -> Result<JobRecord, NctsError> {
    let fields = split_fields(line, 4);
    if fields.len() < 4 {
        return Err(NctsError::MalformedLine(line.trim_end().to_string()));
    }
    let (id, label, output, rest) = (fields[0], fields[1], fields[2], fields[3]);

    let (exit_level, elapsed, command) = if matches!(label, "running" | "queued") {
        (None, None, rest.to_string())
    } else {
        let rest_fields = split_fields(rest, 3);
        if rest_fields.len() < 3 {
            return Err(NctsError::MalformedLine(line.trim_end().to_string()));
        }
        (
            Some(rest_fields[0].to_string()),
            Some(rest_fields[1].to_string()),
            rest_fields[2].to_string(),
        )
    };

    Ok(JobRecord {
        id: id.to_string(),
        state: JobState::classify(label, exit_level.as_deref()),
        state_label: label.to_string(),
        output: PathBuf::from(output),
        exit_level,
        elapsed,
        command,
        line: line.trim_end().to_string(),
    })
}

/// Whitespace split into at most `max_fields` fields; the last one keeps its
/// inner spacing.
fn split_fields(text: &str, max_fields: usize) -> Vec<&str> {
    let mut fields = Vec::with_capacity(max_fields);
    let mut rest = text.trim_start();
    while !rest.is_empty() {
        if fields.len() + 1 == max_fields {
            fields.push(rest.trim_end());
            break;
        }
        let end = rest.find(char::is_whitespace).unwrap_or(rest.len());
        fields.push(&rest[..end]);
        rest = rest[end..].trim_start();
    }
    fields
}

/// Accumulates a listing one line at a time. The first line is the header;
/// unparseable rows are collected instead of aborting the listing.
#[derive(Debug, Default)]
pub struct ListingBuilder {
    outcome: PollOutcome,
    saw_header: bool,
}

impl ListingBuilder {
    pub fn push_line(&mut self, line: String) {
        if !self.saw_header {
            self.saw_header = true;
            self.outcome.list = JobList::new(line.trim_end());
            return;
        }
        if line.trim().is_empty() {
            return;
        }
        match parse_line(&line) {
            Ok(record) => self.outcome.list.insert(record),
            Err(_) => self.outcome.malformed.push(line),
        }
    }

    pub fn saw_header(&self) -> bool {
        self.saw_header
    }

    pub fn finish(self) -> PollOutcome {
        self.outcome
    }
}

pub fn parse_listing<I>(lines: I) -> PollOutcome
where
    I: IntoIterator<Item = String>,
{
    let mut builder = ListingBuilder::default();
    lines.into_iter().for_each(|line| builder.push_line(line));
    builder.finish()
}

/// Task Spooler driven through its CLI (`tsp`, or `ts` on some systems).
pub struct TaskSpooler {
    runner: Arc<dyn ProcessRunner>,
    program: String,
    remove_flag: String,
}

impl TaskSpooler {
    pub fn new(
        runner: Arc<dyn ProcessRunner>,
        program: impl Into<String>,
        remove_flag: impl Into<String>,
    ) -> Self {
        Self {
            runner,
            program: program.into(),
            remove_flag: remove_flag.into(),
        }
    }
}

impl QueueBackend for TaskSpooler {
    /// Rows are parsed as they stream in, into a list the caller only swaps
    /// in once the whole listing has arrived.
    fn poll(&self) -> Result<PollOutcome, NctsError> {
        let mut builder = ListingBuilder::default();
        let exit_code = self
            .runner
            .stream_stdout(
                ProcessRequest {
                    program: self.program.clone(),
                    args: Vec::new(),
                },
                &mut |line| builder.push_line(line),
            )
            .map_err(|e| NctsError::SourceUnavailable(e.to_string()))?;
        if exit_code != 0 && !builder.saw_header() {
            return Err(NctsError::SourceUnavailable(format!(
                "{} exited with {exit_code} and printed no listing",
                self.program
            )));
        }
        Ok(builder.finish())
    }

    fn remove(&self, id: Option<&str>) -> Result<(), NctsError> {
        let mut args = vec![self.remove_flag.clone()];
        if let Some(id) = id {
            args.push(id.to_string());
        }
        let output = self.runner.run(ProcessRequest {
            program: self.program.clone(),
            args,
        })?;
        if output.exit_code != 0 {
            return Err(NctsError::Process(format!(
                "{} {} exited with {}: {}",
                self.program,
                self.remove_flag,
                output.exit_code,
                output.stderr.trim()
            )));
        }
        Ok(())
    }
}

/// Holds the last good listing and re-polls it on demand.
pub struct TaskListSource {
    backend: Box<dyn QueueBackend>,
    list: JobList,
    sort_key: SortKey,
    reverse: bool,
}

impl TaskListSource {
    pub fn new(backend: Box<dyn QueueBackend>, sort_key: SortKey, reverse: bool) -> Self {
        Self {
            backend,
            list: JobList::default(),
            sort_key,
            reverse,
        }
    }

    pub fn list(&self) -> &JobList {
        &self.list
    }

    pub fn sort_key(&self) -> SortKey {
        self.sort_key
    }

    /// Replaces the list only once the new one is fully parsed and ordered.
    /// On failure the previous list stays in place. Returns the skipped rows.
    pub fn refresh(&mut self) -> Result<Vec<String>, NctsError> {
        let PollOutcome {
            mut list,
            malformed,
        } = self.backend.poll()?;
        list.order(SortKey::Id, true);
        list.order(self.sort_key, self.reverse);
        self.list = list;
        Ok(malformed)
    }

    pub fn order(&mut self, key: SortKey, reverse: bool) {
        self.sort_key = key;
        self.reverse = reverse;
        self.list.order(key, reverse);
    }

    /// Fire-and-forget: the next poll shows whether the removal took effect.
    pub fn remove_job(&self, id: Option<&str>) -> Result<(), NctsError> {
        self.backend.remove(id)
    }
}
