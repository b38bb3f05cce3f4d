use std::cmp::Ordering;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Queued,
    Running,
    FinishedOk,
    FinishedError,
}

impl JobState {
    /// Collapses the spooler's state label and exit level into one state.
    /// An exit level that is not an integer counts as a failure.
    pub fn classify(label: &str, exit_level: Option<&str>) -> Self {
        match label {
            "running" => Self::Running,
            "queued" => Self::Queued,
            _ => match exit_level.and_then(|level| level.trim().parse::<i64>().ok()) {
                Some(0) => Self::FinishedOk,
                _ => Self::FinishedError,
            },
        }
    }

    /// Sort precedence: running jobs first, then queued, then everything else.
    pub fn precedence(self) -> u8 {
        match self {
            Self::Running => 1,
            Self::Queued => 2,
            Self::FinishedOk | Self::FinishedError => 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobRecord {
    pub id: String,
    pub state: JobState,
    pub state_label: String,
    pub output: PathBuf,
    pub exit_level: Option<String>,
    pub elapsed: Option<String>,
    pub command: String,
    pub line: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    #[default]
    Id,
    State,
    Output,
    ExitLevel,
    Elapsed,
    Command,
}

impl SortKey {
    /// Unknown keys fall back to `Id`.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "state" => Self::State,
            "output" => Self::Output,
            "exit_level" | "elevel" => Self::ExitLevel,
            "elapsed" | "times" => Self::Elapsed,
            "command" => Self::Command,
            _ => Self::Id,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::State => "state",
            Self::Output => "output",
            Self::ExitLevel => "exit_level",
            Self::Elapsed => "elapsed",
            Self::Command => "command",
        }
    }

    pub fn compare(self, a: &JobRecord, b: &JobRecord) -> Ordering {
        match self {
            Self::Id => compare_ids(&a.id, &b.id),
            Self::State => a.state.precedence().cmp(&b.state.precedence()),
            Self::Output => a.output.as_os_str().cmp(b.output.as_os_str()),
            Self::ExitLevel => a.exit_level.cmp(&b.exit_level),
            Self::Elapsed => a.elapsed.cmp(&b.elapsed),
            Self::Command => a.command.cmp(&b.command),
        }
    }
}

/// Numeric ids compare by value and sort ahead of non-numeric ones.
fn compare_ids(a: &str, b: &str) -> Ordering {
    match (a.parse::<u64>(), b.parse::<u64>()) {
        (Ok(a), Ok(b)) => a.cmp(&b),
        (Ok(_), Err(_)) => Ordering::Less,
        (Err(_), Ok(_)) => Ordering::Greater,
        (Err(_), Err(_)) => a.cmp(b),
    }
}
