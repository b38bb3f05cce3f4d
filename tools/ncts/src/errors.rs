use thiserror::Error;

#[derive(Debug, Error)]
pub enum NctsError {
    #[error("io error: {0}")]
    Io(String),
    #[error("config parse error: {0}")]
    ConfigParse(String),
    #[error("invalid config: {0}")]
    InvalidConfig(String),
    #[error("cli error: {0}")]
    Cli(String),
    #[error("process error: {0}")]
    Process(String),
    #[error("task list unavailable: {0}")]
    SourceUnavailable(String),
    #[error("malformed task line: {0}")]
    MalformedLine(String),
    #[error("task output unavailable: {0}")]
    OutputUnavailable(String),
    #[error("terminal error: {0}")]
    Terminal(String),
}
