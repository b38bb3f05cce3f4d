use crate::errors::NctsError;
use std::collections::HashMap;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessRequest {
    pub program: String,
    pub args: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

pub trait ProcessRunner: Send + Sync {
    fn run(&self, request: ProcessRequest) -> Result<ProcessOutput, NctsError>;

    /// Feeds stdout to `on_line` one line at a time while the child is still
    /// running, then returns its exit code.
    fn stream_stdout(
        &self,
        request: ProcessRequest,
        on_line: &mut dyn FnMut(String),
    ) -> Result<i32, NctsError> {
        let output = self.run(request)?;
        for line in output.stdout.lines() {
            on_line(line.to_string());
        }
        Ok(output.exit_code)
    }
}

pub trait FileSystem: Send + Sync {
    fn read_to_string(&self, path: &Path) -> Result<String, NctsError>;
    fn read_lines(&self, path: &Path, max_lines: usize) -> Result<Vec<String>, NctsError>;
}

pub trait Terminal: Send + Sync {
    fn stdin_is_tty(&self) -> bool;
    fn draw(&self, frame: &str) -> Result<(), NctsError>;
}

pub struct ProductionFileSystem;

impl FileSystem for ProductionFileSystem {
    fn read_to_string(&self, path: &Path) -> Result<String, NctsError> {
        std::fs::read_to_string(path).map_err(|e| NctsError::Io(e.to_string()))
    }

    fn read_lines(&self, path: &Path, max_lines: usize) -> Result<Vec<String>, NctsError> {
        let file = std::fs::File::open(path).map_err(|e| NctsError::Io(e.to_string()))?;
        let mut reader = BufReader::new(file);
        let mut lines = Vec::new();
        let mut raw = Vec::new();
        while lines.len() < max_lines {
            raw.clear();
            let read = reader
                .read_until(b'\n', &mut raw)
                .map_err(|e| NctsError::Io(e.to_string()))?;
            if read == 0 {
                break;
            }
            let text = String::from_utf8_lossy(&raw);
            lines.push(text.trim_end_matches(['\n', '\r']).to_string());
        }
        Ok(lines)
    }
}

pub struct ProductionProcessRunner;

impl ProcessRunner for ProductionProcessRunner {
    fn run(&self, request: ProcessRequest) -> Result<ProcessOutput, NctsError> {
        let output = Command::new(&request.program)
            .args(&request.args)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| NctsError::Process(format!("{}: {e}", request.program)))?;
        Ok(ProcessOutput {
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }

    fn stream_stdout(
        &self,
        request: ProcessRequest,
        on_line: &mut dyn FnMut(String),
    ) -> Result<i32, NctsError> {
        let mut child = Command::new(&request.program)
            .args(&request.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| NctsError::Process(format!("{}: {e}", request.program)))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| NctsError::Process("child stdout not captured".to_string()))?;

        for line in BufReader::new(stdout).lines() {
            match line {
                Ok(line) => on_line(line),
                Err(error) => {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(NctsError::Process(format!(
                        "{} produced undecodable output: {error}",
                        request.program
                    )));
                }
            }
        }

        let status = child
            .wait()
            .map_err(|e| NctsError::Process(e.to_string()))?;
        Ok(status.code().unwrap_or(-1))
    }
}

pub struct ProductionTerminal;

impl Terminal for ProductionTerminal {
    fn stdin_is_tty(&self) -> bool {
        std::io::IsTerminal::is_terminal(&std::io::stdin())
    }

    fn draw(&self, frame: &str) -> Result<(), NctsError> {
        use std::io::Write;
        let mut out = std::io::stdout();
        out.write_all(frame.as_bytes())
            .and_then(|_| out.flush())
            .map_err(|e| NctsError::Io(e.to_string()))
    }
}

pub struct ProductionRuntime {
    pub file_system: Arc<dyn FileSystem>,
    pub process_runner: Arc<dyn ProcessRunner>,
    pub terminal: Arc<dyn Terminal>,
}

impl ProductionRuntime {
    pub fn new() -> Self {
        Self {
            file_system: Arc::new(ProductionFileSystem),
            process_runner: Arc::new(ProductionProcessRunner),
            terminal: Arc::new(ProductionTerminal),
        }
    }
}

impl Default for ProductionRuntime {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Default, Clone)]
pub struct FakeFileSystem {
    files: Arc<Mutex<HashMap<PathBuf, String>>>,
}

impl FakeFileSystem {
    pub fn with_file(path: impl Into<PathBuf>, contents: impl Into<String>) -> Self {
        let fs = Self::default();
        fs.insert(path, contents);
        fs
    }

    pub fn insert(&self, path: impl Into<PathBuf>, contents: impl Into<String>) {
        self.files
            .lock()
            .expect("files lock")
            .insert(path.into(), contents.into());
    }

    pub fn remove(&self, path: &Path) {
        self.files.lock().expect("files lock").remove(path);
    }
}

impl FileSystem for FakeFileSystem {
    fn read_to_string(&self, path: &Path) -> Result<String, NctsError> {
        self.files
            .lock()
            .expect("files lock")
            .get(path)
            .cloned()
            .ok_or_else(|| NctsError::Io(format!("missing file {}", path.display())))
    }

    fn read_lines(&self, path: &Path, max_lines: usize) -> Result<Vec<String>, NctsError> {
        let contents = self.read_to_string(path)?;
        Ok(contents
            .lines()
            .take(max_lines)
            .map(str::to_string)
            .collect())
    }
}

#[derive(Default, Clone)]
pub struct FakeTerminal {
    pub is_tty: bool,
    draws: Arc<Mutex<Vec<String>>>,
}

impl FakeTerminal {
    pub fn new(is_tty: bool) -> Self {
        Self {
            is_tty,
            ..Self::default()
        }
    }

    pub fn drawn_frames(&self) -> Vec<String> {
        self.draws.lock().expect("draw lock").clone()
    }
}

impl Terminal for FakeTerminal {
    fn stdin_is_tty(&self) -> bool {
        self.is_tty
    }

    fn draw(&self, frame: &str) -> Result<(), NctsError> {
        self.draws
            .lock()
            .expect("draw lock")
            .push(frame.to_string());
        Ok(())
    }
}

/// Replays queued responses in order; an empty queue behaves like a missing binary.
#[derive(Default, Clone)]
pub struct FakeProcessRunner {
    responses: Arc<Mutex<Vec<Result<ProcessOutput, NctsError>>>>,
    requests: Arc<Mutex<Vec<ProcessRequest>>>,
}

impl FakeProcessRunner {
    pub fn push_response(&self, output: Result<ProcessOutput, NctsError>) {
        self.responses.lock().expect("responses lock").push(output);
    }

    pub fn push_stdout(&self, stdout: &str) {
        self.push_response(Ok(ProcessOutput {
            exit_code: 0,
            stdout: stdout.to_string(),
            stderr: String::new(),
        }));
    }

    pub fn requests(&self) -> Vec<ProcessRequest> {
        self.requests.lock().expect("requests lock").clone()
    }
}

impl ProcessRunner for FakeProcessRunner {
    fn run(&self, request: ProcessRequest) -> Result<ProcessOutput, NctsError> {
        let program = request.program.clone();
        self.requests.lock().expect("requests lock").push(request);
        let mut responses = self.responses.lock().expect("responses lock");
        if responses.is_empty() {
            return Err(NctsError::Process(format!(
                "{program}: no fake response queued"
            )));
        }
        responses.remove(0)
    }
}
