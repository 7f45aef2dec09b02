//! Process execution with captured stdout and streamed stderr.
//!
//! Standard output is buffered in full and returned to the caller. Standard
//! error is relayed line by line to a [`LogSink`] from a separate task, so a
//! child that writes a lot of diagnostics cannot stall while we wait on its
//! stdout. The runner returns only after the child has exited and the relay
//! task has drained its stream.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, BufReader};
use tokio::process::{Child, Command};
use tracing::{debug, info};

use crate::{Error, Result};

/// Destination for a child's diagnostic output.
pub trait LogSink: Send + Sync {
    /// Receive one line, without its terminator.
    fn line(&self, line: &str);
}

/// Sink that re-emits lines as tracing events.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn line(&self, line: &str) {
        info!(target: "projenv::installer", "{line}");
    }
}

/// Sink that keeps every line in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    lines: Mutex<Vec<String>>,
}

impl MemorySink {
    /// Create an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Lines received so far.
    #[must_use]
    pub fn lines(&self) -> Vec<String> {
        self.lines
            .lock()
            .map(|lines| lines.clone())
            .unwrap_or_default()
    }
}

impl LogSink for MemorySink {
    fn line(&self, line: &str) {
        if let Ok(mut lines) = self.lines.lock() {
            lines.push(line.to_string());
        }
    }
}

/// A command to launch.
#[derive(Debug, Clone)]
pub struct Invocation {
    /// Program followed by its arguments.
    pub command: Vec<String>,
    /// Working directory of the child.
    pub working_dir: PathBuf,
    /// Complete environment of the child.
    pub env: HashMap<String, String>,
}

impl Invocation {
    /// Name of the program being launched.
    #[must_use]
    pub fn program(&self) -> &str {
        self.command.first().map_or("", String::as_str)
    }
}

/// Starts child processes on the execution node.
///
/// Implementations must pipe the child's stdout and stderr.
pub trait ProcessLauncher: Send + Sync {
    /// Spawn the invocation.
    fn spawn(&self, invocation: &Invocation) -> std::io::Result<Child>;
}

/// Launches processes on the local machine.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalLauncher;

impl ProcessLauncher for LocalLauncher {
    fn spawn(&self, invocation: &Invocation) -> std::io::Result<Child> {
        let (program, args) = invocation.command.split_first().ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "empty command")
        })?;

        Command::new(program)
            .args(args)
            .current_dir(&invocation.working_dir)
            .env_clear()
            .envs(&invocation.env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
    }
}

/// Exit code and captured stdout of a finished process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessOutput {
    /// Exit code, `-1` when the child was terminated by a signal.
    pub exit_code: i32,
    /// Everything the child wrote to stdout.
    pub stdout: String,
}

impl ProcessOutput {
    /// Whether the child exited with code zero.
    #[must_use]
    pub const fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Runs commands through a launcher, relaying stderr to a sink.
#[derive(Clone)]
pub struct ProcessRunner {
    launcher: Arc<dyn ProcessLauncher>,
    sink: Arc<dyn LogSink>,
}

impl std::fmt::Debug for ProcessRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessRunner").finish_non_exhaustive()
    }
}

impl ProcessRunner {
    /// Create a runner.
    #[must_use]
    pub fn new(launcher: Arc<dyn ProcessLauncher>, sink: Arc<dyn LogSink>) -> Self {
        Self { launcher, sink }
    }

    /// Runner for the local machine logging through tracing.
    #[must_use]
    pub fn local() -> Self {
        Self::new(Arc::new(LocalLauncher), Arc::new(TracingSink))
    }

    /// Run a command to completion.
    ///
    /// A non-zero exit is not an error here; callers decide what it means.
    pub async fn run(
        &self,
        working_dir: &Path,
        env: &HashMap<String, String>,
        command: &[String],
    ) -> Result<ProcessOutput> {
        let invocation = Invocation {
            command: command.to_vec(),
            working_dir: working_dir.to_path_buf(),
            env: env.clone(),
        };
        let program = invocation.program().to_string();
        if program.is_empty() {
            return Err(Error::process_execution("<empty>", "no command given"));
        }

        debug!(cmd = ?command, dir = ?working_dir, "Starting process");
        let start = Instant::now();

        let mut child = self
            .launcher
            .spawn(&invocation)
            .map_err(|e| Error::process_execution(&program, e.to_string()))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| Error::process_execution(&program, "stdout was not captured"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| Error::process_execution(&program, "stderr was not captured"))?;

        let relay = tokio::spawn(relay_lines(stderr, Arc::clone(&self.sink)));

        let mut captured = Vec::new();
        let read = BufReader::new(stdout).read_to_end(&mut captured).await;
        let status = child.wait().await;
        let relayed = relay.await;

        read.map_err(|e| Error::process_execution(&program, format!("reading stdout: {e}")))?;
        let status = status
            .map_err(|e| Error::process_execution(&program, format!("waiting for exit: {e}")))?;
        relayed
            .map_err(|e| Error::process_execution(&program, format!("stderr relay: {e}")))?
            .map_err(|e| Error::process_execution(&program, format!("reading stderr: {e}")))?;

        let exit_code = status.code().unwrap_or(-1);
        let duration_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
        debug!(%program, exit_code, duration_ms, "Process finished");

        Ok(ProcessOutput {
            exit_code,
            stdout: String::from_utf8_lossy(&captured).into_owned(),
        })
    }

    /// Run a command and return its stdout only if it exited successfully.
    pub async fn execute_and_get_stdout(
        &self,
        working_dir: &Path,
        env: &HashMap<String, String>,
        command: &[String],
    ) -> Result<Option<String>> {
        let output = self.run(working_dir, env, command).await?;
        Ok(output.success().then_some(output.stdout))
    }
}

async fn relay_lines<R>(stream: R, sink: Arc<dyn LogSink>) -> std::io::Result<()>
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(stream);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf).await? == 0 {
            return Ok(());
        }
        let line = String::from_utf8_lossy(&buf);
        sink.line(line.trim_end_matches(['\n', '\r']));
    }
}
