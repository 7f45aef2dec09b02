//! The local machine as an execution context.

use crate::cli::EnvFormat;
use async_trait::async_trait;
use projenv_core::wrapper::shell_quote;
use projenv_core::{
    EnvironmentMutation, Error, LocalLauncher, LogSink, PlatformInfo, ProcessLauncher, Result,
};
use projenv_session::{BodyOutcome, ExecutionContext};
use std::collections::HashMap;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitStatus;
use std::sync::Arc;
use tracing::{debug, info};

/// What runs once the toolchain is provisioned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Body {
    /// Run a command with the merged environment and inherited stdio.
    Exec(Vec<String>),
    /// Print the composed environment to stdout.
    Print(EnvFormat),
}

/// Installer diagnostics, copied to stderr line by line.
#[derive(Debug, Default, Clone, Copy)]
pub struct StderrSink;

impl LogSink for StderrSink {
    fn line(&self, line: &str) {
        let _ = writeln!(io::stderr().lock(), "{line}");
    }
}

/// Execution context for a session on this machine.
pub struct LocalContext {
    workspace: PathBuf,
    env: HashMap<String, String>,
    body: Body,
    sink: Arc<dyn LogSink>,
}

impl std::fmt::Debug for LocalContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalContext")
            .field("workspace", &self.workspace)
            .field("body", &self.body)
            .finish_non_exhaustive()
    }
}

impl LocalContext {
    /// Create a context for an explicit workspace and environment.
    #[must_use]
    pub fn new(workspace: PathBuf, env: HashMap<String, String>, body: Body) -> Self {
        Self {
            workspace,
            env,
            body,
            sink: Arc::new(StderrSink),
        }
    }

    /// Context for this process: its environment and either `workspace` or
    /// the current directory.
    pub fn from_process(workspace: Option<PathBuf>, body: Body) -> Result<Self> {
        let workspace = match workspace {
            Some(dir) => dir,
            None => std::env::current_dir()
                .map_err(|e| Error::context(format!("cannot determine current directory: {e}")))?,
        };
        if !workspace.is_dir() {
            return Err(Error::context(format!(
                "workspace {} is not a directory",
                workspace.display()
            )));
        }

        // Variables that are not valid UTF-8 cannot be forwarded.
        let env = std::env::vars_os()
            .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
            .collect();
        Ok(Self::new(workspace, env, body))
    }

    /// Send installer diagnostics somewhere other than stderr.
    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn LogSink>) -> Self {
        self.sink = sink;
        self
    }

    async fn run_command(
        &self,
        command: &[String],
        env: &HashMap<String, String>,
    ) -> Result<BodyOutcome> {
        let (program, args) = command
            .split_first()
            .ok_or_else(|| Error::context("no command given"))?;

        info!(cmd = ?command, "Running command with provisioned toolchain");
        let status = tokio::process::Command::new(program)
            .args(args)
            .current_dir(&self.workspace)
            .env_clear()
            .envs(env)
            .kill_on_drop(true)
            .status()
            .await
            .map_err(|e| Error::process_execution(program, e.to_string()))?;

        let exit_code = exit_code(status);
        debug!(%program, exit_code, "Command finished");
        Ok(BodyOutcome { exit_code })
    }
}

#[async_trait]
impl ExecutionContext for LocalContext {
    fn working_directory(&self) -> &Path {
        &self.workspace
    }

    fn environment(&self) -> &HashMap<String, String> {
        &self.env
    }

    fn launcher(&self) -> Arc<dyn ProcessLauncher> {
        Arc::new(LocalLauncher)
    }

    fn logger(&self) -> Arc<dyn LogSink> {
        Arc::clone(&self.sink)
    }

    async fn invoke_body(
        &self,
        environment: &EnvironmentMutation,
        platform: &PlatformInfo,
    ) -> Result<BodyOutcome> {
        match &self.body {
            Body::Exec(command) => {
                let env = environment.apply_to(&self.env, platform);
                self.run_command(command, &env).await
            }
            Body::Print(format) => {
                let rendered = render_environment(environment, &self.env, platform, *format)?;
                io::stdout()
                    .lock()
                    .write_all(rendered.as_bytes())
                    .map_err(|e| Error::io(e, None, "write environment"))?;
                Ok(BodyOutcome::SUCCESS)
            }
        }
    }
}

/// Render a composed environment for `projenv env`.
///
/// The shell format exports plain variables in composition order followed by
/// the merged `PATH`. The JSON format is the raw mutation.
pub fn render_environment(
    environment: &EnvironmentMutation,
    base: &HashMap<String, String>,
    platform: &PlatformInfo,
    format: EnvFormat,
) -> Result<String> {
    match format {
        EnvFormat::Json => {
            let object: serde_json::Map<String, serde_json::Value> = environment
                .iter()
                .map(|(k, v)| (k.to_string(), serde_json::Value::from(v)))
                .collect();
            let mut json = serde_json::to_string_pretty(&object)
                .map_err(|e| Error::context(format!("cannot serialize environment: {e}")))?;
            json.push('\n');
            Ok(json)
        }
        EnvFormat::Shell => {
            let mut out = String::new();
            for (key, value) in environment.variables() {
                out.push_str(&format!("export {key}={}\n", shell_quote(value)));
            }
            if environment.path_entries().next().is_some() {
                let merged = environment.apply_to(base, platform);
                if let Some((key, path)) = merged
                    .iter()
                    .find(|(k, _)| k.eq_ignore_ascii_case("PATH"))
                {
                    out.push_str(&format!("export {key}={}\n", shell_quote(path)));
                }
            }
            Ok(out)
        }
    }
}

#[cfg(unix)]
fn exit_code(status: ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;
    status
        .code()
        .or_else(|| status.signal().map(|signal| 128 + signal))
        .unwrap_or(1)
}

#[cfg(not(unix))]
fn exit_code(status: ExitStatus) -> i32 {
    status.code().unwrap_or(1)
}
