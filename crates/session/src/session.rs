//! A scoped provisioning session.
//!
//! A session creates its temporary directory, acquires the installer, runs
//! it, composes the environment and hands that to the host's body. The
//! directory is deleted when the body completes, when any stage fails, or when
//! the session future is dropped.

use projenv_core::{
    ComposeOptions, Error, PlatformInfo, ProcessRunner, Result,
    ToolManifest, compose,
};
use projenv_tools_release::{ArtifactLocator, LocatedInstaller, NodeEnvironment, VersionResolver};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::config::SessionConfig;
use crate::context::{BodyOutcome, ExecutionContext};
use crate::teardown::TempDirectory;

/// `PATH+` name of the directory holding a downloaded installer.
pub const INSTALLER_PATH_NAME: &str = "PROJECT_ENV_CLI";

/// Lifecycle of a session. Transitions are strictly sequential.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SessionState {
    /// The session directory exists.
    Created,
    /// The installer executable is known.
    Acquired,
    /// The installer ran and its manifest was parsed.
    Executed,
    /// The environment has been composed.
    Composed,
    /// The host's body is running.
    BodyRunning,
    /// The session directory has been torn down.
    Terminated,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Created => "CREATED",
            Self::Acquired => "ACQUIRED",
            Self::Executed => "EXECUTED",
            Self::Composed => "COMPOSED",
            Self::BodyRunning => "BODY_RUNNING",
            Self::Terminated => "TERMINATED",
        };
        f.write_str(name)
    }
}

/// One provisioning invocation.
pub struct Session<'a, C: ExecutionContext + ?Sized> {
    context: &'a C,
    config: SessionConfig,
    state: SessionState,
    temp_dir: Option<PathBuf>,
}

impl<'a, C: ExecutionContext + ?Sized> Session<'a, C> {
    /// Create a session for a host context.
    pub fn new(context: &'a C, config: SessionConfig) -> Self {
        Self {
            context,
            config,
            state: SessionState::Created,
            temp_dir: None,
        }
    }

    /// Current lifecycle state.
    #[must_use]
    pub const fn state(&self) -> SessionState {
        self.state
    }

    /// Temporary directory of the last run, if one was created.
    #[must_use]
    pub fn temp_dir(&self) -> Option<&Path> {
        self.temp_dir.as_deref()
    }

    /// Provision the toolchain and run the body with it.
    ///
    /// The body is only invoked if every earlier stage succeeded. The session
    /// directory is removed afterwards in every case.
    pub async fn run(&mut self) -> Result<BodyOutcome> {
        let platform = self.context.platform()?;
        info!(%platform, "Starting projenv session");

        let temp = TempDirectory::create(&self.context.temp_root())?;
        self.temp_dir = Some(temp.path().to_path_buf());
        self.state = SessionState::Created;

        let outcome = self.provision_and_run(&platform, &temp).await;

        temp.teardown();
        self.transition(SessionState::Terminated);

        match &outcome {
            Ok(body) => info!(exit_code = body.exit_code, "Session finished"),
            Err(e) => warn!(stage = e.stage(), error = %e, "Session failed"),
        }
        outcome
    }

    async fn provision_and_run(
        &mut self,
        platform: &PlatformInfo,
        temp: &TempDirectory,
    ) -> Result<BodyOutcome> {
        let runner = ProcessRunner::new(self.context.launcher(), self.context.logger());

        let installer = self.acquire(platform, &runner, temp.path()).await?;
        self.transition(SessionState::Acquired);

        let manifest = self.execute(&runner, installer.executable()).await?;
        self.transition(SessionState::Executed);

        let mut environment = compose(
            &manifest,
            platform,
            ComposeOptions {
                wrap_maven_settings: self.config.features.wrap_maven_settings,
            },
        )?;
        if let LocatedInstaller::Downloaded { directory, .. } = &installer {
            environment.prepend_path(INSTALLER_PATH_NAME, directory.to_string_lossy());
        }
        self.transition(SessionState::Composed);

        self.transition(SessionState::BodyRunning);
        self.context.invoke_body(&environment, platform).await
    }

    async fn acquire(
        &self,
        platform: &PlatformInfo,
        runner: &ProcessRunner,
        temp_dir: &Path,
    ) -> Result<LocatedInstaller> {
        let versions =
            VersionResolver::new(self.config.release.clone(), self.config.cli_version.clone())?;
        let locator = ArtifactLocator::new(
            self.config.release.clone(),
            runner.clone(),
            self.config.features.probe_search_path,
        )?;

        let node = NodeEnvironment {
            working_dir: self.context.working_directory(),
            env: self.context.environment(),
        };
        locator.locate(platform, &versions, node, temp_dir).await
    }

    async fn execute(&self, runner: &ProcessRunner, executable: &Path) -> Result<ToolManifest> {
        let mut command = vec![executable.to_string_lossy().into_owned()];
        command.extend(self.config.installer_args());

        info!(cmd = ?command, "Running installer");
        let output = runner
            .run(
                self.context.working_directory(),
                self.context.environment(),
                &command,
            )
            .await?;

        if !output.success() {
            return Err(Error::InstallerFailed {
                exit_code: output.exit_code,
            });
        }

        let manifest = ToolManifest::parse(&output.stdout)?;
        debug!(tools = manifest.len(), "Installer reported tools");
        Ok(manifest)
    }

    fn transition(&mut self, next: SessionState) {
        info!(from = %self.state, to = %next, "Session state change");
        self.state = next;
    }
}

/// Run one session to completion.
pub async fn run_session<C: ExecutionContext + ?Sized>(
    context: &C,
    config: SessionConfig,
) -> Result<BodyOutcome> {
    Session::new(context, config).run().await
}
