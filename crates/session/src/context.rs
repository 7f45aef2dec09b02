//! Capabilities a host supplies to a session.

use async_trait::async_trait;
use projenv_core::{EnvironmentMutation, LogSink, PlatformInfo, ProcessLauncher, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Result of running the provisioned body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BodyOutcome {
    /// Exit code of the body, `0` on success.
    pub exit_code: i32,
}

impl BodyOutcome {
    /// A successful body.
    pub const SUCCESS: Self = Self { exit_code: 0 };

    /// Whether the body succeeded.
    #[must_use]
    pub const fn success(self) -> bool {
        self.exit_code == 0
    }
}

/// The host side of a session: where to work, how to launch processes, where
/// to log, and how to run the body with the composed environment.
#[async_trait]
pub trait ExecutionContext: Send + Sync {
    /// Workspace the installer and the body run in.
    fn working_directory(&self) -> &Path;

    /// Environment inherited by the installer and the body.
    fn environment(&self) -> &HashMap<String, String>;

    /// Launcher for processes on the execution node.
    fn launcher(&self) -> Arc<dyn ProcessLauncher>;

    /// Sink for the installer's diagnostic output.
    fn logger(&self) -> Arc<dyn LogSink>;

    /// Directory under which the session directory is created.
    ///
    /// Defaults to a `<workspace>@tmp` sibling of the working directory.
    fn temp_root(&self) -> PathBuf {
        default_temp_root(self.working_directory())
    }

    /// Platform of the execution node.
    fn platform(&self) -> Result<PlatformInfo> {
        PlatformInfo::resolve()
    }

    /// Run the body with `environment` merged over the inherited one.
    ///
    /// Returns once the body has completed.
    async fn invoke_body(
        &self,
        environment: &EnvironmentMutation,
        platform: &PlatformInfo,
    ) -> Result<BodyOutcome>;
}

/// `<workspace>@tmp` next to the workspace.
#[must_use]
pub fn default_temp_root(workspace: &Path) -> PathBuf {
    match (workspace.parent(), workspace.file_name()) {
        (Some(parent), Some(name)) => {
            let mut sibling = name.to_os_string();
            sibling.push("@tmp");
            parent.join(sibling)
        }
        _ => workspace.join(".projenv-tmp"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_temp_root() {
        assert_eq!(
            default_temp_root(Path::new("/builds/job/workspace")),
            PathBuf::from("/builds/job/workspace@tmp")
        );
    }

    #[test]
    fn test_default_temp_root_at_filesystem_root() {
        assert_eq!(
            default_temp_root(Path::new("/")),
            PathBuf::from("/.projenv-tmp")
        );
    }

    #[test]
    fn test_body_outcome() {
        assert!(BodyOutcome::SUCCESS.success());
        assert!(!BodyOutcome { exit_code: 1 }.success());
    }
}
