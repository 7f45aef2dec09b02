//! Locating the installer executable.
//!
//! An installer already on the node's search path is used as is. Otherwise
//! the release archive for the node's platform is downloaded into the
//! session directory and extracted there.

use projenv_core::{Error, PlatformInfo, ProcessRunner, Result};
use reqwest::Client;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use crate::extract;
use crate::source::{INSTALLER_EXECUTABLE, ReleaseSource};
use crate::version::VersionResolver;

/// Where the installer executable came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocatedInstaller {
    /// Found on the node's search path.
    SearchPath(PathBuf),
    /// Downloaded and extracted into the session directory.
    Downloaded {
        /// The extracted executable.
        executable: PathBuf,
        /// Directory the archive was extracted into.
        directory: PathBuf,
        /// Version that was downloaded.
        version: String,
    },
}

impl LocatedInstaller {
    /// Path of the installer executable.
    #[must_use]
    pub fn executable(&self) -> &Path {
        match self {
            Self::SearchPath(path) => path,
            Self::Downloaded { executable, .. } => executable,
        }
    }
}

/// The node-side environment used for probing the search path.
#[derive(Debug, Clone, Copy)]
pub struct NodeEnvironment<'a> {
    /// Working directory for probe commands.
    pub working_dir: &'a Path,
    /// Environment of probe commands, including `PATH`.
    pub env: &'a HashMap<String, String>,
}

/// Finds or downloads the installer.
#[derive(Debug)]
pub struct ArtifactLocator {
    client: Client,
    source: ReleaseSource,
    runner: ProcessRunner,
    probe_search_path: bool,
}

impl ArtifactLocator {
    /// Create a locator.
    pub fn new(
        source: ReleaseSource,
        runner: ProcessRunner,
        probe_search_path: bool,
    ) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("projenv/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::network(&source.base_url, e.to_string()))?;

        Ok(Self {
            client,
            source,
            runner,
            probe_search_path,
        })
    }

    /// Find the installer on the search path, or download it into `temp_dir`.
    pub async fn locate(
        &self,
        platform: &PlatformInfo,
        versions: &VersionResolver,
        node: NodeEnvironment<'_>,
        temp_dir: &Path,
    ) -> Result<LocatedInstaller> {
        if self.probe_search_path
            && let Some(path) = self.probe(platform, node).await
        {
            if let Some(pinned) = versions.pinned() {
                warn!(
                    %pinned,
                    ?path,
                    "Using installer from search path; pinned version is not verified"
                );
            }
            info!(?path, "Using installer from search path");
            return Ok(LocatedInstaller::SearchPath(path));
        }

        let version = versions.resolve_version().await?;
        let archive = self.download(&version, platform, temp_dir).await?;

        let target = temp_dir.to_path_buf();
        let source = archive.clone();
        tokio::task::spawn_blocking(move || extract::extract(&source, &target))
            .await
            .map_err(|e| Error::extraction(&archive, e.to_string()))??;

        let executable = temp_dir.join(platform.executable_name(INSTALLER_EXECUTABLE));
        if !executable.is_file() {
            return Err(Error::artifact_not_found(executable));
        }
        ensure_executable(&executable)?;

        info!(%version, ?executable, "Installer downloaded");
        Ok(LocatedInstaller::Downloaded {
            executable,
            directory: temp_dir.to_path_buf(),
            version,
        })
    }

    /// Look the installer up with `where` or `which`.
    ///
    /// Any failure counts as "not found".
    pub async fn probe(&self, platform: &PlatformInfo, node: NodeEnvironment<'_>) -> Option<PathBuf> {
        let command = probe_command(platform);
        match self
            .runner
            .execute_and_get_stdout(node.working_dir, node.env, &command)
            .await
        {
            Ok(Some(stdout)) => {
                let found = stdout.lines().map(str::trim).find(|l| !l.is_empty());
                found.map(PathBuf::from)
            }
            Ok(None) => {
                debug!("Installer not found on search path");
                None
            }
            Err(e) => {
                debug!(error = %e, "Search path probe could not run");
                None
            }
        }
    }

    async fn download(
        &self,
        version: &str,
        platform: &PlatformInfo,
        temp_dir: &Path,
    ) -> Result<PathBuf> {
        let url = self.source.download_url(version, platform);
        let archive = temp_dir.join(self.source.archive_name(version, platform));
        info!(%url, ?archive, "Downloading installer");

        let mut response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::network(&url, e.to_string()))?;

        if !response.status().is_success() {
            return Err(Error::network(
                &url,
                format!("HTTP {}", response.status()),
            ));
        }

        let mut file = tokio::fs::File::create(&archive)
            .await
            .map_err(|e| Error::io(e, Some(archive.clone()), "create archive file"))?;

        let mut bytes = 0usize;
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| Error::network(&url, e.to_string()))?
        {
            bytes += chunk.len();
            file.write_all(&chunk)
                .await
                .map_err(|e| Error::io(e, Some(archive.clone()), "write archive file"))?;
        }
        file.flush()
            .await
            .map_err(|e| Error::io(e, Some(archive.clone()), "write archive file"))?;

        debug!(bytes, "Download complete");
        Ok(archive)
    }
}

/// Command used to look the installer up on the search path.
#[must_use]
pub fn probe_command(platform: &PlatformInfo) -> Vec<String> {
    if platform.os.is_windows() {
        vec!["where".to_string(), INSTALLER_EXECUTABLE.to_string()]
    } else {
        vec![
            "sh".to_string(),
            "-c".to_string(),
            format!("which {INSTALLER_EXECUTABLE}"),
        ]
    }
}

#[cfg(unix)]
fn ensure_executable(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let meta = std::fs::metadata(path)
        .map_err(|e| Error::io(e, Some(path.to_path_buf()), "read installer metadata"))?;
    let mut perms = meta.permissions();
    if perms.mode() & 0o111 != 0o111 {
        perms.set_mode(perms.mode() | 0o755);
        std::fs::set_permissions(path, perms)
            .map_err(|e| Error::io(e, Some(path.to_path_buf()), "mark installer executable"))?;
    }
    Ok(())
}

#[cfg(not(unix))]
fn ensure_executable(_path: &Path) -> Result<()> {
    Ok(())
}
