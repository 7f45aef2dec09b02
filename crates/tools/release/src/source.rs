//! Where installer releases are published.

use projenv_core::{Os, PlatformInfo};
use serde::{Deserialize, Serialize};

/// Base name of the installer executable.
pub const INSTALLER_EXECUTABLE: &str = "project-env-cli";

/// Default release repository of the installer.
pub const DEFAULT_RELEASE_URL: &str = "https://github.com/Project-Env/project-env-cli";

/// Archive format a release is shipped in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    /// `.zip`, published for Windows
    Zip,
    /// `.tar.gz`, published for macOS and Linux
    TarGz,
}

impl ArchiveFormat {
    /// Format published for an operating system.
    #[must_use]
    pub const fn for_os(os: Os) -> Self {
        match os {
            Os::Windows => Self::Zip,
            Os::Macos | Os::Linux => Self::TarGz,
        }
    }

    /// File extension without the leading dot.
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Zip => "zip",
            Self::TarGz => "tar.gz",
        }
    }
}

/// A repository publishing installer releases.
///
/// Releases follow the layout
/// `<base>/releases/download/v{VERSION}/cli-{VERSION}-{OS}-{ARCH}.{EXT}` and
/// `<base>/releases/latest` redirects to the newest release tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReleaseSource {
    /// Repository URL without trailing slash.
    pub base_url: String,
}

impl Default for ReleaseSource {
    fn default() -> Self {
        Self::new(DEFAULT_RELEASE_URL)
    }
}

impl ReleaseSource {
    /// Create a source for a repository URL.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// URL that redirects to the latest release.
    #[must_use]
    pub fn latest_url(&self) -> String {
        format!("{}/releases/latest", self.base_url)
    }

    /// Archive name for a version and platform.
    #[must_use]
    pub fn archive_name(&self, version: &str, platform: &PlatformInfo) -> String {
        format!(
            "cli-{version}-{}-{}.{}",
            platform.os.token(),
            platform.arch.token(),
            ArchiveFormat::for_os(platform.os).extension()
        )
    }

    /// Download URL of the archive for a version and platform.
    #[must_use]
    pub fn download_url(&self, version: &str, platform: &PlatformInfo) -> String {
        format!(
            "{}/releases/download/v{version}/{}",
            self.base_url,
            self.archive_name(version, platform)
        )
    }
}
