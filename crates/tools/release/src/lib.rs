//! Installer acquisition for projenv.
//!
//! Resolves which installer release to use, finds an installer already on the
//! node's search path or downloads the release archive for the node's
//! platform, and extracts it. Supports:
//! - Pinned versions or latest-release discovery via redirect
//! - `where`/`which` search path probing
//! - zip and tar.gz release archives

pub mod extract;
pub mod locate;
pub mod source;
pub mod version;

pub use extract::extract;
pub use locate::{ArtifactLocator, LocatedInstaller, NodeEnvironment, probe_command};
pub use source::{ArchiveFormat, DEFAULT_RELEASE_URL, INSTALLER_EXECUTABLE, ReleaseSource};
pub use version::{VersionResolver, version_from_location};
