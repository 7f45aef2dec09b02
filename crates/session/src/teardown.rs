//! The session's temporary directory and its one-shot teardown.

use projenv_core::{Error, Result};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, warn};
use uuid::Uuid;

/// Prefix of session directory names.
pub const TEMP_DIR_PREFIX: &str = "withProjectEnv";

/// A session directory that is deleted exactly once.
///
/// Deletion happens on the first call to [`TempDirectory::teardown`], or on
/// drop if the session is abandoned before that.
#[derive(Debug)]
pub struct TempDirectory {
    path: PathBuf,
    fired: AtomicBool,
}

impl TempDirectory {
    /// Create a uniquely named directory under `root`.
    pub fn create(root: &Path) -> Result<Self> {
        let path = root.join(unique_name());
        std::fs::create_dir_all(&path).map_err(|e| {
            Error::io(e, Some(path.clone()), "create temporary directory")
        })?;
        debug!(?path, "Created session directory");

        Ok(Self {
            path,
            fired: AtomicBool::new(false),
        })
    }

    /// Location of the directory.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether teardown has already run.
    #[must_use]
    pub fn is_torn_down(&self) -> bool {
        self.fired.load(Ordering::SeqCst)
    }

    /// Delete the directory recursively.
    ///
    /// Only the first call does anything; it returns `true`. Failures are
    /// logged, never returned, so they cannot replace the body's outcome.
    pub fn teardown(&self) -> bool {
        if self.fired.swap(true, Ordering::SeqCst) {
            return false;
        }

        match std::fs::remove_dir_all(&self.path) {
            Ok(()) => debug!(path = ?self.path, "Removed session directory"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = ?self.path, "Session directory already gone");
            }
            Err(e) => {
                warn!(path = ?self.path, error = %e, "Failed to remove session directory");
            }
        }
        true
    }
}

impl Drop for TempDirectory {
    fn drop(&mut self) {
        self.teardown();
    }
}

fn unique_name() -> String {
    let digest = Sha256::digest(Uuid::new_v4().to_string().as_bytes());
    let hex = format!("{digest:x}");
    format!("{TEMP_DIR_PREFIX}{}", &hex[..8])
}
