//! Error types for projenv provisioning.
//!
//! Every stage of a session fails with one of these variants. None of them is
//! retried: the session surfaces the error, tears down its temporary state and
//! reports the failed stage to the host.

use miette::Diagnostic;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Main error type for projenv operations
#[derive(Error, Debug, Diagnostic)]
pub enum Error {
    /// The execution node runs an operating system or CPU we cannot classify
    #[error("Unsupported platform: {detail}")]
    #[diagnostic(
        code(projenv::platform::unsupported),
        help("Supported platforms are Windows, macOS and Linux on amd64 or aarch64")
    )]
    UnsupportedPlatform {
        /// What could not be classified (e.g. `os freebsd`)
        detail: String,
    },

    /// Transport-level HTTP failure
    #[error("Network error while requesting {url}: {message}")]
    #[diagnostic(code(projenv::network))]
    Network {
        /// The URL being requested
        url: String,
        /// Error message from the HTTP client
        message: String,
    },

    /// The latest-release lookup did not yield a usable version
    #[error("Failed to resolve installer version: {message}")]
    #[diagnostic(code(projenv::version::resolution))]
    VersionResolution {
        /// What was wrong with the lookup response
        message: String,
    },

    /// The installer executable was missing after extraction
    #[error("Installer executable not found at {}", path.display())]
    #[diagnostic(code(projenv::artifact::not_found))]
    ArtifactNotFound {
        /// Where the executable was expected
        path: Box<Path>,
    },

    /// The downloaded archive could not be unpacked
    #[error("Failed to extract {}: {message}", archive.display())]
    #[diagnostic(code(projenv::extract::failed))]
    Extraction {
        /// The archive being extracted
        archive: Box<Path>,
        /// Error message
        message: String,
    },

    /// A process could not be started or awaited
    #[error("Failed to execute {program}: {message}")]
    #[diagnostic(code(projenv::process::execution))]
    ProcessExecution {
        /// The program that failed to run
        program: String,
        /// Error message
        message: String,
    },

    /// The installer ran but exited unsuccessfully
    #[error("Installer exited with non-zero exit code {exit_code}")]
    #[diagnostic(
        code(projenv::installer::failed),
        help("The installer's error output has been written to the build log")
    )]
    InstallerFailed {
        /// Exit code reported by the installer
        exit_code: i32,
    },

    /// The installer output was not a valid tool manifest
    #[error("Failed to parse tool manifest: {message}")]
    #[diagnostic(code(projenv::manifest::parse))]
    ManifestParse {
        /// Error message, including the location of the problem
        message: String,
    },

    /// A wrapper script could not be generated for a tool
    #[error("Failed to generate wrapper for tool '{tool}': {message}")]
    #[diagnostic(code(projenv::compose::wrapper))]
    WrapperGeneration {
        /// Tool whose executable was being wrapped
        tool: String,
        /// Error message
        message: String,
    },

    /// I/O error with path context
    #[error("I/O error during {operation}: {source}")]
    #[diagnostic(code(projenv::io::error))]
    Io {
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
        /// The path where the I/O error occurred, if applicable
        path: Option<Box<Path>>,
        /// Description of the operation that failed
        operation: String,
    },

    /// The host could not provide a required capability
    #[error("Execution context error: {message}")]
    #[diagnostic(code(projenv::context))]
    Context {
        /// The error message
        message: String,
    },
}

impl Error {
    /// Create an unsupported platform error
    #[must_use]
    pub fn unsupported_platform(detail: impl Into<String>) -> Self {
        Self::UnsupportedPlatform {
            detail: detail.into(),
        }
    }

    /// Create a network error
    #[must_use]
    pub fn network(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Network {
            url: url.into(),
            message: message.into(),
        }
    }

    /// Create a version resolution error
    #[must_use]
    pub fn version_resolution(message: impl Into<String>) -> Self {
        Self::VersionResolution {
            message: message.into(),
        }
    }

    /// Create an artifact not found error
    #[must_use]
    pub fn artifact_not_found(path: impl Into<PathBuf>) -> Self {
        Self::ArtifactNotFound {
            path: path.into().into_boxed_path(),
        }
    }

    /// Create an extraction error
    #[must_use]
    pub fn extraction(archive: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Extraction {
            archive: archive.into().into_boxed_path(),
            message: message.into(),
        }
    }

    /// Create a process execution error
    #[must_use]
    pub fn process_execution(program: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ProcessExecution {
            program: program.into(),
            message: message.into(),
        }
    }

    /// Create a manifest parse error
    #[must_use]
    pub fn manifest_parse(message: impl Into<String>) -> Self {
        Self::ManifestParse {
            message: message.into(),
        }
    }

    /// Create a wrapper generation error
    #[must_use]
    pub fn wrapper_generation(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Self::WrapperGeneration {
            tool: tool.into(),
            message: message.into(),
        }
    }

    /// Create an I/O error with context
    #[must_use]
    pub fn io(source: std::io::Error, path: Option<PathBuf>, operation: impl Into<String>) -> Self {
        Self::Io {
            source,
            path: path.map(PathBuf::into_boxed_path),
            operation: operation.into(),
        }
    }

    /// Create an execution context error
    #[must_use]
    pub fn context(message: impl Into<String>) -> Self {
        Self::Context {
            message: message.into(),
        }
    }

    /// Short name of the provisioning stage this error belongs to.
    #[must_use]
    pub const fn stage(&self) -> &'static str {
        match self {
            Self::UnsupportedPlatform { .. } => "platform",
            Self::Network { .. } | Self::ArtifactNotFound { .. } => "download",
            Self::VersionResolution { .. } => "version",
            Self::Extraction { .. } => "extract",
            Self::ProcessExecution { .. } => "process",
            Self::InstallerFailed { .. } => "installer",
            Self::ManifestParse { .. } => "manifest",
            Self::WrapperGeneration { .. } => "compose",
            Self::Io { .. } | Self::Context { .. } => "session",
        }
    }
}

/// Result type for projenv operations
pub type Result<T> = std::result::Result<T, Error>;
