//! Platform detection for the execution node.
//!
//! A [`PlatformInfo`] is resolved once per session on the node that runs the
//! installer and is never mutated afterwards. It drives download URL
//! construction, executable naming and the line/path separators used when
//! composing the environment.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{Error, Result};

/// Operating system family of the execution node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Os {
    /// Microsoft Windows
    Windows,
    /// Apple macOS
    Macos,
    /// Linux
    Linux,
}

impl Os {
    /// Classify an OS name as reported by `std::env::consts::OS`.
    pub fn classify(name: &str) -> Result<Self> {
        match name.to_lowercase().as_str() {
            "windows" => Ok(Self::Windows),
            "macos" | "darwin" | "osx" => Ok(Self::Macos),
            "linux" => Ok(Self::Linux),
            other => Err(Error::unsupported_platform(format!("os {other}"))),
        }
    }

    /// Token used for this OS in release asset names.
    #[must_use]
    pub const fn token(self) -> &'static str {
        match self {
            Self::Windows => "windows",
            Self::Macos => "macos",
            Self::Linux => "linux",
        }
    }

    /// Whether this is the Windows family.
    #[must_use]
    pub const fn is_windows(self) -> bool {
        matches!(self, Self::Windows)
    }
}

impl fmt::Display for Os {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// CPU architecture of the execution node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Arch {
    /// 64-bit x86
    Amd64,
    /// 64-bit ARM
    Aarch64,
}

impl Arch {
    /// Classify an architecture name as reported by `std::env::consts::ARCH`.
    pub fn classify(name: &str) -> Result<Self> {
        match name.to_lowercase().as_str() {
            "x86_64" | "amd64" | "x64" => Ok(Self::Amd64),
            "aarch64" | "arm64" => Ok(Self::Aarch64),
            other => Err(Error::unsupported_platform(format!("architecture {other}"))),
        }
    }

    /// Token used for this architecture in release asset names.
    #[must_use]
    pub const fn token(self) -> &'static str {
        match self {
            Self::Amd64 => "amd64",
            Self::Aarch64 => "aarch64",
        }
    }
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// Immutable description of the execution node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlatformInfo {
    /// Operating system family
    pub os: Os,
    /// CPU architecture
    pub arch: Arch,
    /// Line separator used in generated scripts
    pub line_separator: String,
}

impl PlatformInfo {
    /// Build platform info for a known OS and architecture.
    #[must_use]
    pub fn new(os: Os, arch: Arch) -> Self {
        let line_separator = if os.is_windows() { "\r\n" } else { "\n" };
        Self {
            os,
            arch,
            line_separator: line_separator.to_string(),
        }
    }

    /// Probe the node this process runs on.
    pub fn resolve() -> Result<Self> {
        Self::from_names(std::env::consts::OS, std::env::consts::ARCH)
    }

    /// Classify raw OS and architecture names.
    pub fn from_names(os: &str, arch: &str) -> Result<Self> {
        Ok(Self::new(Os::classify(os)?, Arch::classify(arch)?))
    }

    /// Separator between entries of the `PATH` variable.
    #[must_use]
    pub const fn path_separator(&self) -> char {
        if self.os.is_windows() { ';' } else { ':' }
    }

    /// File name of an executable with the platform's suffix applied.
    #[must_use]
    pub fn executable_name(&self, base: &str) -> String {
        if self.os.is_windows() {
            format!("{base}.exe")
        } else {
            base.to_string()
        }
    }
}

impl fmt::Display for PlatformInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.os, self.arch)
    }
}
