//! Core types and utilities for projenv.
//!
//! This crate holds the pieces of a provisioning session that do not talk to
//! the network: platform detection, the installer's tool manifest, the
//! environment composer and the process runner used to invoke the installer.

mod error;

pub mod environment;
pub mod manifest;
pub mod platform;
pub mod process;
pub mod wrapper;

pub use environment::{ComposeOptions, EnvironmentMutation, compose};
pub use error::{Error, Result};
pub use manifest::{ToolManifest, ToolRecord};
pub use platform::{Arch, Os, PlatformInfo};
pub use process::{
    Invocation, LocalLauncher, LogSink, MemorySink, ProcessLauncher, ProcessOutput,
    ProcessRunner, TracingSink,
};
