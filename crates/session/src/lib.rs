//! Scoped provisioning sessions for projenv.
//!
//! A [`Session`] owns one temporary directory for the lifetime of a
//! provisioning invocation and drives the stages in order:
//!
//! ```text
//! CREATED → ACQUIRED → EXECUTED → COMPOSED → BODY_RUNNING → TERMINATED
//! ```
//!
//! The host plugs in through [`ExecutionContext`], which supplies the working
//! directory, environment, process launcher and log sink, and runs the body
//! with the composed environment.

pub mod config;
pub mod context;
pub mod session;
pub mod teardown;

pub use config::{DEFAULT_CONFIG_FILE, SessionConfig, StageFlags};
pub use context::{BodyOutcome, ExecutionContext, default_temp_root};
pub use session::{INSTALLER_PATH_NAME, Session, SessionState, run_session};
pub use teardown::{TEMP_DIR_PREFIX, TempDirectory};
