use crate::tracing::{LogLevel, TracingFormat};
use clap::{Args, Parser, Subcommand, ValueEnum};
use clap::builder::BoolishValueParser;
use miette::{Diagnostic, Report};
use projenv_session::{DEFAULT_CONFIG_FILE, SessionConfig, StageFlags};
use projenv_tools_release::{DEFAULT_RELEASE_URL, ReleaseSource};
use std::io::{self, Write};
use std::path::PathBuf;
use thiserror::Error;

/// CLI or configuration error exit code
pub const EXIT_CLI: i32 = 2;
/// Provisioning failure exit code
pub const EXIT_PROVISION: i32 = 3;
/// Exit code for SIGINT (128 + signal number 2)
pub const EXIT_SIGINT: i32 = 130;
/// Exit code for SIGTERM (128 + signal number 15)
pub const EXIT_SIGTERM: i32 = 143;

/// CLI-specific error types with proper exit code mapping
#[derive(Error, Debug, Diagnostic)]
pub enum CliError {
    /// CLI or configuration error (exit code 2)
    #[error("CLI/configuration error: {message}")]
    #[diagnostic(code(projenv::cli::config))]
    Config {
        /// The error message
        message: String,
        /// Optional help text
        #[help]
        help: Option<String>,
    },
    /// A session stage failed (exit code 3)
    #[error("Provisioning failed during the {stage} stage")]
    #[diagnostic(code(projenv::cli::provision))]
    Provision {
        /// Stage that failed
        stage: &'static str,
        /// The underlying failure
        #[source]
        #[diagnostic_source]
        source: projenv_core::Error,
    },
}

impl CliError {
    /// Create a new configuration error
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            help: None,
        }
    }

    /// Create a new configuration error with help text
    #[must_use]
    pub fn config_with_help(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            help: Some(help.into()),
        }
    }
}

/// A host that cannot supply a capability is misconfigured; every other
/// failure belongs to a session stage.
impl From<projenv_core::Error> for CliError {
    fn from(err: projenv_core::Error) -> Self {
        match err {
            projenv_core::Error::Context { message } => Self::config(message),
            source => Self::Provision {
                stage: source.stage(),
                source,
            },
        }
    }
}

/// Map CLI error to appropriate exit code
#[must_use]
pub const fn exit_code_for(err: &CliError) -> i32 {
    match err {
        CliError::Config { .. } => EXIT_CLI,
        CliError::Provision { .. } => EXIT_PROVISION,
    }
}

/// Render an error on stderr through miette.
#[allow(clippy::print_stderr)]
pub fn render_error(err: CliError) {
    let report = Report::new(err);
    eprintln!("{report:?}");
    let _ = io::stderr().flush();
}

/// How `projenv env` prints the composed environment
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, ValueEnum)]
pub enum EnvFormat {
    /// `export KEY=value` lines with `PATH` already merged
    #[default]
    Shell,
    /// The raw mutation as a JSON object, `PATH+` keys included
    Json,
}

/// Provision a project's toolchain and run a command inside it.
#[derive(Parser, Debug)]
#[command(name = "projenv")]
#[command(about = "Provision a project's toolchain and run a command inside it")]
#[command(long_about = None)]
#[command(version)]
pub struct Cli {
    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Logging verbosity level.
    #[arg(
        short = 'L',
        long = "log-level",
        global = true,
        default_value = "warn",
        value_enum
    )]
    pub log_level: LogLevel,

    /// Log output format.
    #[arg(long = "log-format", global = true, default_value = "compact", value_enum)]
    pub log_format: TracingFormat,

    /// Workspace the installer and the command run in (default: current directory).
    #[arg(long, short = 'w', global = true, env = "PROJENV_WORKSPACE")]
    pub workspace: Option<PathBuf>,

    /// Session options.
    #[command(flatten)]
    pub session: SessionArgs,
}

/// Options shared by every provisioning command.
#[derive(Args, Debug, Clone)]
pub struct SessionArgs {
    /// Installer version to download; the latest release when unset.
    #[arg(long = "cli-version", global = true, env = "PROJENV_CLI_VERSION")]
    pub cli_version: Option<String>,

    /// Run the installer with `--debug`.
    #[arg(
        long = "cli-debug",
        global = true,
        env = "PROJENV_CLI_DEBUG",
        value_parser = BoolishValueParser::new()
    )]
    pub cli_debug: bool,

    /// Installer configuration file, relative to the workspace.
    #[arg(
        long = "config-file",
        global = true,
        env = "PROJENV_CONFIG_FILE",
        default_value = DEFAULT_CONFIG_FILE
    )]
    pub config_file: String,

    /// Release repository the installer is downloaded from.
    #[arg(
        long = "release-url",
        global = true,
        env = "PROJENV_RELEASE_URL",
        default_value = DEFAULT_RELEASE_URL
    )]
    pub release_url: String,

    /// Always download the installer, even if one is on the search path.
    #[arg(
        long = "no-path-probe",
        global = true,
        env = "PROJENV_NO_PATH_PROBE",
        value_parser = BoolishValueParser::new()
    )]
    pub no_path_probe: bool,

    /// Do not wrap the Maven launcher with the declared user settings file.
    #[arg(
        long = "no-maven-wrapper",
        global = true,
        env = "PROJENV_NO_MAVEN_WRAPPER",
        value_parser = BoolishValueParser::new()
    )]
    pub no_maven_wrapper: bool,
}

impl SessionArgs {
    /// Session configuration described by these options.
    #[must_use]
    pub fn to_config(&self) -> SessionConfig {
        SessionConfig {
            cli_version: self.cli_version.clone(),
            cli_debug: self.cli_debug,
            config_file: self.config_file.clone(),
            release: ReleaseSource::new(self.release_url.as_str()),
            features: StageFlags {
                probe_search_path: !self.no_path_probe,
                wrap_maven_settings: !self.no_maven_wrapper,
            },
        }
    }
}

/// Available CLI subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a command with the provisioned toolchain.
    #[command(about = "Run a command with the provisioned toolchain")]
    Exec {
        /// Command and arguments, after `--`.
        #[arg(last = true, required = true, num_args = 1.., value_name = "COMMAND")]
        command: Vec<String>,
    },
    /// Print the provisioned environment.
    #[command(about = "Print the provisioned environment")]
    Env {
        /// Output format.
        #[arg(long, value_enum, default_value_t = EnvFormat::Shell)]
        format: EnvFormat,
    },
}

/// Parse the process arguments.
#[must_use]
pub fn parse() -> Cli {
    Cli::parse()
}
