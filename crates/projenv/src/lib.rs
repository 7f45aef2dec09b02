//! projenv command-line host.
//!
//! `projenv exec -- <command>` provisions the project's toolchain through a
//! session and runs the command inside it. `projenv env` prints the
//! provisioned environment instead.

/// CLI argument parsing and exit codes.
pub mod cli;
/// The local machine as an execution context.
pub mod host;
/// Termination signal handling.
pub mod shutdown;
/// Tracing and logging configuration.
pub mod tracing;

use cli::{CliError, Cli, Commands, EXIT_CLI, exit_code_for, render_error};
use host::{Body, LocalContext};
use projenv_session::run_session;
use shutdown::{run_until_shutdown, shutdown_signal};
use crate::tracing::TracingConfig;

/// Run a parsed command line and return the process exit code.
///
/// SIGINT or SIGTERM abandons the session, which deletes its directory, and
/// exits with `128 + signal`.
pub async fn run(cli: Cli) -> i32 {
    let tracing_config = TracingConfig {
        format: cli.log_format,
        level: cli.log_level.into(),
        filter: None,
    };
    if let Err(e) = crate::tracing::init_tracing(tracing_config) {
        render_error(CliError::config_with_help(
            e.to_string(),
            "Check the RUST_LOG environment variable",
        ));
        return EXIT_CLI;
    }

    let work = async move {
        match execute(cli).await {
            Ok(code) => code,
            Err(err) => {
                let code = exit_code_for(&err);
                render_error(err);
                code
            }
        }
    };
    run_until_shutdown(work, shutdown_signal()).await
}

/// Provision the toolchain and run the selected command.
///
/// Returns the body's exit code.
pub async fn execute(cli: Cli) -> Result<i32, CliError> {
    let body = match cli.command {
        Commands::Exec { command } => Body::Exec(command),
        Commands::Env { format } => Body::Print(format),
    };
    let context = LocalContext::from_process(cli.workspace, body)?;
    let outcome = run_session(&context, cli.session.to_config()).await?;
    Ok(outcome.exit_code)
}
