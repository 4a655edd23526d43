//! External import commands.
//!
//! A role's `external_cmd` is an argv template. Tokens equal to
//! [`CERT_FILE_PLACEHOLDER`] or [`COMMON_NAME_PLACEHOLDER`] are replaced
//! whole; the program is started directly, never through a shell.

use std::process::Stdio;
use std::time::Duration;

use thiserror::Error;
use tokio::process::Command;
use tokio::time::timeout;

/// Replaced by the path of the PEM file.
pub const CERT_FILE_PLACEHOLDER: &str = "CERTFILE";

/// Replaced by the certificate's subject common name.
pub const COMMON_NAME_PLACEHOLDER: &str = "COMMONNAME";

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("command is empty")]
    Empty,

    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("exited with {status}: {output}")]
    Exit { status: String, output: String },

    #[error("timed out after {0:?}")]
    Timeout(Duration),
}

/// Build the argv for one certificate from a role's template.
pub fn substitute_placeholders(template: &[String], cert_file: &str, common_name: &str) -> Vec<String> {
    template
        .iter()
        .map(|token| match token.as_str() {
            CERT_FILE_PLACEHOLDER => cert_file.to_string(),
            COMMON_NAME_PLACEHOLDER => common_name.to_string(),
            _ => token.clone(),
        })
        .collect()
}

/// Run `argv` to completion and return its combined stdout and stderr.
///
/// The child is killed if `limit` elapses first.
pub async fn run_external_command(
    argv: &[String],
    limit: Option<Duration>,
) -> Result<String, CommandError> {
    let (program, args) = argv.split_first().ok_or(CommandError::Empty)?;

    let mut cmd = Command::new(program);
    cmd.args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let output = match limit {
        Some(limit) => timeout(limit, cmd.output())
            .await
            .map_err(|_| CommandError::Timeout(limit))?,
        None => cmd.output().await,
    }
    .map_err(|source| CommandError::Spawn {
        program: program.clone(),
        source,
    })?;

    let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
    combined.push_str(&String::from_utf8_lossy(&output.stderr));

    if output.status.success() {
        Ok(combined)
    } else {
        Err(CommandError::Exit {
            status: output.status.to_string(),
            output: combined,
        })
    }
}

#[cfg(test)]
#[path = "command_tests.rs"]
mod tests;
