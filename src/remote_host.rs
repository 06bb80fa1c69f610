//! Running commands on an environment over SSH.
//!
//! [`RemoteHost`] builds the SSH invocation from the configuration, runs it, and calls an
//! [`SshDiagnostics`] hook when it fails. The hook runs once per failure; the returned error
//! only carries the exit code and stderr.
use std::{
    process::Stdio,
    time::{Duration, Instant},
};

use chrono::{DateTime, Utc};
use console::style;
use tokio::{process::Command, time::timeout};
use tracing::{debug, trace};

use crate::{config::CliConfig, models::Environment};

#[derive(Debug, thiserror::Error)]
pub enum RemoteHostError {
    #[error("failed to run '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("the command timed out after {0:?}")]
    Timeout(Duration),
    #[error("the command failed with exit code {exit_code}: {stderr}")]
    ProcessFailed { exit_code: i32, stderr: String },
}

/// Output of a finished SSH process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

/// Hook explaining SSH failures to the user.
pub trait SshDiagnostics {
    /// Called after a captured command failed.
    fn diagnose_failure(&self, target: &str, output: &ProcessOutput);

    /// Called after a direct command finished, `started` is when it was launched.
    fn diagnose_failure_with_test(&self, target: &str, started: Instant, exit_code: i32);
}

/// SSH exits with 255 when the connection itself failed.
const SSH_CONNECTION_ERROR: i32 = 255;

/// A connection error that happens this fast was refused rather than lost.
const FAST_FAILURE: Duration = Duration::from_secs(1);

/// Explains common SSH connection failures on stderr.
#[derive(Debug, Clone)]
pub struct ConsoleSshDiagnostics {
    executable_name: String,
}

impl ConsoleSshDiagnostics {
    pub fn new(config: &CliConfig) -> Self {
        Self {
            executable_name: config.executable_name.clone(),
        }
    }

    fn explain_connection_error(&self, target: &str, elapsed: Option<Duration>) {
        eprintln!(
            "{} The SSH connection to {} failed.",
            style("!").yellow(),
            style(target).cyan()
        );
        if elapsed.is_some_and(|elapsed| elapsed < FAST_FAILURE) {
            eprintln!(
                "The connection was refused immediately, check that the environment is active."
            );
        }
        eprintln!(
            "Check that your SSH key is loaded, then list environments with: {} environment list",
            self.executable_name
        );
    }
}

impl SshDiagnostics for ConsoleSshDiagnostics {
    fn diagnose_failure(&self, target: &str, output: &ProcessOutput) {
        if output.exit_code == SSH_CONNECTION_ERROR {
            self.explain_connection_error(target, None);
        }
    }

    fn diagnose_failure_with_test(&self, target: &str, started: Instant, exit_code: i32) {
        if exit_code == SSH_CONNECTION_ERROR {
            self.explain_connection_error(target, Some(started.elapsed()));
        }
    }
}

/// An environment reachable over SSH.
pub struct RemoteHost {
    target: String,
    environment: Environment,
    ssh_command: String,
    ssh_args: Vec<String>,
    timeout: Duration,
    diagnostics: Box<dyn SshDiagnostics + Send + Sync>,
}

impl RemoteHost {
    pub fn new(
        target: impl Into<String>,
        environment: Environment,
        config: &CliConfig,
        diagnostics: Box<dyn SshDiagnostics + Send + Sync>,
    ) -> Self {
        Self {
            target: target.into(),
            environment,
            ssh_command: config.ssh_command.clone(),
            ssh_args: config.ssh_args.clone(),
            timeout: config.ssh_timeout,
            diagnostics,
        }
    }

    /// The SSH invocation as a line for the local shell.
    ///
    /// `ssh_command` is used verbatim so it may carry its own flags. The extra arguments, the
    /// target and the remote command are escaped, the local shell hands them to ssh unchanged.
    pub fn command_line(&self, command: Option<&str>) -> String {
        let mut line = vec![self.ssh_command.clone()];
        line.extend(self.ssh_args.iter().map(|arg| shell_escape(arg)));
        line.push(shell_escape(&self.target));
        if let Some(command) = command {
            line.push(shell_escape(command));
        }
        line.join(" ")
    }

    fn build(&self, command: Option<&str>) -> Command {
        let line = self.command_line(command);
        debug!(command = %line, "running remote command");

        let mut process = local_shell();
        process.arg(line);
        process
    }

    /// Run a command and capture its output.
    pub async fn run(&self, command: &str) -> Result<String, RemoteHostError> {
        let mut process = self.build(Some(command));
        process
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let child = process.spawn().map_err(|source| RemoteHostError::Spawn {
            program: self.ssh_command.clone(),
            source,
        })?;

        let output = timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| RemoteHostError::Timeout(self.timeout))?
            .map_err(|source| RemoteHostError::Spawn {
                program: self.ssh_command.clone(),
                source,
            })?;

        let output = ProcessOutput {
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };
        trace!(exit_code = output.exit_code, "remote command finished");

        if output.exit_code != 0 {
            self.diagnostics.diagnose_failure(&self.target, &output);
            return Err(RemoteHostError::ProcessFailed {
                exit_code: output.exit_code,
                stderr: output.stderr.trim().to_string(),
            });
        }

        Ok(output.stdout)
    }

    /// Run a command (or an interactive shell) attached to the terminal, returns its exit code.
    pub async fn run_direct(&self, command: Option<&str>) -> Result<i32, RemoteHostError> {
        let mut process = self.build(command);
        process
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());

        let started = Instant::now();
        let status = process
            .status()
            .await
            .map_err(|source| RemoteHostError::Spawn {
                program: self.ssh_command.clone(),
                source,
            })?;

        let exit_code = status.code().unwrap_or(1);
        debug!(exit_code, elapsed = ?started.elapsed(), "direct remote command finished");

        if exit_code != 0 {
            self.diagnostics
                .diagnose_failure_with_test(&self.target, started, exit_code);
        }

        Ok(exit_code)
    }

    /// Key for caching data read from this host, changes with every deployment.
    pub fn cache_key(&self) -> String {
        format!(
            "{}--{}",
            self.target,
            self.environment.head_commit().unwrap_or_default()
        )
    }

    /// When the environment's deployment last changed.
    pub fn last_changed(&self) -> Option<DateTime<Utc>> {
        self.environment.deployment_last_changed()
    }
}

#[cfg(unix)]
fn local_shell() -> Command {
    let mut shell = Command::new("sh");
    shell.arg("-c");
    shell
}

#[cfg(windows)]
fn local_shell() -> Command {
    let mut shell = Command::new("cmd");
    shell.arg("/C");
    shell
}

/// Quote a string for a POSIX shell.
pub fn shell_escape(value: &str) -> String {
    let is_safe = |c: char| c.is_ascii_alphanumeric() || "_@%+=:,./-".contains(c);
    if !value.is_empty() && value.chars().all(is_safe) {
        return value.to_string();
    }
    format!("'{}'", value.replace('\'', r"'\''"))
}
