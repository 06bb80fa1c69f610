//! Command to open an SSH session on the current environment, or run a command there.

use anyhow::{Context, Result, anyhow, bail};
use async_trait::async_trait;
use tracing::debug;

use crate::{
    args::{self, GlobalArgs},
    commands::{
        Command,
        core::{EXIT_FAILURE, EXIT_SUCCESS},
    },
    config::CliConfig,
    dependencies::EnvironmentSelector,
    models::Environment,
    platform::Platform,
    remote_host::{ConsoleSshDiagnostics, RemoteHost, RemoteHostError},
};

pub struct Ssh {
    project: String,
    remote_command: Option<String>,
    /// Capture the output of a remote command instead of attaching it to the terminal.
    capture: bool,
    config: CliConfig,
    selector: Box<dyn EnvironmentSelector + Send + Sync>,
}

impl Ssh {
    pub fn new(args: args::Ssh, global_args: &GlobalArgs, config: &CliConfig) -> Result<Self> {
        let platform = Platform::connect(global_args, config)?;

        Ok(Self {
            project: platform.project()?,
            remote_command: remote_command(&args.command),
            capture: !console::user_attended(),
            config: config.clone(),
            selector: Box::new(platform),
        })
    }

    fn remote_host(&self, environment: Environment) -> Result<RemoteHost> {
        let ssh_url = environment.ssh_url().ok_or_else(|| {
            anyhow!(
                "The environment {} does not have an SSH URL, it may be inactive",
                environment.id()
            )
        })?;
        let target = ssh_target(ssh_url).to_string();

        Ok(RemoteHost::new(
            target,
            environment,
            &self.config,
            Box::new(ConsoleSshDiagnostics::new(&self.config)),
        ))
    }
}

/// Words after `--` form one remote command line.
fn remote_command(words: &[String]) -> Option<String> {
    if words.is_empty() {
        None
    } else {
        Some(words.join(" "))
    }
}

/// `ssh://user@host` becomes `user@host`.
fn ssh_target(ssh_url: &str) -> &str {
    ssh_url.strip_prefix("ssh://").unwrap_or(ssh_url)
}

/// The SSH client must be installed before anything is attempted.
fn check_ssh_client(ssh_command: &str) -> Result<()> {
    let Some(program) = ssh_command.split_whitespace().next() else {
        bail!("No SSH client configured");
    };

    let path =
        which::which(program).with_context(|| format!("SSH client not found: {program}"))?;
    debug!(path = %path.display(), "found the SSH client");

    Ok(())
}

fn exit_code_of(exit_code: i32) -> u8 {
    u8::try_from(exit_code).unwrap_or(EXIT_FAILURE)
}

/// Run a command with its output captured, then print it.
///
/// A failing remote command is not an error: its stderr is printed and its exit code returned.
async fn run_captured(host: &RemoteHost, command: &str) -> Result<u8> {
    match host.run(command).await {
        Ok(stdout) => {
            print!("{stdout}");
            Ok(EXIT_SUCCESS)
        }
        Err(RemoteHostError::ProcessFailed { exit_code, stderr }) => {
            if !stderr.is_empty() {
                eprintln!("{stderr}");
            }
            Ok(exit_code_of(exit_code))
        }
        Err(e) => Err(e).context("running the SSH client"),
    }
}

#[async_trait]
impl Command for Ssh {
    async fn execute(&mut self) -> Result<u8> {
        check_ssh_client(&self.config.ssh_command)?;

        let environment = self
            .selector
            .resolve_current(&self.project)
            .await?
            .context("No environment specified, use the --environment option")?;

        let host = self.remote_host(environment)?;
        debug!(
            cache_key = %host.cache_key(),
            last_changed = ?host.last_changed(),
            "connecting to the environment"
        );

        match self.remote_command.as_deref() {
            Some(command) if self.capture => run_captured(&host, command).await,
            command => {
                let exit_code = host
                    .run_direct(command)
                    .await
                    .context("running the SSH client")?;
                Ok(exit_code_of(exit_code))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use mockall::predicate::eq;

    use super::*;
    use crate::{dependencies::mocks::MockPlatform, models::EnvironmentStatus};

    /// Stands in for ssh: runs the remote command locally.
    const FAKE_SSH: &str = r#"sh -c 'eval "$2"' fake-ssh"#;

    fn config(ssh_command: &str, ssh_timeout: Duration) -> CliConfig {
        CliConfig::builder()
            .ssh_command(ssh_command)
            .ssh_timeout(ssh_timeout)
            .build()
    }

    fn command(selector: MockPlatform, ssh_command: &str, remote_command: &[&str]) -> Ssh {
        let words: Vec<String> = remote_command.iter().map(|w| w.to_string()).collect();
        Ssh {
            project: "abc".to_string(),
            remote_command: super::remote_command(&words),
            capture: false,
            config: config(ssh_command, Duration::from_secs(10)),
            selector: Box::new(selector),
        }
    }

    fn current(environment: Environment) -> MockPlatform {
        let mut selector = MockPlatform::new();
        selector
            .expect_resolve_current()
            .with(eq("abc"))
            .return_once(move |_| Ok(Some(environment)));
        selector
    }

    fn reachable() -> Environment {
        Environment::new("main", EnvironmentStatus::Active)
            .with_ssh_url("ssh://main-abc@ssh.example.com")
    }

    #[test]
    fn test_ssh_target() {
        assert_eq!(
            ssh_target("ssh://main-abc@ssh.example.com"),
            "main-abc@ssh.example.com"
        );
        assert_eq!(
            ssh_target("main-abc@ssh.example.com"),
            "main-abc@ssh.example.com"
        );
    }

    #[test]
    fn test_remote_command() {
        assert_eq!(remote_command(&[]), None);
        assert_eq!(
            remote_command(&["ls".to_string(), "-la".to_string()]).as_deref(),
            Some("ls -la")
        );
    }

    #[test]
    fn test_exit_code_out_of_range() {
        assert_eq!(exit_code_of(0), 0);
        assert_eq!(exit_code_of(255), 255);
        assert_eq!(exit_code_of(-1), EXIT_FAILURE);
        assert_eq!(exit_code_of(256), EXIT_FAILURE);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_exit_code_of_remote_command() {
        let mut ssh = command(current(reachable()), FAKE_SSH, &["exit", "3"]);

        assert_eq!(ssh.execute().await.unwrap(), 3);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_captured_remote_command() {
        let mut ssh = command(current(reachable()), FAKE_SSH, &["echo", "hello"]);
        ssh.capture = true;

        assert_eq!(ssh.execute().await.unwrap(), EXIT_SUCCESS);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_captured_remote_command_exit_code() {
        let mut ssh = command(
            current(reachable()),
            FAKE_SSH,
            &["echo oops >&2;", "exit", "3"],
        );
        ssh.capture = true;

        assert_eq!(ssh.execute().await.unwrap(), 3);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_captured_remote_command_timeout() {
        let mut ssh = command(current(reachable()), FAKE_SSH, &["sleep", "5"]);
        ssh.capture = true;
        ssh.config = config(FAKE_SSH, Duration::from_millis(100));

        let error = ssh.execute().await.unwrap_err();

        assert!(matches!(
            error.downcast_ref::<RemoteHostError>(),
            Some(RemoteHostError::Timeout(_))
        ));
    }

    #[tokio::test]
    async fn test_environment_without_ssh_url() {
        let environment = Environment::new("old", EnvironmentStatus::Inactive);
        let mut ssh = command(current(environment), "sh", &["true"]);

        let error = ssh.execute().await.unwrap_err();

        assert!(error.to_string().contains("does not have an SSH URL"));
    }

    #[tokio::test]
    async fn test_no_current_environment() {
        let mut selector = MockPlatform::new();
        selector.expect_resolve_current().return_once(|_| Ok(None));
        let mut ssh = command(selector, "sh", &[]);

        let error = ssh.execute().await.unwrap_err();

        assert_eq!(
            error.to_string(),
            "No environment specified, use the --environment option"
        );
    }

    #[tokio::test]
    async fn test_missing_ssh_client() {
        let mut selector = MockPlatform::new();
        selector.expect_resolve_current().never();
        let mut ssh = command(selector, "platform-cli-missing-ssh -v", &[]);

        let error = ssh.execute().await.unwrap_err();

        assert_eq!(
            error.to_string(),
            "SSH client not found: platform-cli-missing-ssh"
        );
    }
}
