//! Explicit configuration for the CLI.
//!
//! The configuration is built once at startup from environment variables and handed to every
//! component that needs it. Nothing else in the crate reads the process environment for settings.
use std::{collections::HashMap, path::PathBuf, time::Duration};

use anyhow::{Context, Result};
use typed_builder::TypedBuilder;

pub const DEFAULT_EXECUTABLE_NAME: &str = "platform";
pub const DEFAULT_ENV_PREFIX: &str = "PLATFORM_CLI_";
pub const DEFAULT_API_URL: &str = "https://api.platform.sh/api/";

/// Configuration shared by commands and their dependencies.
#[derive(Debug, Clone, PartialEq, Eq, TypedBuilder)]
pub struct CliConfig {
    #[builder(default = DEFAULT_EXECUTABLE_NAME.to_string(), setter(into))]
    pub executable_name: String,
    #[builder(default = DEFAULT_ENV_PREFIX.to_string(), setter(into))]
    pub env_prefix: String,
    #[builder(default = DEFAULT_API_URL.to_string(), setter(into))]
    pub api_url: String,
    #[builder(default, setter(strip_option, into))]
    pub token: Option<String>,
    #[builder(default, setter(strip_option, into))]
    pub project: Option<String>,
    #[builder(default, setter(strip_option, into))]
    pub environment: Option<String>,
    #[builder(default = "ssh".to_string(), setter(into))]
    pub ssh_command: String,
    #[builder(default)]
    pub ssh_args: Vec<String>,
    #[builder(default = Duration::from_secs(3600))]
    pub ssh_timeout: Duration,
    #[builder(default = true)]
    pub wait: bool,
    #[builder(default = Duration::from_secs(3600))]
    pub wait_timeout: Duration,
    #[builder(default = Duration::from_secs(2))]
    pub activity_poll_interval: Duration,
    #[builder(default = false)]
    pub cache_disabled: bool,
    #[builder(default = default_cache_dir())]
    pub cache_dir: PathBuf,
    #[builder(default = Duration::from_secs(600))]
    pub cache_ttl: Duration,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl CliConfig {
    /// Load the configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_vars(std::env::vars().collect())
    }

    /// Load the configuration from a set of variables.
    ///
    /// Only variables starting with [`DEFAULT_ENV_PREFIX`] are considered.
    pub fn from_vars(vars: HashMap<String, String>) -> Result<Self> {
        let mut config = Self::default();
        let var = |suffix: &str| {
            vars.get(&config.env_var_name(suffix))
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let api_url = var("API_URL");
        let token = var("TOKEN");
        let project = var("PROJECT");
        let environment = var("ENVIRONMENT");
        let ssh_command = var("SSH_COMMAND");
        let ssh_args = var("SSH_ARGS");
        let ssh_timeout =
            parse_duration_var(&config.env_prefix, "SSH_TIMEOUT", var("SSH_TIMEOUT"))?;
        let no_wait = var("NO_WAIT");
        let wait_timeout =
            parse_duration_var(&config.env_prefix, "WAIT_TIMEOUT", var("WAIT_TIMEOUT"))?;
        let disable_cache = var("DISABLE_CACHE");
        let cache_dir = var("CACHE_DIR");
        let cache_ttl = parse_duration_var(&config.env_prefix, "CACHE_TTL", var("CACHE_TTL"))?;

        if let Some(api_url) = api_url {
            config.api_url = api_url;
        }
        config.token = token;
        config.project = project;
        config.environment = environment;
        if let Some(ssh_command) = ssh_command {
            config.ssh_command = ssh_command;
        }
        if let Some(ssh_args) = ssh_args {
            config.ssh_args = ssh_args.split_whitespace().map(str::to_string).collect();
        }
        if let Some(ssh_timeout) = ssh_timeout {
            config.ssh_timeout = ssh_timeout;
        }
        if let Some(no_wait) = no_wait {
            config.wait = !is_truthy(&no_wait);
        }
        if let Some(wait_timeout) = wait_timeout {
            config.wait_timeout = wait_timeout;
        }
        if let Some(disable_cache) = disable_cache {
            config.cache_disabled = is_truthy(&disable_cache);
        }
        if let Some(cache_dir) = cache_dir {
            config.cache_dir = PathBuf::from(cache_dir);
        }
        if let Some(cache_ttl) = cache_ttl {
            config.cache_ttl = cache_ttl;
        }

        Ok(config)
    }

    /// Full name of an environment variable read by the CLI.
    pub fn env_var_name(&self, suffix: &str) -> String {
        format!("{}{}", self.env_prefix, suffix)
    }
}

fn parse_duration_var(
    prefix: &str,
    suffix: &str,
    value: Option<String>,
) -> Result<Option<Duration>> {
    value
        .map(|value| {
            duration_str::parse(&value)
                .map_err(|e| anyhow::anyhow!("{e}"))
                .with_context(|| format!("parsing {prefix}{suffix}='{value}' as a duration"))
        })
        .transpose()
}

fn is_truthy(value: &str) -> bool {
    !matches!(value.to_lowercase().as_str(), "0" | "false" | "no" | "off")
}

fn default_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("platform-cli")
}
