//! Root command for the CLI.
//!
//! The commands are defined in the [`Commands`](super::Commands) enum, options shared by every
//! command live in [`GlobalArgs`].
use clap::{Args, Parser};

use crate::formatting::Format;

use super::Commands;

/// Manage projects and environments on the hosting platform
#[derive(Parser)]
#[command(name = "platform", version, about, long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub global_args: GlobalArgs,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Args)]
pub struct GlobalArgs {
    /// Enable debug logging.
    ///
    /// The log level can also be set with the `PLATFORM_CLI_LOG` environment variable.
    /// If `PLATFORM_CLI_LOG_ALL` is set, logs from all crates are shown.
    #[arg(global = true, hide = true, long, short = 'D', default_value = "false")]
    pub debug: bool,

    /// Output format.
    #[arg(global = true, long = "output", short = 'o', default_value = "text")]
    pub format: Format,

    /// The project ID.
    #[arg(global = true, long, short = 'p')]
    pub project: Option<String>,

    /// The environment ID.
    #[arg(global = true, long, short = 'e')]
    pub environment: Option<String>,

    /// Answer "yes" to any yes/no questions.
    #[arg(global = true, long, short = 'y')]
    pub yes: bool,
}
