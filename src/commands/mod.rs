//! This module contains business logic for the commands for the application.
//!
//! The main entry point is the [`command_from_args`] function which converts CLI arguments into a command.
use anyhow::Result;

use crate::{
    args::{Commands, GlobalArgs, environment::Environment},
    config::CliConfig,
};
pub use self::core::{Command, CommandOutcome, CommandWithOutput, CommandWithOutputExt};

pub mod core;
pub mod environment;
pub mod ssh;

/// Convert CLI arguments into a command.
///
/// Commands producing output print it to stdout using the format from the global arguments.
/// The `ssh` command hands the terminal to the SSH client instead.
pub fn command_from_args(
    command: Commands,
    global_args: &GlobalArgs,
    config: &CliConfig,
) -> Result<Box<dyn Command>> {
    let format = global_args.format;

    match command {
        Commands::Environment(Environment::Delete(delete_args)) => {
            environment::Delete::new(delete_args, global_args, config)?.with_print_to_stdout(format)
        }
        Commands::Environment(Environment::List(list_args)) => {
            environment::List::new(list_args, global_args, config)?.with_print_to_stdout(format)
        }
        Commands::Ssh(ssh_args) => Ok(Box::new(ssh::Ssh::new(ssh_args, global_args, config)?)),
    }
}
