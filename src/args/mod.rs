//! CLI argument parsing layer.
//!
//! This module provides the CLI interface using clap derive macros.
//! It handles parsing command-line arguments and converting them into structured data types.
//!
//! The business logic layer is [`crate::commands`], which receives these parsed arguments.

use clap::{Parser, Subcommand};

mod cli;
pub mod environment;

pub use cli::{Cli, GlobalArgs};

/// Root command enum.
#[derive(Subcommand)]
pub enum Commands {
    /// Manage environments
    #[command(subcommand, alias = "env")]
    Environment(environment::Environment),

    #[command(alias = "shell")]
    Ssh(Ssh),
}

/// Open a shell or run a command on the current environment over SSH.
///
/// The exit code of the remote command is returned.
#[derive(Parser)]
pub struct Ssh {
    /// Command to run on the environment, an interactive shell is opened when omitted.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub command: Vec<String>,
}
