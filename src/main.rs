use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use tracing::debug;

use crate::{
    args::Cli,
    commands::{Command, command_from_args},
    config::CliConfig,
    logging::setup_logging,
};

mod api;
mod args;
mod cache;
mod commands;
mod config;
mod dependencies;
mod formatting;
mod interaction;
mod logging;
mod models;
mod platform;
mod remote_host;
mod selection;
mod selector;
mod table;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    setup_logging(cli.global_args.debug);

    match run(cli).await {
        Ok(exit_code) => ExitCode::from(exit_code),
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<u8> {
    let config = CliConfig::from_env()?;
    debug!(api_url = %config.api_url, "loaded configuration");

    let mut command: Box<dyn Command> = command_from_args(cli.command, &cli.global_args, &config)?;
    command.execute().await
}
