//! This module contains the core traits for commands.
//!
//! There are two main traits:
//! - [`Command`] is a trait for all commands, it returns the process exit code.
//! - [`CommandWithOutput`] is a trait for commands that return an output.
//!
//! [`CommandWithOutputExt`] turns a [`CommandWithOutput`] into a [`Command`] that prints the
//! output to stdout. The output decides the exit code through [`CommandOutcome`].

use anyhow::Result;
use async_trait::async_trait;

use crate::formatting::{Format, Formattable};

/// Exit code of a successful command.
pub const EXIT_SUCCESS: u8 = 0;

/// Exit code of a command that failed.
pub const EXIT_FAILURE: u8 = 1;

/// Trait for all commands.
#[async_trait]
pub trait Command {
    /// Execute the command and return the exit code.
    async fn execute(&mut self) -> Result<u8>;
}

/// Trait for commands that return an output.
#[async_trait]
pub trait CommandWithOutput {
    type Output;

    /// Execute the command and return the output.
    async fn execute(&mut self) -> Result<Self::Output>;
}

/// Whether a command output represents a success.
pub trait CommandOutcome {
    fn exit_code(&self) -> u8 {
        EXIT_SUCCESS
    }
}

/// Command extensions trait.
pub trait CommandWithOutputExt {
    /// Convert a [`CommandWithOutput`] into a [`Command`] that prints the output to stdout.
    fn with_print_to_stdout(self, format: Format) -> Result<Box<dyn Command>>;
}

/// Wrapper command that prints the output of a [`CommandWithOutput`] to stdout.
pub struct PrintToStdoutCommand<C, O>
where
    C: CommandWithOutput<Output = O>,
    O: Formattable + CommandOutcome,
{
    command: C,
    format: Format,
}

impl<C, O> PrintToStdoutCommand<C, O>
where
    C: CommandWithOutput<Output = O> + Send,
    O: Formattable + CommandOutcome,
{
    pub fn new(command: C, format: Format) -> Self {
        Self { command, format }
    }
}

#[async_trait]
impl<C, O> Command for PrintToStdoutCommand<C, O>
where
    C: CommandWithOutput<Output = O> + Send,
    O: Formattable + CommandOutcome,
{
    async fn execute(&mut self) -> Result<u8> {
        let output = self.command.execute().await?;

        println!("{}", output.format(self.format)?);

        Ok(output.exit_code())
    }
}

impl<C, O> CommandWithOutputExt for C
where
    C: CommandWithOutput<Output = O> + Send + 'static,
    O: Formattable + CommandOutcome + 'static,
{
    fn with_print_to_stdout(self, format: Format) -> Result<Box<dyn Command>> {
        Ok(Box::new(PrintToStdoutCommand::new(self, format)))
    }
}
