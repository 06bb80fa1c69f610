//! User interaction: confirmation prompts and progress spinners.
//!
//! Commands depend on the traits so tests can swap in [`mocks::MockInteraction`].
use anyhow::Result;
use console::style;
use typed_builder::TypedBuilder;

mod input;
mod spinner;

#[derive(Debug, Default, Clone)]
pub struct Interaction;

impl Interaction {
    pub fn new() -> Self {
        Default::default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, TypedBuilder)]
pub struct ConfirmationPromptOptions {
    #[builder(setter(into))]
    message: String,
    #[builder(default, setter(strip_option))]
    default: Option<bool>,
    #[builder(default, setter(strip_option, into))]
    help_text: Option<String>,
}

impl ConfirmationPromptOptions {
    pub fn message(&self) -> &str {
        &self.message
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmationPromptResult {
    Yes,
    No,
    Canceled,
}

pub trait ConfirmationPrompt {
    fn confirm(&self, options: ConfirmationPromptOptions) -> Result<ConfirmationPromptResult>;

    /// Whether a person is there to answer prompts.
    fn is_interactive(&self) -> bool;
}

pub struct SpinnerHandle {
    stop_spinner: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl SpinnerHandle {
    pub fn new(stop_spinner: Box<dyn FnOnce() + Send + Sync>) -> Self {
        Self {
            stop_spinner: Some(stop_spinner),
        }
    }
}

impl Drop for SpinnerHandle {
    fn drop(&mut self) {
        if let Some(stop_spinner) = self.stop_spinner.take() {
            stop_spinner();
        }
    }
}

pub trait SpinnerInteraction {
    fn start_spinner(&self, message: String) -> Result<SpinnerHandle>;
}

/// Answers yes/no questions, honoring `--yes` and non-interactive sessions.
///
/// With `--yes` every question is answered yes without prompting. Without a user at the
/// terminal, questions get their default answer. Both cases print the question and the answer.
pub struct Confirmer<'a, P: ConfirmationPrompt + ?Sized> {
    prompt: &'a P,
    assume_yes: bool,
}

impl<'a, P: ConfirmationPrompt + ?Sized> Confirmer<'a, P> {
    pub fn new(prompt: &'a P, assume_yes: bool) -> Self {
        Self { prompt, assume_yes }
    }

    /// Whether questions are actually put to the user.
    pub fn is_interactive(&self) -> bool {
        !self.assume_yes && self.prompt.is_interactive()
    }

    /// Ask a question, "no" is the default answer.
    pub fn confirm(&self, message: &str) -> Result<bool> {
        self.confirm_with_default(message, false)
    }

    pub fn confirm_with_default(&self, message: &str, default: bool) -> Result<bool> {
        if self.assume_yes {
            eprintln!("{} {}", message, style("y").cyan());
            return Ok(true);
        }

        if !self.prompt.is_interactive() {
            eprintln!(
                "{} {}",
                message,
                style(if default { "y" } else { "n" }).cyan()
            );
            return Ok(default);
        }

        let result = self.prompt.confirm(
            ConfirmationPromptOptions::builder()
                .message(message)
                .default(default)
                .build(),
        )?;

        Ok(result == ConfirmationPromptResult::Yes)
    }
}
