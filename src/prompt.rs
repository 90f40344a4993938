use inquire::{Confirm, Password, PasswordDisplayMode, Select, Text};

use crate::error::AppError;

/// Source of interactive answers
pub trait Prompter {
    /// Free text, with an optional pre-filled default
    fn text(&mut self, message: &str, default: Option<&str>) -> Result<String, AppError>;

    /// Masked input; `None` when the user skips the prompt
    fn secret(&mut self, message: &str) -> Result<Option<String>, AppError>;

    fn confirm(&mut self, message: &str, default: bool) -> Result<bool, AppError>;

    /// Index of the chosen option
    fn select(&mut self, message: &str, options: &[String]) -> Result<usize, AppError>;
}

/// Prompts on the terminal using `inquire`
pub struct TerminalPrompter;

impl Prompter for TerminalPrompter {
    fn text(&mut self, message: &str, default: Option<&str>) -> Result<String, AppError> {
        let mut prompt = Text::new(message);
        if let Some(default) = default {
            prompt = prompt.with_default(default);
        }
        Ok(prompt.prompt()?)
    }

    fn secret(&mut self, message: &str) -> Result<Option<String>, AppError> {
        Ok(Password::new(message)
            .without_confirmation()
            .with_display_mode(PasswordDisplayMode::Masked)
            .with_help_message("press Esc to cancel")
            .prompt_skippable()?)
    }

    fn confirm(&mut self, message: &str, default: bool) -> Result<bool, AppError> {
        Ok(Confirm::new(message).with_default(default).prompt()?)
    }

    fn select(&mut self, message: &str, options: &[String]) -> Result<usize, AppError> {
        Ok(Select::new(message, options.to_vec()).raw_prompt()?.index)
    }
}
