use crate::types::Result;
use dialoguer::{theme::ColorfulTheme, Confirm, Input};

/// Standardized confirmation prompt used before destructive actions.
pub fn ask_confirmation(prompt: &str, default_yes: bool) -> Result<bool> {
    let choice = Confirm::with_theme(&ColorfulTheme::default())
        .with_prompt(prompt)
        .default(default_yes)
        .show_default(true)
        .interact()?;
    Ok(choice)
}

/// Reads one line of free text. Empty input is allowed so the caller decides what it means.
pub fn ask_line(prompt: &str) -> Result<String> {
    let line: String = Input::with_theme(&ColorfulTheme::default())
        .with_prompt(prompt)
        .allow_empty(true)
        .interact_text()?;
    Ok(line)
}
