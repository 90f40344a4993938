use colored::Colorize;
use validator::ValidateEmail;

use crate::{error::AppError, prompt::Prompter};

/// Maximum length GitHub accepts for a repository name
const MAX_REPO_NAME_LENGTH: usize = 100;
/// Maximum length for email address
const MAX_EMAIL_LENGTH: usize = 100;

/// Prompts user for input until valid input is provided.
///
/// The validator may normalise the input; the normalised value is returned.
pub fn prompt_until_valid<P, F>(
    prompter: &mut P,
    prompt_message: &str,
    default: Option<&str>,
    input_validation: F,
) -> Result<String, AppError>
where
    P: Prompter + ?Sized,
    F: Fn(&str) -> Result<String, AppError>,
{
    loop {
        let input: String = prompter.text(prompt_message, default)?;
        match input_validation(&input) {
            Ok(value) => break Ok(value),
            Err(AppError::Validation(msg)) => println!("{}", msg.red()),
            Err(e) => return Err(e),
        }
    }
}

/// Accepts a pasted token: trimmed, non-empty, no inner whitespace
pub fn validate_token(token: &str) -> Result<String, AppError> {
    let token = token.trim();
    if token.is_empty() {
        Err(AppError::Validation("Token cannot be empty".to_string()))
    } else if token.chars().any(char::is_whitespace) {
        Err(AppError::Validation(
            "Token cannot contain spaces, make sure you copied only the key".to_string(),
        ))
    } else {
        Ok(token.to_string())
    }
}

/// Validates email input
pub fn validate_input_email(email: &str) -> Result<String, AppError> {
    let email = email.trim();
    if email.is_empty() {
        Err(AppError::Validation("Email cannot be empty".to_string()))
    } else if email.len() > MAX_EMAIL_LENGTH {
        Err(AppError::Validation(format!(
            "email too long, max {MAX_EMAIL_LENGTH} characters"
        )))
    } else if !email.validate_email() {
        Err(AppError::Validation("Invalid email format".to_string()))
    } else {
        Ok(email.to_string())
    }
}

/// Validates the author name written into commits
pub fn validate_commit_name(name: &str) -> Result<String, AppError> {
    let name = name.trim();
    if name.is_empty() {
        Err(AppError::Validation("Name cannot be empty".to_string()))
    } else {
        Ok(name.to_string())
    }
}

/// Validates a repository name, turning spaces into dashes
pub fn validate_repo_name(name: &str) -> Result<String, AppError> {
    let name = name.trim().replace(' ', "-");
    if name.is_empty() {
        Err(AppError::Validation("Name cannot be empty".to_string()))
    } else if name.len() > MAX_REPO_NAME_LENGTH {
        Err(AppError::Validation(format!(
            "Name too long (max {MAX_REPO_NAME_LENGTH} characters)"
        )))
    } else if name == "." || name == ".." {
        Err(AppError::Validation("Name cannot be '.' or '..'".to_string()))
    } else if let Some(bad) = name
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')))
    {
        Err(AppError::Validation(format!(
            "'{bad}' is not allowed, use letters, numbers, '-', '_' or '.'"
        )))
    } else {
        Ok(name)
    }
}

/// Validates a new branch name, turning spaces into dashes
pub fn validate_branch_name(name: &str) -> Result<String, AppError> {
    let name = name.trim().replace(' ', "-");
    let forbidden = ['~', '^', ':', '?', '*', '[', '\\'];
    if name.is_empty() {
        Err(AppError::Validation("Branch name cannot be empty".to_string()))
    } else if name.starts_with('-') || name.starts_with('/') || name.ends_with('/') {
        Err(AppError::Validation(
            "Branch name cannot start with '-' or start/end with '/'".to_string(),
        ))
    } else if name.contains("..")
        || name.contains("@{")
        || name.ends_with(".lock")
        || name.ends_with('.')
    {
        Err(AppError::Validation("That is not a valid branch name".to_string()))
    } else if name.chars().any(|c| c.is_control() || forbidden.contains(&c)) {
        Err(AppError::Validation(
            "Branch name cannot contain ~ ^ : ? * [ or \\".to_string(),
        ))
    } else {
        Ok(name)
    }
}

/// Outcome of the numbered profile menu
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileChoice {
    /// Zero-based index into the profile list
    Existing(usize),
    AddNew,
}

/// Interprets a typed menu number for `count` profiles followed by an "add new" entry.
///
/// Blank or non-numeric input picks `default_index`. Numbers past the menu clamp to
/// the last profile, numbers below 1 clamp to the first.
pub fn resolve_profile_choice(input: &str, count: usize, default_index: usize) -> ProfileChoice {
    if count == 0 {
        return ProfileChoice::AddNew;
    }
    let default_index = default_index.min(count - 1);

    let input = input.trim();
    let (negative, digits) = match input.strip_prefix('-') {
        Some(digits) => (true, digits),
        None => (false, input.strip_prefix('+').unwrap_or(input)),
    };
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return ProfileChoice::Existing(default_index);
    }
    if negative {
        return ProfileChoice::Existing(0);
    }

    // too many digits for usize is still past the end
    let number = digits.parse::<usize>().unwrap_or(usize::MAX);
    match number {
        0 => ProfileChoice::Existing(0),
        n if n == count + 1 => ProfileChoice::AddNew,
        n if n > count => ProfileChoice::Existing(count - 1),
        n => ProfileChoice::Existing(n - 1),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompt::scripted::{Answer, ScriptedPrompter};

    #[test]
    fn token_is_trimmed_and_checked() {
        assert_eq!(validate_token("  ghp_abc \n").unwrap(), "ghp_abc");
        assert!(validate_token("   ").is_err());
        assert!(validate_token("ghp abc").is_err());
    }

    #[test]
    fn email_validation() {
        assert_eq!(validate_input_email(" a@b.io ").unwrap(), "a@b.io");
        assert!(validate_input_email("").is_err());
        assert!(validate_input_email("not-an-email").is_err());
    }

    #[test]
    fn repo_names_turn_spaces_into_dashes() {
        assert_eq!(validate_repo_name("my cool site").unwrap(), "my-cool-site");
        assert!(validate_repo_name("..").is_err());
        assert!(validate_repo_name("what?").is_err());
        assert!(validate_repo_name(&"a".repeat(101)).is_err());
    }

    #[test]
    fn branch_names() {
        assert_eq!(validate_branch_name("new button test").unwrap(), "new-button-test");
        assert_eq!(validate_branch_name("feature/login").unwrap(), "feature/login");
        assert!(validate_branch_name("-oops").is_err());
        assert!(validate_branch_name("a..b").is_err());
        assert!(validate_branch_name("topic.lock").is_err());
        assert!(validate_branch_name("why?").is_err());
    }

    #[test]
    fn profile_choice_in_range() {
        assert_eq!(resolve_profile_choice("2", 3, 0), ProfileChoice::Existing(1));
        assert_eq!(resolve_profile_choice("4", 3, 0), ProfileChoice::AddNew);
    }

    #[test]
    fn profile_choice_clamps_out_of_range() {
        assert_eq!(resolve_profile_choice("99", 3, 0), ProfileChoice::Existing(2));
        assert_eq!(resolve_profile_choice("0", 3, 2), ProfileChoice::Existing(0));
        assert_eq!(resolve_profile_choice("-5", 3, 2), ProfileChoice::Existing(0));
        assert_eq!(
            resolve_profile_choice("99999999999999999999", 3, 0),
            ProfileChoice::Existing(2)
        );
        assert_eq!(
            resolve_profile_choice("-99999999999999999999", 3, 2),
            ProfileChoice::Existing(0)
        );
        assert_eq!(resolve_profile_choice(" 4 ", 3, 0), ProfileChoice::AddNew);
    }

    #[test]
    fn profile_choice_non_numeric_uses_default() {
        assert_eq!(resolve_profile_choice("", 3, 1), ProfileChoice::Existing(1));
        assert_eq!(resolve_profile_choice("bob", 3, 2), ProfileChoice::Existing(2));
        assert_eq!(resolve_profile_choice("x", 2, 9), ProfileChoice::Existing(1));
        assert_eq!(resolve_profile_choice("1", 0, 0), ProfileChoice::AddNew);
    }

    #[test]
    fn prompt_repeats_until_valid() {
        let mut prompter = ScriptedPrompter::new(vec![
            Answer::Text("bad name?".to_string()),
            Answer::Text("good name".to_string()),
        ]);
        let name = prompt_until_valid(&mut prompter, "name", None, validate_repo_name).unwrap();
        assert_eq!(name, "good-name");
        assert_eq!(prompter.asked.len(), 2);
    }
}
