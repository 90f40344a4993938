use thiserror::Error;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    /// Error during file I/O operations
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    /// Error during JSON serialization or deserialization
    #[error("json error: {0}")]
    SerdeJson(#[from] serde_json::Error),
    /// Error when user input fails.
    #[error("inquire error: {0}")]
    Inquire(#[from] inquire::InquireError),
    /// Error talking to the forge over HTTP
    #[error("network error: {0}")]
    Http(#[from] reqwest::Error),
    /// Forge answered with an unexpected status
    #[error("GitHub rejected the request ({status}): {message}")]
    Api { status: u16, message: String },
    /// Error when executing Git commands
    #[error("git {command} failed: {output}")]
    GitCommand { command: String, output: String },
    /// Git executable could not be run at all
    #[error("git is not installed or not on PATH")]
    GitMissing,
    /// Error during input validation.
    #[error("validation error: {0}")]
    Validation(String),
    /// Error when a login has no saved profile.
    #[error("profile not found: '{0}'")]
    ProfileNotFound(String),
    /// User backed out of a prompt
    #[error("cancelled")]
    Cancelled,
}

impl AppError {
    /// True when the user pressed Ctrl-C inside a prompt
    pub fn is_interrupt(&self) -> bool {
        matches!(
            self,
            AppError::Inquire(inquire::InquireError::OperationInterrupted)
        )
    }

    /// True when the user backed out of the current action (Esc or explicit cancel)
    pub fn is_cancel(&self) -> bool {
        matches!(
            self,
            AppError::Cancelled | AppError::Inquire(inquire::InquireError::OperationCanceled)
        )
    }
}
