use std::{env, path::PathBuf};

use crate::error::AppError;

/// Default GitHub REST endpoint
pub const DEFAULT_API_URL: &str = "https://api.github.com";
/// Overrides the credential file location
pub const CREDENTIALS_ENV: &str = "GIT_AUTOPILOT_CREDENTIALS";
/// Overrides the REST endpoint (GitHub Enterprise, tests)
pub const API_URL_ENV: &str = "GITHUB_API_URL";
/// Tracing filter directives
pub const LOG_ENV: &str = "GIT_AUTOPILOT_LOG";

const APP_DIR: &str = "git-autopilot";
const CREDENTIALS_FILE: &str = "credentials.json";

/// Runtime settings resolved once at start-up
#[derive(Debug, Clone)]
pub struct Settings {
    /// Where the credential store lives
    pub store_path: PathBuf,
    /// Base URL of the forge REST API, without trailing slash
    pub api_url: String,
}

impl Settings {
    /// Resolves settings from the process environment
    pub fn from_env() -> Result<Self, AppError> {
        Self::resolve(
            env::var_os(CREDENTIALS_ENV).map(PathBuf::from),
            env::var_os("XDG_CONFIG_HOME").map(PathBuf::from),
            dirs::home_dir(),
            env::var(API_URL_ENV).ok(),
        )
    }

    fn resolve(
        explicit: Option<PathBuf>,
        xdg: Option<PathBuf>,
        home: Option<PathBuf>,
        api_url: Option<String>,
    ) -> Result<Self, AppError> {
        let store_path = match (explicit, xdg, home) {
            (Some(path), _, _) => path,
            (None, Some(xdg), _) if !xdg.as_os_str().is_empty() => {
                xdg.join(APP_DIR).join(CREDENTIALS_FILE)
            }
            (None, _, Some(home)) => home.join(".config").join(APP_DIR).join(CREDENTIALS_FILE),
            (None, _, None) => {
                return Err(AppError::Validation(
                    "failed to find the home directory".to_string(),
                ));
            }
        };

        let api_url = api_url
            .filter(|url| !url.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_API_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        Ok(Settings { store_path, api_url })
    }
}
