//! GitHub REST calls: identity lookup, repository creation, pull requests.

use reqwest::{
    StatusCode,
    blocking::{Client, Response},
    header::{ACCEPT, HeaderMap, HeaderValue, USER_AGENT},
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::AppError;

const API_VERSION_HEADER: &str = "x-github-api-version";
const API_VERSION: &str = "2022-11-28";

/// Account details returned by the "current user" endpoint
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub login: String,
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

impl Identity {
    /// GitHub's private commit address for this account
    pub fn noreply_email(&self) -> String {
        match self.id {
            Some(id) => format!("{id}+{}@users.noreply.github.com", self.login),
            None => format!("{}@users.noreply.github.com", self.login),
        }
    }
}

/// Body of a repository creation request
#[derive(Serialize, Debug, Clone)]
pub struct NewRepository {
    pub name: String,
    pub private: bool,
    pub description: String,
}

/// Body of a pull request creation request
#[derive(Serialize, Debug, Clone)]
pub struct NewPullRequest {
    pub title: String,
    pub head: String,
    pub base: String,
    pub body: String,
}

#[derive(Deserialize, Debug)]
struct CreatedRepository {
    clone_url: String,
}

#[derive(Deserialize, Debug)]
struct CreatedPullRequest {
    html_url: String,
}

#[derive(Deserialize, Debug, Default)]
struct ApiErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    errors: Vec<ApiErrorDetail>,
}

#[derive(Deserialize, Debug)]
struct ApiErrorDetail {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    code: Option<String>,
}

/// Operations the wizard needs from the forge
pub trait Forge {
    /// Resolves the account behind `token`; `None` means the token was rejected
    fn current_user(&self, token: &str) -> Result<Option<Identity>, AppError>;

    /// Creates a repository owned by the token's account and returns its clone URL
    fn create_repository(&self, token: &str, repo: &NewRepository) -> Result<String, AppError>;

    /// Opens a pull request and returns its web URL
    fn open_pull_request(
        &self,
        token: &str,
        owner: &str,
        repo: &str,
        pull: &NewPullRequest,
    ) -> Result<String, AppError>;
}

/// Blocking GitHub REST client
pub struct GitHubClient {
    client: Client,
    base_url: String,
}

impl GitHubClient {
    pub fn new(base_url: &str) -> Result<Self, AppError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(USER_AGENT, HeaderValue::from_static("git-autopilot"));
        headers.insert(API_VERSION_HEADER, HeaderValue::from_static(API_VERSION));

        let client = Client::builder().default_headers(headers).build()?;
        Ok(GitHubClient {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl Forge for GitHubClient {
    fn current_user(&self, token: &str) -> Result<Option<Identity>, AppError> {
        let response = self.client.get(self.url("/user")).bearer_auth(token).send()?;
        debug!(status = %response.status(), "identity lookup");

        if response.status() != StatusCode::OK {
            return Ok(None);
        }
        Ok(Some(response.json()?))
    }

    fn create_repository(&self, token: &str, repo: &NewRepository) -> Result<String, AppError> {
        let response = self
            .client
            .post(self.url("/user/repos"))
            .bearer_auth(token)
            .json(repo)
            .send()?;
        debug!(status = %response.status(), name = %repo.name, "create repository");

        if response.status() != StatusCode::CREATED {
            return Err(api_error(response));
        }
        let created: CreatedRepository = response.json()?;
        Ok(created.clone_url)
    }

    fn open_pull_request(
        &self,
        token: &str,
        owner: &str,
        repo: &str,
        pull: &NewPullRequest,
    ) -> Result<String, AppError> {
        let response = self
            .client
            .post(self.url(&format!("/repos/{owner}/{repo}/pulls")))
            .bearer_auth(token)
            .json(pull)
            .send()?;
        debug!(
            status = %response.status(),
            head = %pull.head,
            base = %pull.base,
            "open pull request"
        );

        if response.status() != StatusCode::CREATED {
            return Err(api_error(response));
        }
        let created: CreatedPullRequest = response.json()?;
        Ok(created.html_url)
    }
}

/// Builds an `AppError::Api` carrying the most specific message GitHub sent
fn api_error(response: Response) -> AppError {
    let status = response.status().as_u16();
    let body = response.text().unwrap_or_default();
    AppError::Api {
        status,
        message: error_message(&body),
    }
}

/// Picks the detail messages out of a GitHub error body, falling back to the top-level message
pub fn error_message(body: &str) -> String {
    let parsed: ApiErrorBody = serde_json::from_str(body).unwrap_or_default();
    let details: Vec<String> = parsed
        .errors
        .iter()
        .filter_map(|detail| detail.message.clone().or_else(|| detail.code.clone()))
        .collect();

    if !details.is_empty() {
        details.join("; ")
    } else if !parsed.message.is_empty() {
        parsed.message
    } else if !body.trim().is_empty() {
        body.trim().to_string()
    } else {
        "no details provided".to_string()
    }
}

/// True when a creation failure means the repository name is already taken
pub fn is_name_taken(err: &AppError) -> bool {
    match err {
        AppError::Api { status, message } => {
            *status == 422 && message.to_lowercase().contains("already exists")
        }
        _ => false,
    }
}

/// In-memory forge, for tests
#[cfg(test)]
pub mod fake {
    use std::{
        cell::{Cell, RefCell},
        collections::HashMap,
    };

    use super::{Forge, Identity, NewPullRequest, NewRepository};
    use crate::error::AppError;

    #[derive(Default)]
    pub struct FakeForge {
        pub identities: HashMap<String, Identity>,
        pub created: RefCell<Vec<NewRepository>>,
        /// Returned by `create_repository` instead of a github.com URL
        pub clone_url: Option<String>,
        lookups: Cell<usize>,
    }

    impl FakeForge {
        pub fn with_identities(identities: HashMap<String, Identity>) -> Self {
            FakeForge {
                identities,
                ..Default::default()
            }
        }

        pub fn with_clone_url(url: &str) -> Self {
            FakeForge {
                clone_url: Some(url.to_string()),
                ..Default::default()
            }
        }

        pub fn lookups(&self) -> usize {
            self.lookups.get()
        }
    }

    impl Forge for FakeForge {
        fn current_user(&self, token: &str) -> Result<Option<Identity>, AppError> {
            self.lookups.set(self.lookups.get() + 1);
            Ok(self.identities.get(token).cloned())
        }

        fn create_repository(
            &self,
            _token: &str,
            repo: &NewRepository,
        ) -> Result<String, AppError> {
            self.created.borrow_mut().push(repo.clone());
            Ok(self
                .clone_url
                .clone()
                .unwrap_or_else(|| format!("https://github.com/fake/{}.git", repo.name)))
        }

        fn open_pull_request(
            &self,
            _token: &str,
            owner: &str,
            repo: &str,
            _pull: &NewPullRequest,
        ) -> Result<String, AppError> {
            Ok(format!("https://github.com/{owner}/{repo}/pull/1"))
        }
    }
}
