//! Parsing GitHub remote URLs and embedding tokens into them.
//!
//! Pure functions: no I/O, no network.

use std::sync::LazyLock;

use regex::Regex;
use url::Url;

/// Host recognised as the forge
pub const FORGE_HOST: &str = "github.com";

static CREDENTIAL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"https://[^/@\s'"]+@"#).expect("Failed to compile credential regex")
});

/// Owner and repository parsed from a remote URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteDescriptor {
    pub owner: String,
    pub repo: String,
}

/// Extracts `(owner, repo)` from an HTTPS or SSH GitHub remote URL.
///
/// Returns `None` when the host is absent or the path has fewer than two segments.
pub fn parse_owner_repo(url: &str) -> Option<RemoteDescriptor> {
    let url = url.trim();
    if !url.contains(FORGE_HOST) {
        return None;
    }

    if url.contains("://") {
        let parsed = Url::parse(url).ok()?;
        if !parsed.host_str()?.contains(FORGE_HOST) {
            return None;
        }
        owner_repo(parsed.path_segments()?)
    } else {
        // git@github.com:owner/repo.git
        owner_repo(url.rsplit_once(':')?.1.split('/'))
    }
}

fn owner_repo<'a>(segments: impl Iterator<Item = &'a str>) -> Option<RemoteDescriptor> {
    let mut segments = segments.filter(|s| !s.is_empty());
    let owner = segments.next()?;
    let repo = segments.next()?;
    let repo = repo.strip_suffix(".git").unwrap_or(repo);
    if repo.is_empty() {
        return None;
    }

    Some(RemoteDescriptor {
        owner: owner.to_string(),
        repo: repo.to_string(),
    })
}

/// Rewrites an HTTPS URL to carry `token` as its credential.
///
/// Any credential already present is replaced. Non-HTTPS URLs are returned unchanged.
pub fn embed_token(url: &str, token: &str) -> String {
    if !url.starts_with("https://") {
        return url.to_string();
    }
    let Ok(mut parsed) = Url::parse(url) else {
        return url.to_string();
    };
    if parsed.set_password(None).is_err() || parsed.set_username(token).is_err() {
        return url.to_string();
    }
    parsed.to_string()
}

/// Replaces any credential embedded in an HTTPS URL with `***`.
pub fn redact_credentials(text: &str) -> String {
    CREDENTIAL_REGEX.replace_all(text, "https://***@").into_owned()
}

/// Clone URL for a repository owned by `login`
pub fn https_clone_url(login: &str, repo: &str) -> String {
    format!("https://{FORGE_HOST}/{login}/{repo}.git")
}
