//! Removing a file from every commit in the repository's history.

use std::fs;

use tracing::debug;

use crate::{error::AppError, git::Git};

/// Wraps `text` in single quotes for `sh`
pub fn shell_quote(text: &str) -> String {
    format!("'{}'", text.replace('\'', r"'\''"))
}

/// Normalises a user supplied path to the repo-relative form git expects
pub fn normalize_path(path: &str) -> Result<String, AppError> {
    let path = path.trim().replace('\\', "/");
    let path = path.trim_start_matches("./").trim_end_matches('/');
    if path.is_empty() {
        return Err(AppError::Validation("Path cannot be empty".to_string()));
    }
    if path.starts_with('/') || path.split('/').any(|segment| segment == "..") {
        return Err(AppError::Validation(
            "Use a path inside this project, like 'config/secrets.json'".to_string(),
        ));
    }
    Ok(path.to_string())
}

/// Arguments for `git filter-branch` that drop `path` from all refs
pub fn filter_branch_args(path: &str) -> Vec<String> {
    let index_filter = format!("git rm -r --cached --ignore-unmatch -- {}", shell_quote(path));
    [
        "filter-branch",
        "--force",
        "--index-filter",
        index_filter.as_str(),
        "--prune-empty",
        "--tag-name-filter",
        "cat",
        "--",
        "--all",
    ]
    .map(String::from)
    .to_vec()
}

/// Rewrites history without `path`, then drops the backup refs and old objects.
///
/// A regular file at `path` is put back on disk afterwards, untracked.
pub fn purge_from_history(git: &Git, path: &str) -> Result<(), AppError> {
    let on_disk = git.dir().join(path);
    let saved = if on_disk.is_file() {
        Some(fs::read(&on_disk)?)
    } else {
        None
    };

    git.run_checked_with_env(
        &filter_branch_args(path),
        &[("FILTER_BRANCH_SQUELCH_WARNING", "1")],
    )?;
    debug!(%path, "history rewritten");

    if let Some(contents) = saved {
        if !on_disk.exists() {
            fs::write(&on_disk, contents)?;
        }
    }

    let originals = git.run_checked(&["for-each-ref", "--format=%(refname)", "refs/original/"])?;
    for reference in originals.lines().map(str::trim).filter(|r| !r.is_empty()) {
        git.run_checked(&["update-ref", "-d", reference])?;
    }
    git.run_checked(&["reflog", "expire", "--expire=now", "--all"])?;
    git.run_checked(&["gc", "--prune=now", "--quiet"])?;
    Ok(())
}
