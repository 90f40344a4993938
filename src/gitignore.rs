//! Keeping secrets and clutter out of commits.

use std::{fs, io::ErrorKind, path::Path};

use crate::error::AppError;

pub const GITIGNORE_FILE: &str = ".gitignore";

/// Comment written above patterns this tool appends
pub const MARKER: &str = "# Added by git-autopilot";

/// Patterns every beginner project should ignore
pub const RECOMMENDED: &[&str] = &[
    // secrets
    ".env",
    ".env.*",
    "*.pem",
    "*.key",
    "*.p12",
    "*.pfx",
    "id_rsa",
    "id_ed25519",
    "credentials.json",
    "secrets.json",
    // OS and editor noise
    ".DS_Store",
    "Thumbs.db",
    "desktop.ini",
    ".vscode/",
    ".idea/",
    "*.swp",
    // dependencies and build output
    "node_modules/",
    "__pycache__/",
    "*.pyc",
    ".venv/",
    "venv/",
    "dist/",
    "build/",
    "target/",
];

/// Patterns from `wanted` that no active line of `existing` already lists
pub fn missing_patterns<'a>(existing: &str, wanted: &[&'a str]) -> Vec<&'a str> {
    let present: Vec<&str> = existing
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .collect();

    wanted
        .iter()
        .copied()
        .filter(|pattern| !present.contains(pattern))
        .collect()
}

/// Appends `patterns` under the marker comment, keeping existing content intact
pub fn append_patterns(existing: &str, patterns: &[&str]) -> String {
    if patterns.is_empty() {
        return existing.to_string();
    }

    let mut updated = existing.to_string();
    if !updated.is_empty() && !updated.ends_with('\n') {
        updated.push('\n');
    }
    if !updated.is_empty() {
        updated.push('\n');
    }
    updated.push_str(MARKER);
    updated.push('\n');
    for pattern in patterns {
        updated.push_str(pattern);
        updated.push('\n');
    }
    updated
}

/// Escapes a literal path so git does not read it as a glob, anchored to the repo root
pub fn literal_pattern(path: &str) -> String {
    let mut pattern = String::from("/");
    for c in path.trim_start_matches("./").trim_start_matches('/').chars() {
        if matches!(c, '*' | '?' | '[' | ']' | '!' | '#' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern
}

fn read(dir: &Path) -> Result<String, AppError> {
    match fs::read_to_string(dir.join(GITIGNORE_FILE)) {
        Ok(contents) => Ok(contents),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(String::new()),
        Err(err) => Err(err.into()),
    }
}

/// Recommended patterns the project's .gitignore lacks
pub fn missing_recommended(dir: &Path) -> Result<Vec<&'static str>, AppError> {
    Ok(missing_patterns(&read(dir)?, RECOMMENDED))
}

/// Adds any of `patterns` not already present; returns how many were written
pub fn ensure_patterns(dir: &Path, patterns: &[&str]) -> Result<usize, AppError> {
    let existing = read(dir)?;
    let missing = missing_patterns(&existing, patterns);
    if !missing.is_empty() {
        fs::write(dir.join(GITIGNORE_FILE), append_patterns(&existing, &missing))?;
    }
    Ok(missing.len())
}
