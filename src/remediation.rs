//! Classifies git output into the fixes the wizard knows how to offer.

/// What went wrong, as far as the wizard can tell from git's output
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Remediation {
    /// Commit had nothing staged; the branch may still need pushing
    NothingToCommit,
    /// `git add` choked on a file that should probably be ignored
    UnindexableFile(String),
    /// Remote has commits we don't; pull before pushing
    PushRejected,
    /// Token missing, expired, or lacking the `repo` scope
    AuthFailed,
    /// Nothing recognised
    Unknown,
}

/// Picks a remediation for the combined output of a failed git command
pub fn classify(output: &str) -> Remediation {
    let lower = output.to_lowercase();

    if lower.contains("nothing to commit") || lower.contains("no changes added to commit") {
        return Remediation::NothingToCommit;
    }
    if let Some(path) = unindexable_path(output) {
        return Remediation::UnindexableFile(path);
    }
    if lower.contains("[rejected]")
        && (lower.contains("fetch first") || lower.contains("non-fast-forward"))
    {
        return Remediation::PushRejected;
    }
    if lower.contains("authentication failed")
        || lower.contains("invalid username or password")
        || lower.contains("the requested url returned error: 403")
        || lower.contains("permission to")
    {
        return Remediation::AuthFailed;
    }
    Remediation::Unknown
}

/// Extracts the offending path from `error: unable to index file 'path'` or from
/// `error: 'path/' does not have a commit checked out` (a nested repository).
pub fn unindexable_path(output: &str) -> Option<String> {
    const UNABLE_TO_INDEX: &str = "unable to index file";
    const NO_COMMIT: &str = "does not have a commit checked out";

    output.lines().find_map(|line| {
        // ascii-only lowering keeps byte offsets valid for `line`
        let lower = line.to_ascii_lowercase();
        let raw = if let Some(at) = lower.find(UNABLE_TO_INDEX) {
            &line[at + UNABLE_TO_INDEX.len()..]
        } else {
            let at = lower.find(NO_COMMIT)?;
            let head = &line[..at];
            let start = lower[..at].find("error:").map_or(0, |i| i + "error:".len());
            &head[start..]
        };
        clean_path(raw)
    })
}

fn clean_path(raw: &str) -> Option<String> {
    let raw = raw.trim().trim_end_matches('.');
    let path = raw
        .strip_prefix('\'')
        .and_then(|r| r.strip_suffix('\''))
        .unwrap_or(raw)
        .trim_end_matches('/');
    (!path.is_empty()).then(|| path.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nothing_to_commit() {
        let output = "On branch main\nnothing to commit, working tree clean";
        assert_eq!(classify(output), Remediation::NothingToCommit);
    }

    #[test]
    fn unindexable_file_path_is_extracted() {
        let output = "error: open(\"vendor/lib\"): Permission denied\n\
                      error: unable to index file 'vendor/lib/'\n\
                      fatal: adding files failed";
        assert_eq!(
            classify(output),
            Remediation::UnindexableFile("vendor/lib".to_string())
        );
        assert_eq!(
            unindexable_path("error: unable to index file nul"),
            Some("nul".to_string())
        );
        assert_eq!(unindexable_path("fatal: adding files failed"), None);
    }

    #[test]
    fn non_ascii_prefix_keeps_the_whole_path() {
        assert_eq!(
            unindexable_path("İİİİ error: unable to index file 'secret.txt'"),
            Some("secret.txt".to_string())
        );
    }

    #[test]
    fn nested_repository_is_unindexable() {
        let output = "error: 'sub/' does not have a commit checked out\n\
                      fatal: adding files failed";
        assert_eq!(
            classify(output),
            Remediation::UnindexableFile("sub".to_string())
        );
    }

    #[test]
    fn rejected_push() {
        let output = " ! [rejected]        main -> main (fetch first)\n\
                      error: failed to push some refs to 'https://github.com/a/b.git'";
        assert_eq!(classify(output), Remediation::PushRejected);
    }

    #[test]
    fn auth_failures() {
        assert_eq!(
            classify("fatal: Authentication failed for 'https://github.com/a/b.git/'"),
            Remediation::AuthFailed
        );
        assert_eq!(
            classify("remote: Permission to a/b.git denied to bob."),
            Remediation::AuthFailed
        );
    }

    #[test]
    fn unknown_output() {
        assert_eq!(classify("fatal: something odd"), Remediation::Unknown);
    }
}
