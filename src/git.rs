use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
    process::{Command, Output},
};

use tracing::debug;

use crate::{error::AppError, remote::redact_credentials};

/// Exit status plus stdout and stderr joined into one text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitOutput {
    pub success: bool,
    pub output: String,
}

/// Runs git inside one working directory
#[derive(Debug, Clone)]
pub struct Git {
    dir: PathBuf,
    secret: Option<String>,
}

/// Checks that git can be executed and returns its version line
pub fn check_installed() -> Result<String, AppError> {
    let git_command_output = Command::new("git").arg("--version").output().map_err(spawn_error)?;
    if !git_command_output.status.success() {
        return Err(AppError::GitMissing);
    }
    Ok(String::from_utf8_lossy(&git_command_output.stdout).trim().to_string())
}

fn spawn_error(err: std::io::Error) -> AppError {
    if err.kind() == ErrorKind::NotFound {
        AppError::GitMissing
    } else {
        AppError::Io(err)
    }
}

impl Git {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Git {
            dir: dir.into(),
            secret: None,
        }
    }

    /// Scrubs `token` from every logged argument and captured output
    pub fn with_secret(mut self, token: &str) -> Self {
        if !token.is_empty() {
            self.secret = Some(token.to_string());
        }
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn scrub(&self, text: &str) -> String {
        let text = match &self.secret {
            Some(secret) => text.replace(secret.as_str(), "***"),
            None => text.to_string(),
        };
        redact_credentials(&text)
    }

    /// Runs git and captures its output. Only failing to start git is an error.
    pub fn run<S: AsRef<str>>(&self, args: &[S]) -> Result<GitOutput, AppError> {
        self.run_with_env(args, &[])
    }

    /// Like [`Git::run`] with extra environment variables for the child
    pub fn run_with_env<S: AsRef<str>>(
        &self,
        args: &[S],
        env: &[(&str, &str)],
    ) -> Result<GitOutput, AppError> {
        let shown = self.scrub(&args.iter().map(|a| a.as_ref()).collect::<Vec<_>>().join(" "));
        debug!(dir = %self.dir.display(), "git {shown}");

        let git_command_output: Output = Command::new("git")
            .args(args.iter().map(|a| a.as_ref()))
            .envs(env.iter().copied())
            .current_dir(&self.dir)
            .output()
            .map_err(spawn_error)?;

        let stdout = String::from_utf8_lossy(&git_command_output.stdout);
        let stderr = String::from_utf8_lossy(&git_command_output.stderr);
        let output = self.scrub(format!("{stdout}\n{stderr}").trim());
        let success = git_command_output.status.success();
        debug!(success, "git {shown} finished");

        Ok(GitOutput { success, output })
    }

    /// Runs git and turns a non-zero exit into `AppError::GitCommand`
    pub fn run_checked<S: AsRef<str>>(&self, args: &[S]) -> Result<String, AppError> {
        let result = self.run(args)?;
        into_checked(args, result)
    }

    /// Like [`Git::run_checked`] with extra environment variables for the child
    pub fn run_checked_with_env<S: AsRef<str>>(
        &self,
        args: &[S],
        env: &[(&str, &str)],
    ) -> Result<String, AppError> {
        let result = self.run_with_env(args, env)?;
        into_checked(args, result)
    }

    /// Checks if the directory is inside a Git work tree
    pub fn is_inside_work_tree(&self) -> Result<bool, AppError> {
        let result = self.run(&["rev-parse", "--is-inside-work-tree"])?;
        Ok(result.success && result.output.trim() == "true")
    }

    /// Current branch, `main` when HEAD is detached or unborn without a name
    pub fn current_branch(&self) -> Result<String, AppError> {
        let result = self.run(&["branch", "--show-current"])?;
        let branch = result.output.trim();
        if result.success && !branch.is_empty() {
            Ok(branch.to_string())
        } else {
            Ok("main".to_string())
        }
    }

    /// URL of a remote, if it exists
    pub fn remote_url(&self, name: &str) -> Result<Option<String>, AppError> {
        let result = self.run(&["remote", "get-url", name])?;
        let url = result.output.trim();
        Ok((result.success && !url.is_empty()).then(|| url.to_string()))
    }

    /// Executes Git config get command; `None` when unset
    pub fn get_config(&self, key: &str) -> Result<Option<String>, AppError> {
        let result = self.run(&["config", "--get", key])?;
        let value = result.output.trim();
        Ok((result.success && !value.is_empty()).then(|| value.to_string()))
    }

    /// Executes a local Git config set command
    pub fn set_config(&self, key: &str, value: &str) -> Result<(), AppError> {
        self.run_checked(&["config", key, value])?;
        Ok(())
    }

    pub fn init(&self) -> Result<(), AppError> {
        self.run_checked(&["init"])?;
        Ok(())
    }

    pub fn add_all(&self) -> Result<GitOutput, AppError> {
        self.run(&["add", "."])
    }

    pub fn commit(&self, message: &str) -> Result<GitOutput, AppError> {
        self.run(&["commit", "-m", message])
    }

    /// Renames the current branch to `main`
    pub fn rename_to_main(&self) -> Result<(), AppError> {
        self.run_checked(&["branch", "-M", "main"])?;
        Ok(())
    }

    /// Points `origin` at `url`, replacing any previous origin
    pub fn set_origin(&self, url: &str) -> Result<(), AppError> {
        if self.remote_url("origin")?.is_some() {
            self.run_checked(&["remote", "remove", "origin"])?;
        }
        self.run_checked(&["remote", "add", "origin", url])?;
        Ok(())
    }

    pub fn push(
        &self,
        auth_url: Option<&str>,
        branch: &str,
        set_upstream: bool,
    ) -> Result<GitOutput, AppError> {
        self.run(&push_args(auth_url, branch, set_upstream))
    }

    /// Pushes every branch, overwriting the remote's history
    pub fn force_push_all(&self, auth_url: Option<&str>) -> Result<GitOutput, AppError> {
        let mut args = auth_config(auth_url);
        args.extend(["push", "origin", "--force", "--all"].map(String::from));
        self.run(&args)
    }

    pub fn pull(&self, auth_url: Option<&str>, branch: &str) -> Result<GitOutput, AppError> {
        self.run(&pull_args(auth_url, branch))
    }

    /// Creates a worktree at `path` on a new branch started from `base`
    pub fn add_worktree(
        &self,
        branch: &str,
        path: &Path,
        base: &str,
    ) -> Result<GitOutput, AppError> {
        let path = path.to_string_lossy();
        self.run(&["worktree", "add", "-b", branch, &*path, base])
    }

    /// Tracked files that the current ignore rules would exclude
    pub fn tracked_but_ignored(&self) -> Result<Vec<String>, AppError> {
        let output = self.run_checked(&["ls-files", "-ci", "--exclude-standard"])?;
        Ok(output
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(String::from)
            .collect())
    }

    /// Stops tracking `paths` while keeping them on disk
    pub fn untrack(&self, paths: &[String]) -> Result<(), AppError> {
        let mut args = vec!["rm", "-r", "--cached", "--quiet", "--"];
        args.extend(paths.iter().map(String::as_str));
        self.run_checked(&args)?;
        Ok(())
    }
}

fn into_checked<S: AsRef<str>>(args: &[S], result: GitOutput) -> Result<String, AppError> {
    if result.success {
        return Ok(result.output);
    }
    // first bare word is the subcommand; skips `-c key=value`
    let command = args
        .iter()
        .map(|a| a.as_ref())
        .find(|a| !a.starts_with('-') && !a.contains('='))
        .unwrap_or_default()
        .to_string();
    Err(AppError::GitCommand {
        command,
        output: result.output,
    })
}

/// `-c remote.origin.pushurl=<auth_url>` so origin keeps its clean URL on disk
fn auth_config(auth_url: Option<&str>) -> Vec<String> {
    match auth_url {
        Some(url) => vec!["-c".to_string(), format!("remote.origin.pushurl={url}")],
        None => Vec::new(),
    }
}

pub fn push_args(auth_url: Option<&str>, branch: &str, set_upstream: bool) -> Vec<String> {
    let mut args = auth_config(auth_url);
    args.push("push".to_string());
    if set_upstream {
        args.push("-u".to_string());
    }
    args.push("origin".to_string());
    args.push(branch.to_string());
    args
}

pub fn pull_args(auth_url: Option<&str>, branch: &str) -> Vec<String> {
    vec![
        "pull".to_string(),
        "--no-rebase".to_string(),
        auth_url.unwrap_or("origin").to_string(),
        branch.to_string(),
    ]
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;

    fn git_available() -> bool {
        check_installed().is_ok()
    }

    fn scratch_repo() -> (TempDir, Git) {
        let dir = TempDir::new().unwrap();
        let git = Git::new(dir.path());
        git.init().unwrap();
        git.set_config("user.name", "Test").unwrap();
        git.set_config("user.email", "test@example.com").unwrap();
        (dir, git)
    }

    #[test]
    fn push_args_use_pushurl_override() {
        assert_eq!(
            push_args(Some("https://t@github.com/a/b.git"), "main", true),
            vec![
                "-c",
                "remote.origin.pushurl=https://t@github.com/a/b.git",
                "push",
                "-u",
                "origin",
                "main"
            ]
        );
        assert_eq!(push_args(None, "dev", false), vec!["push", "origin", "dev"]);
    }

    #[test]
    fn pull_args_fall_back_to_origin() {
        assert_eq!(pull_args(None, "main"), vec!["pull", "--no-rebase", "origin", "main"]);
        assert_eq!(
            pull_args(Some("https://t@github.com/a/b.git"), "dev")[2],
            "https://t@github.com/a/b.git"
        );
    }

    #[test]
    fn secret_is_scrubbed_from_output() {
        if !git_available() {
            return;
        }
        let dir = TempDir::new().unwrap();
        let git = Git::new(dir.path()).with_secret("s3cr3t");
        let result = git.run(&["definitely-not-a-command-s3cr3t"]).unwrap();
        assert!(!result.success);
        assert!(!result.output.contains("s3cr3t"));
    }

    #[test]
    fn plain_directory_is_not_a_work_tree() {
        if !git_available() {
            return;
        }
        let dir = TempDir::new().unwrap();
        assert!(!Git::new(dir.path()).is_inside_work_tree().unwrap());
    }

    #[test]
    fn init_commit_and_remote_round_trip() {
        if !git_available() {
            return;
        }
        let (dir, git) = scratch_repo();
        assert!(git.is_inside_work_tree().unwrap());

        fs::write(dir.path().join("notes.txt"), "hello").unwrap();
        assert!(git.add_all().unwrap().success);
        assert!(git.commit("first").unwrap().success);
        git.rename_to_main().unwrap();
        assert_eq!(git.current_branch().unwrap(), "main");

        let second = git.commit("again").unwrap();
        assert!(!second.success);
        assert!(second.output.to_lowercase().contains("nothing to commit"));

        assert_eq!(git.remote_url("origin").unwrap(), None);
        git.set_origin("https://github.com/a/b.git").unwrap();
        git.set_origin("https://github.com/a/c.git").unwrap();
        assert_eq!(
            git.remote_url("origin").unwrap().as_deref(),
            Some("https://github.com/a/c.git")
        );
    }

    #[test]
    fn tracked_ignored_files_can_be_untracked() {
        if !git_available() {
            return;
        }
        let (dir, git) = scratch_repo();
        fs::write(dir.path().join(".env"), "SECRET=1").unwrap();
        fs::write(dir.path().join("app.txt"), "code").unwrap();
        git.add_all().unwrap();
        git.commit("first").unwrap();

        fs::write(dir.path().join(".gitignore"), ".env\n").unwrap();
        assert_eq!(git.tracked_but_ignored().unwrap(), vec![".env"]);

        git.untrack(&[".env".to_string()]).unwrap();
        assert!(git.tracked_but_ignored().unwrap().is_empty());
        assert!(dir.path().join(".env").exists());
    }

    #[test]
    fn failing_checked_command_reports_output() {
        if !git_available() {
            return;
        }
        let (_dir, git) = scratch_repo();
        match git.run_checked(&["remote", "remove", "nope"]) {
            Err(AppError::GitCommand { command, output }) => {
                assert_eq!(command, "remote");
                assert!(!output.is_empty());
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
