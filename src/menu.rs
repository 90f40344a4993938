//! The guided backup wizard and the existing-project menu.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::{
    account::{ensure_commit_identity, select_profile},
    config::Settings,
    error::AppError,
    forge::{Forge, NewPullRequest, NewRepository, is_name_taken},
    git::Git,
    gitignore::{self, literal_pattern},
    profile::{CredentialStore, Profile},
    prompt::Prompter,
    purge::{normalize_path, purge_from_history},
    remediation::{Remediation, classify},
    remote::{embed_token, https_clone_url, parse_owner_repo},
    storage::load_store,
    ui,
    validation::{prompt_until_valid, validate_branch_name, validate_repo_name},
};

const REPO_DESCRIPTION: &str = "Backed up with git-autopilot";
const FIRST_COMMIT_MESSAGE: &str = "First upload";
const COPY_COMMIT_MESSAGE: &str = "Copied to a new project";
/// Upper bound on ignore-and-retry rounds for files git cannot index
const MAX_INDEX_RETRIES: usize = 5;

/// Actions offered for a folder that is already a repository
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    Upload,
    Download,
    CopyToNewRepo,
    Worktree,
    PullRequest,
    TidyGitignore,
    PurgeFile,
    SwitchAccount,
    Quit,
}

const ACTIONS: [(Action, &str); 9] = [
    (Action::Upload, "Save & upload my changes (commit & push)"),
    (Action::Download, "Download the latest changes (pull)"),
    (Action::CopyToNewRepo, "Copy to a brand new GitHub project (change remote)"),
    (Action::Worktree, "Safe playground folder (git worktree)"),
    (Action::PullRequest, "Ask to merge this branch (pull request)"),
    (Action::TidyGitignore, "Tidy up ignored files (.gitignore)"),
    (Action::PurgeFile, "Erase a secret file from history"),
    (Action::SwitchAccount, "Switch GitHub account"),
    (Action::Quit, "Quit"),
];

/// State threaded through one wizard run
pub struct Session<'a> {
    settings: &'a Settings,
    forge: &'a dyn Forge,
    prompter: &'a mut dyn Prompter,
    store: CredentialStore,
    profile: Profile,
    git: Git,
}

/// Runs the full wizard in `dir`
pub fn run_wizard(
    settings: &Settings,
    forge: &dyn Forge,
    prompter: &mut dyn Prompter,
    dir: &Path,
) -> Result<(), AppError> {
    let mut store = load_store(&settings.store_path, forge);
    let profile = select_profile(&mut store, &settings.store_path, forge, prompter)?;
    ui::success(&format!("Logged into GitHub as {}", profile.login));

    ui::plain("\nYou are currently inside this folder:");
    ui::info(&dir.display().to_string());
    if !prompter.confirm("Is this the folder you want to back up to GitHub?", true)? {
        ui::warning(
            "\nNo problem! Open a terminal inside the folder you want to save \
             and run git-autopilot again.",
        );
        return Ok(());
    }

    let git = Git::new(dir).with_secret(&profile.token);
    let is_repo = git.is_inside_work_tree()?;
    let mut session = Session {
        settings,
        forge,
        prompter,
        store,
        profile,
        git,
    };

    if is_repo {
        session.apply_identity()?;
        session.existing_project_menu()
    } else {
        session.new_project()
    }
}

impl Session<'_> {
    /// Sets this repository's commit identity from the active profile,
    /// asking for whatever the profile is missing
    fn apply_identity(&mut self) -> Result<(), AppError> {
        ensure_commit_identity(
            &mut self.store,
            &self.settings.store_path,
            &mut self.profile,
            &mut *self.prompter,
        )?;
        self.git.set_config("user.name", self.profile.commit_name())?;
        self.git.set_config("user.email", &self.profile.email)?;
        debug!(login = %self.profile.login, "applied commit identity");
        Ok(())
    }

    /// Push URL carrying the profile token, for HTTPS origins only
    fn auth_url(&self) -> Result<Option<String>, AppError> {
        Ok(self
            .git
            .remote_url("origin")?
            .filter(|url| url.starts_with("https://"))
            .map(|url| embed_token(&url, &self.profile.token)))
    }

    fn new_project(&mut self) -> Result<(), AppError> {
        ui::header("NEW PROJECT BACKUP");
        ui::plain("This folder hasn't been saved to GitHub before.");

        let question = "What do you want to call this project on GitHub?";
        let Some(repo_url) = self.create_repository(question)? else {
            return Ok(());
        };

        ui::info("Preparing your files for their first trip to the cloud (git init & git add)...");
        self.git.init()?;
        self.apply_identity()?;
        self.offer_gitignore()?;
        if !self.stage_all()? {
            return Ok(());
        }

        ui::plain("\nEvery save gets a short note (commit message) so you remember what changed.");
        let message = self
            .prompter
            .text("Type a short note (commit message):", Some(FIRST_COMMIT_MESSAGE))?;
        let message = non_empty_or(&message, FIRST_COMMIT_MESSAGE);
        let commit = self.git.commit(&message)?;
        if !commit.success && classify(&commit.output) != Remediation::NothingToCommit {
            ui::failure_with_output("Couldn't save your files (commit).", &commit.output);
            return Ok(());
        }

        self.git.rename_to_main()?;
        self.git.set_origin(&repo_url)?;

        ui::info("Uploading files to GitHub (git push)...");
        if self.push("main", true)? {
            ui::success("Your files are safely backed up on GitHub.");
        }
        Ok(())
    }

    /// Creates a repository, or reuses one that already has the chosen name.
    /// `None` when the user gives up.
    fn create_repository(&mut self, question: &str) -> Result<Option<String>, AppError> {
        let name = prompt_until_valid(&mut *self.prompter, question, None, validate_repo_name)?;
        let private = self
            .prompter
            .confirm("Should it be private (only you can see it)?", true)?;

        ui::info(&format!("Creating '{name}' on GitHub..."));
        let request = NewRepository {
            name: name.clone(),
            private,
            description: REPO_DESCRIPTION.to_string(),
        };
        match self.forge.create_repository(&self.profile.token, &request) {
            Ok(url) => {
                info!(%name, "created repository");
                ui::success("Project created on GitHub.");
                Ok(Some(url))
            }
            Err(err) if is_name_taken(&err) => {
                let existing = https_clone_url(&self.profile.login, &name);
                ui::warning(&format!("You already have a project called '{name}'."));
                if self
                    .prompter
                    .confirm(&format!("Connect this folder to {existing} instead?"), true)?
                {
                    Ok(Some(existing))
                } else {
                    Ok(None)
                }
            }
            Err(err) => {
                ui::failure(&format!("Couldn't create the project: {err}"));
                Ok(None)
            }
        }
    }

    fn existing_project_menu(&mut self) -> Result<(), AppError> {
        ui::header("EXISTING PROJECT FOUND");
        ui::plain("This folder is already tracked by git. What would you like to do?");

        let labels: Vec<String> = ACTIONS
            .iter()
            .enumerate()
            .map(|(index, (_, label))| format!("{}. {label}", index + 1))
            .collect();

        loop {
            let index = self.prompter.select("Choose an option", &labels)?;
            let action = ACTIONS.get(index).map_or(Action::Quit, |(action, _)| *action);
            if action == Action::Quit {
                ui::info("Leaving your project as it is. Bye!");
                return Ok(());
            }

            match self.perform(action) {
                Ok(()) => {}
                Err(err) if err.is_interrupt() => return Err(err),
                Err(err) if err.is_cancel() => ui::warning("Cancelled."),
                Err(AppError::GitCommand { command, output }) => {
                    ui::failure_with_output(&format!("git {command} failed."), &output);
                }
                Err(err) => ui::failure(&err.to_string()),
            }
        }
    }

    fn perform(&mut self, action: Action) -> Result<(), AppError> {
        debug!(?action, "menu action");
        match action {
            Action::Upload => self.upload(),
            Action::Download => self.download(),
            Action::CopyToNewRepo => self.copy_to_new_repo(),
            Action::Worktree => self.worktree(),
            Action::PullRequest => self.pull_request(),
            Action::TidyGitignore => self.tidy_gitignore(),
            Action::PurgeFile => self.purge_file(),
            Action::SwitchAccount => self.switch_account(),
            Action::Quit => Ok(()),
        }
    }

    /// Makes sure `origin` exists, offering to create a GitHub project when it doesn't
    fn ensure_origin(&mut self) -> Result<bool, AppError> {
        if self.git.remote_url("origin")?.is_some() {
            return Ok(true);
        }
        ui::warning("This folder isn't connected to GitHub yet.");
        if !self.prompter.confirm("Create a GitHub project for it now?", true)? {
            return Ok(false);
        }
        match self.create_repository("What do you want to call the project?")? {
            Some(url) => {
                self.git.set_origin(&url)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn upload(&mut self) -> Result<(), AppError> {
        if !self.ensure_origin()? || !self.stage_all()? {
            return Ok(());
        }
        let branch = self.git.current_branch()?;

        let message = self.prompter.text("What did you change? (commit message)", None)?;
        let message = non_empty_or(&message, "Update files");
        let commit = self.git.commit(&message)?;

        if !commit.success {
            if classify(&commit.output) == Remediation::NothingToCommit {
                ui::info("No new changes detected. Making sure GitHub is in sync...");
            } else {
                ui::failure_with_output("Couldn't save your changes (commit).", &commit.output);
                return Ok(());
            }
        }

        ui::info("Uploading (git push)...");
        if self.push(&branch, false)? {
            ui::success("Your changes are saved on GitHub.");
        }
        Ok(())
    }

    fn download(&mut self) -> Result<(), AppError> {
        if self.git.remote_url("origin")?.is_none() {
            ui::warning("This folder isn't connected to GitHub, there is nothing to download.");
            return Ok(());
        }
        let branch = self.git.current_branch()?;
        ui::info(&format!("Downloading the latest '{branch}' from GitHub (git pull)..."));
        let auth_url = self.auth_url()?;
        let pulled = self.git.pull(auth_url.as_deref(), &branch)?;
        if pulled.success {
            ui::success("You're up to date.");
        } else if classify(&pulled.output) == Remediation::AuthFailed {
            self.explain_auth_failure();
        } else {
            ui::failure_with_output("Couldn't download the changes (pull).", &pulled.output);
        }
        Ok(())
    }

    fn copy_to_new_repo(&mut self) -> Result<(), AppError> {
        ui::plain(
            "\nWe'll upload your files as a brand new GitHub project and point this folder at it.",
        );
        let Some(url) = self.create_repository("What do you want to call the NEW project?")?
        else {
            return Ok(());
        };

        self.git.set_origin(&url)?;
        if !self.stage_all()? {
            return Ok(());
        }
        let commit = self.git.commit(COPY_COMMIT_MESSAGE)?;
        if !commit.success && classify(&commit.output) != Remediation::NothingToCommit {
            ui::failure_with_output("Couldn't save your files (commit).", &commit.output);
            return Ok(());
        }
        self.git.rename_to_main()?;

        ui::info("Uploading to the new project (git push)...");
        if self.push("main", true)? {
            ui::success("You now have a fresh copy online.");
        }
        Ok(())
    }

    fn worktree(&mut self) -> Result<(), AppError> {
        ui::header("SAFE PLAYGROUND (GIT WORKTREE)");
        ui::plain(
            "A worktree is a second folder linked to the same project but on its own branch.",
        );
        ui::plain("Break anything you like in there, your original folder stays untouched.\n");

        let branch = prompt_until_valid(
            &mut *self.prompter,
            "Short name for the experiment (e.g. new-button-test):",
            None,
            validate_branch_name,
        )?;
        let base = self.git.current_branch()?;
        let Some(path) = worktree_path(self.git.dir(), &branch) else {
            ui::failure("This folder has no parent folder to put the playground in.");
            return Ok(());
        };

        ui::info(&format!("Creating your playground at {}...", path.display()));
        let created = self.git.add_worktree(&branch, &path, &base)?;
        if created.success {
            ui::success("Playground created.");
            ui::plain(&format!("Open {} to experiment safely.", path.display()));
        } else {
            ui::failure_with_output(
                "Couldn't create the playground. \
                 Save (commit) your changes first and pick an unused name.",
                &created.output,
            );
        }
        Ok(())
    }

    fn pull_request(&mut self) -> Result<(), AppError> {
        let Some(origin) = self.git.remote_url("origin")? else {
            ui::warning("This folder isn't connected to GitHub yet. Upload it first.");
            return Ok(());
        };
        let Some(remote) = parse_owner_repo(&origin) else {
            ui::failure(&format!("'{origin}' is not a GitHub project."));
            return Ok(());
        };

        let head = self.git.current_branch()?;
        let base = self.prompter.text("Merge into which branch?", Some("main"))?;
        let base = non_empty_or(&base, "main");
        if base == head {
            ui::warning(&format!(
                "You're on '{head}'. \
                 Switch to another branch (or make a playground) before asking to merge."
            ));
            return Ok(());
        }

        let last_subject = self
            .git
            .run(&["log", "-1", "--format=%s"])?
            .output
            .trim()
            .to_string();
        let title = self
            .prompter
            .text("Title for the request:", Some(last_subject.as_str()).filter(|s| !s.is_empty()))?;
        let title = non_empty_or(&title, &head);
        let body = self.prompter.text("Describe the change (optional):", Some(""))?;

        ui::info(&format!("Uploading '{head}' first (git push)..."));
        if !self.push(&head, true)? {
            return Ok(());
        }

        let request = NewPullRequest {
            title,
            head: head.clone(),
            base,
            body,
        };
        match self
            .forge
            .open_pull_request(&self.profile.token, &remote.owner, &remote.repo, &request)
        {
            Ok(url) => {
                ui::success("Pull request opened.");
                ui::plain(&format!("View it here: {url}"));
            }
            Err(AppError::Api { status: 422, message }) => {
                ui::failure(&format!("GitHub didn't accept the pull request: {message}"));
            }
            Err(err) => return Err(err),
        }
        Ok(())
    }

    fn tidy_gitignore(&mut self) -> Result<(), AppError> {
        self.offer_gitignore()?;

        let tracked = self.git.tracked_but_ignored()?;
        if tracked.is_empty() {
            ui::success("No ignored files are being uploaded.");
            return Ok(());
        }
        ui::warning("These files are ignored but were already saved in git:");
        ui::numbered(&tracked, None);
        if self
            .prompter
            .confirm("Stop tracking them? (they stay on your computer)", true)?
        {
            self.git.untrack(&tracked)?;
            ui::success("Done. Save & upload to remove them from the latest version on GitHub.");
            ui::plain(
                "They are still in older history; \
                 use 'Erase a secret file from history' for secrets.",
            );
        }
        Ok(())
    }

    /// Offers to add recommended ignore patterns
    fn offer_gitignore(&mut self) -> Result<(), AppError> {
        let missing = gitignore::missing_recommended(self.git.dir())?;
        if missing.is_empty() {
            return Ok(());
        }
        ui::plain("\nA .gitignore file keeps passwords, keys and clutter from being uploaded.");
        ui::plain(&format!("Suggested additions: {}", missing.join(" ")));
        if self.prompter.confirm("Add them to .gitignore?", true)? {
            let added = gitignore::ensure_patterns(self.git.dir(), &missing)?;
            ui::success(&format!("Added {added} patterns to .gitignore."));
        }
        Ok(())
    }

    fn purge_file(&mut self) -> Result<(), AppError> {
        ui::header("ERASE A FILE FROM HISTORY");
        ui::warning(
            "This rewrites every saved version of the project. Save (commit) your work first.",
        );
        ui::warning(
            "If the file held a password or token, change that password too: \
             it may already be copied.",
        );

        let path = prompt_until_valid(
            &mut *self.prompter,
            "Path of the file to erase (e.g. config/secrets.json):",
            None,
            normalize_path,
        )?;
        if !self
            .prompter
            .confirm(&format!("Really erase '{path}' from all history?"), false)?
        {
            return Err(AppError::Cancelled);
        }

        ui::info("Rewriting history, this can take a while...");
        purge_from_history(&self.git, &path)?;
        gitignore::ensure_patterns(self.git.dir(), &[literal_pattern(&path).as_str()])?;
        ui::success(&format!("'{path}' is gone from local history and now ignored."));

        if self.git.remote_url("origin")?.is_some()
            && self
                .prompter
                .confirm("Overwrite the history on GitHub too (force push)?", false)?
        {
            let auth_url = self.auth_url()?;
            let pushed = self.git.force_push_all(auth_url.as_deref())?;
            if pushed.success {
                ui::success("GitHub history updated.");
            } else {
                ui::failure_with_output("Couldn't overwrite GitHub history.", &pushed.output);
            }
        }
        Ok(())
    }

    fn switch_account(&mut self) -> Result<(), AppError> {
        let profile = select_profile(
            &mut self.store,
            &self.settings.store_path,
            self.forge,
            &mut *self.prompter,
        )?;
        self.git = Git::new(self.git.dir()).with_secret(&profile.token);
        self.profile = profile;
        self.apply_identity()?;
        ui::success(&format!("Now working as {}", self.profile.login));
        Ok(())
    }

    /// `git add .`, ignoring files git cannot index when the user agrees
    fn stage_all(&mut self) -> Result<bool, AppError> {
        for _ in 0..MAX_INDEX_RETRIES {
            let added = self.git.add_all()?;
            if added.success {
                return Ok(true);
            }
            match classify(&added.output) {
                Remediation::UnindexableFile(path) => {
                    ui::warning(&format!("Git can't read '{path}'."));
                    if !self
                        .prompter
                        .confirm("Skip it by adding it to .gitignore?", true)?
                    {
                        ui::failure_with_output(
                            "Couldn't select your files (git add).",
                            &added.output,
                        );
                        return Ok(false);
                    }
                    gitignore::ensure_patterns(self.git.dir(), &[literal_pattern(&path).as_str()])?;
                }
                _ => {
                    ui::failure_with_output("Couldn't select your files (git add).", &added.output);
                    return Ok(false);
                }
            }
        }
        ui::failure("Too many unreadable files. Check the folder and try again.");
        Ok(false)
    }

    /// Authenticated push with the rejected-push and auth remediations
    fn push(&mut self, branch: &str, set_upstream: bool) -> Result<bool, AppError> {
        let auth_url = self.auth_url()?;
        let pushed = self.git.push(auth_url.as_deref(), branch, set_upstream)?;
        if pushed.success {
            return Ok(true);
        }

        match classify(&pushed.output) {
            Remediation::PushRejected => {
                ui::warning("GitHub has changes you don't have yet.");
                if !self
                    .prompter
                    .confirm("Download them first (pull) and try again?", true)?
                {
                    return Ok(false);
                }
                let pulled = self.git.pull(auth_url.as_deref(), branch)?;
                if !pulled.success {
                    ui::failure_with_output(
                        "Couldn't combine the changes automatically. \
                         Fix the conflicts, then upload again.",
                        &pulled.output,
                    );
                    return Ok(false);
                }
                let retried = self.git.push(auth_url.as_deref(), branch, set_upstream)?;
                if !retried.success {
                    ui::failure_with_output("Upload (push) failed.", &retried.output);
                }
                Ok(retried.success)
            }
            Remediation::AuthFailed => {
                self.explain_auth_failure();
                Ok(false)
            }
            _ => {
                ui::failure_with_output(
                    "Upload (push) failed. Check your internet connection.",
                    &pushed.output,
                );
                Ok(false)
            }
        }
    }

    fn explain_auth_failure(&self) {
        ui::failure(&format!(
            "GitHub refused the token for '{}'. It may have expired or lack the 'repo' scope.",
            self.profile.login
        ));
        ui::plain(
            "Run `git-autopilot add` to save a fresh token, or pick 'Switch GitHub account'.",
        );
    }
}

/// `<parent>/<folder>-<branch>`, with `/` in the branch flattened to `-`
pub fn worktree_path(dir: &Path, branch: &str) -> Option<PathBuf> {
    let parent = dir.parent()?;
    let folder = dir.file_name()?.to_string_lossy();
    Some(parent.join(format!("{folder}-{}", branch.replace('/', "-"))))
}

fn non_empty_or(value: &str, fallback: &str) -> String {
    let value = value.trim();
    if value.is_empty() {
        fallback.to_string()
    } else {
        value.to_string()
    }
}
