//! # git-autopilot
//!
//! Walks a beginner through backing up a folder to GitHub: token login,
//! repository creation, commit & push, `.gitignore` hygiene, worktrees,
//! pull requests and erasing secrets from history.
//!
//! Run with no arguments for the guided wizard. Set `GIT_AUTOPILOT_LOG=debug`
//! to see what git and GitHub are being asked to do.

use std::{env, process::ExitCode};

use clap::Parser;
use colored::Colorize;
use tracing::debug;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use crate::{
    account::{add_profile, delete_profile, switch_profile},
    cli::{Cli, Commands},
    config::{LOG_ENV, Settings},
    error::AppError,
    forge::{Forge, GitHubClient},
    git::Git,
    prompt::TerminalPrompter,
    storage::load_store,
};

mod account;
mod cli;
mod config;
mod error;
mod forge;
mod git;
mod gitignore;
mod menu;
mod profile;
mod prompt;
mod purge;
mod remediation;
mod remote;
mod storage;
mod ui;
mod validation;

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) if err.is_interrupt() => {
            ui::warning("\nGoodbye!");
            ExitCode::SUCCESS
        }
        Err(err) if err.is_cancel() => {
            ui::warning("Cancelled.");
            ExitCode::SUCCESS
        }
        Err(AppError::GitMissing) => {
            ui::failure("It looks like Git isn't installed on this computer yet.");
            ui::plain("Git is the engine that keeps your file history.");
            ui::plain(
                "Download and install it from https://git-scm.com/downloads, then run this again.",
            );
            ExitCode::FAILURE
        }
        Err(err) => {
            ui::failure(&err.to_string());
            ExitCode::FAILURE
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn run(cli: Cli) -> Result<(), AppError> {
    let settings = Settings::from_env()?;
    debug!(store = %settings.store_path.display(), api = %settings.api_url, "settings resolved");
    let forge = GitHubClient::new(&settings.api_url)?;

    match cli.command {
        Some(Commands::List) => list_profiles(&settings, &forge),
        Some(Commands::Add) => {
            let mut store = load_store(&settings.store_path, &forge);
            add_profile(&mut store, &settings.store_path, &forge, &mut TerminalPrompter)?;
            Ok(())
        }
        Some(Commands::Switch { login }) => {
            let mut store = load_store(&settings.store_path, &forge);
            switch_profile(&mut store, &settings.store_path, &login)?;
            ui::success(&format!("switched to {login}"));
            Ok(())
        }
        Some(Commands::Delete { login }) => {
            let mut store = load_store(&settings.store_path, &forge);
            delete_profile(&mut store, &settings.store_path, &login)?;
            ui::success(&format!("deleted {login}"));
            Ok(())
        }
        Some(Commands::Current) => show_current(&settings, &forge),
        None => {
            ui::banner();
            let version = git::check_installed()?;
            debug!(%version, "git found");
            let dir = env::current_dir()?;
            menu::run_wizard(&settings, &forge, &mut TerminalPrompter, &dir)
        }
    }
}

/// Lists all saved logins, marking the default
fn list_profiles(settings: &Settings, forge: &dyn Forge) -> Result<(), AppError> {
    let store = load_store(&settings.store_path, forge);
    if store.is_empty() {
        ui::warning("no saved accounts, run `git-autopilot add` to save one");
        return Ok(());
    }

    let default = store.default_login();
    for profile in store.profiles.values() {
        let marker = if Some(profile.login.as_str()) == default { "*" } else { " " };
        let email = if profile.email.is_empty() { "-" } else { profile.email.as_str() };
        println!("{} {} <{}>", marker.green(), profile.login.bold(), email);
    }
    Ok(())
}

/// Shows the default account and the current folder's git identity
fn show_current(settings: &Settings, forge: &dyn Forge) -> Result<(), AppError> {
    let store = load_store(&settings.store_path, forge);
    match store.default_login() {
        Some(login) => println!("{} {}", "default account:".blue(), login),
        None => ui::warning("no saved accounts"),
    }

    let git = Git::new(env::current_dir()?);
    let name = git.get_config("user.name")?.unwrap_or_default();
    let email = git.get_config("user.email")?.unwrap_or_default();
    println!("{} {} <{}>", "commit identity:".blue(), name, email);
    Ok(())
}
