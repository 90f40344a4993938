use clap::{Parser, Subcommand};

/// Backs up the current folder to GitHub. Run without a subcommand for the guided wizard.
#[derive(Parser, Debug)]
#[command(name = "git-autopilot", version, about)]
pub struct Cli {
    /// Subcommand chosen to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

// Subcommands
#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// Lists saved GitHub accounts
    List,
    /// Saves a new GitHub account from a personal access token
    Add,
    /// Makes a saved account the default
    Switch {
        /// Login of the account to use
        login: String,
    },
    /// Deletes a saved account
    Delete {
        /// Login of the account to delete
        login: String,
    },
    /// Shows the default account and this folder's commit identity
    Current,
}
